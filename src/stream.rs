use rand::Rng;

use crate::shuffle::shuffled;

/// Extend the stream once fewer than this many words remain ahead of the cursor.
pub const LOOKAHEAD_WORDS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum WordStatus {
    Pending,
    Active,
    Correct,
    Incorrect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    pub status: WordStatus,
}

impl Word {
    fn pending(text: String) -> Self {
        Self {
            text,
            status: WordStatus::Pending,
        }
    }
}

/// Ordered words plus the index of the active one. Words are appended in
/// shuffled batches of `base` and are never removed.
#[derive(Debug, Clone)]
pub struct WordStream {
    words: Vec<Word>,
    cursor: usize,
    base: Vec<String>,
}

impl WordStream {
    /// `base` must be non-empty; callers normalize it first.
    pub fn new<R: Rng + ?Sized>(base: Vec<String>, rng: &mut R) -> Self {
        let mut stream = Self {
            words: Vec::with_capacity(base.len()),
            cursor: 0,
            base,
        };
        stream.append_batch(rng);
        debug_assert!(!stream.is_empty(), "word stream built from an empty base");
        if let Some(first) = stream.words.first_mut() {
            first.status = WordStatus::Active;
        }
        stream
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn base(&self) -> &[String] {
        &self.base
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn active(&self) -> Option<&Word> {
        self.words.get(self.cursor)
    }

    /// Words after the cursor that have not been reached yet.
    pub fn lookahead(&self) -> usize {
        self.words.len().saturating_sub(self.cursor + 1)
    }

    /// Classifies the active word, advances and activates the next one,
    /// topping the stream up when the lookahead runs low.
    pub fn commit<R: Rng + ?Sized>(&mut self, correct: bool, rng: &mut R) {
        if let Some(word) = self.words.get_mut(self.cursor) {
            word.status = if correct {
                WordStatus::Correct
            } else {
                WordStatus::Incorrect
            };
        }
        self.cursor += 1;

        if self.lookahead() < LOOKAHEAD_WORDS {
            self.append_batch(rng);
        }

        if let Some(next) = self.words.get_mut(self.cursor) {
            next.status = WordStatus::Active;
        }
    }

    fn append_batch<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let batch = shuffled(&self.base, rng);
        self.words.extend(batch.into_iter().map(Word::pending));
    }
}
