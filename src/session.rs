use chrono::Local;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, info};

use crate::error::SessionError;
use crate::matching::ActiveWordView;
use crate::score::{new_score_id, ScoreEntry};
use crate::settings::Topic;
use crate::stats::{self, LiveStats};
use crate::stream::{Word, WordStream};
use crate::words::normalize_words;

/// Characters a draft may run past the active word before updates are refused.
pub const OVERTYPE_SLACK: usize = 3;

pub const SEPARATOR: char = ' ';

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Idle,
    Playing,
    Finished,
}

/// What a call to [`TypingSession::submit_draft`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftOutcome {
    /// Session already finished.
    Ignored,
    /// Draft too long for the active word; previous draft kept.
    Rejected,
    Updated,
    Committed { correct: bool },
}

/// Owned copy of everything a view needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub phase: Phase,
    pub words: Vec<Word>,
    pub cursor: usize,
    pub draft: String,
    pub duration_secs: u32,
    pub remaining_secs: u32,
    pub topic: Topic,
    pub correct_words: usize,
    pub incorrect_words: usize,
    pub total_keystrokes: usize,
    pub stats: LiveStats,
    pub last_score: Option<ScoreEntry>,
}

impl Snapshot {
    pub fn active_word(&self) -> Option<&Word> {
        if self.phase == Phase::Finished {
            return None;
        }
        self.words.get(self.cursor)
    }

    pub fn active_view(&self) -> Option<ActiveWordView> {
        self.active_word()
            .map(|word| ActiveWordView::new(&word.text, &self.draft))
    }
}

/// The typing game: phase, word stream, draft and counters.
#[derive(Debug)]
pub struct TypingSession {
    phase: Phase,
    stream: WordStream,
    draft: String,
    duration_secs: u32,
    remaining_secs: u32,
    topic: Topic,
    correct_words: usize,
    incorrect_words: usize,
    total_keystrokes: usize,
    last_score: Option<ScoreEntry>,
    rng: StdRng,
    subscribers: Vec<Sender<Snapshot>>,
}

impl TypingSession {
    pub fn new(duration_secs: u32, topic: Topic, words: Vec<String>) -> Self {
        Self::with_rng(duration_secs, topic, words, StdRng::from_entropy())
    }

    /// Deterministic shuffles, for tests and replays.
    pub fn with_seed(duration_secs: u32, topic: Topic, words: Vec<String>, seed: u64) -> Self {
        Self::with_rng(duration_secs, topic, words, StdRng::seed_from_u64(seed))
    }

    fn with_rng(duration_secs: u32, topic: Topic, words: Vec<String>, mut rng: StdRng) -> Self {
        let stream = WordStream::new(normalize_words(words), &mut rng);
        Self {
            phase: Phase::Idle,
            stream,
            draft: String::new(),
            duration_secs,
            remaining_secs: duration_secs,
            topic,
            correct_words: 0,
            incorrect_words: 0,
            total_keystrokes: 0,
            last_score: None,
            rng,
            subscribers: Vec::new(),
        }
    }

    /// Receives a snapshot after every mutating operation.
    pub fn subscribe(&mut self) -> Receiver<Snapshot> {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(self.snapshot());
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        self.subscribers
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            words: self.stream.words().to_vec(),
            cursor: self.stream.cursor(),
            draft: self.draft.clone(),
            duration_secs: self.duration_secs,
            remaining_secs: self.remaining_secs,
            topic: self.topic.clone(),
            correct_words: self.correct_words,
            incorrect_words: self.incorrect_words,
            total_keystrokes: self.total_keystrokes,
            stats: self.live_stats(),
            last_score: self.last_score.clone(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn words(&self) -> &[Word] {
        self.stream.words()
    }

    /// Base list the stream draws its batches from.
    pub fn base_words(&self) -> &[String] {
        self.stream.base()
    }

    pub fn cursor(&self) -> usize {
        self.stream.cursor()
    }

    pub fn active_word(&self) -> Option<&Word> {
        if self.phase == Phase::Finished {
            return None;
        }
        self.stream.active()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.duration_secs.saturating_sub(self.remaining_secs)
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn correct_words(&self) -> usize {
        self.correct_words
    }

    pub fn incorrect_words(&self) -> usize {
        self.incorrect_words
    }

    pub fn total_keystrokes(&self) -> usize {
        self.total_keystrokes
    }

    pub fn last_score(&self) -> Option<&ScoreEntry> {
        self.last_score.as_ref()
    }

    /// Handles a change of the draft input.
    pub fn submit_draft(&mut self, text: &str) -> DraftOutcome {
        if self.phase == Phase::Finished {
            return DraftOutcome::Ignored;
        }
        let starting = self.phase == Phase::Idle && !text.is_empty();
        if starting {
            self.start();
        }

        let outcome = if text.ends_with(SEPARATOR) {
            self.commit(text.trim())
        } else {
            let allowed = self
                .stream
                .active()
                .map(|w| w.text.chars().count() + OVERTYPE_SLACK)
                .unwrap_or(0);
            if text.chars().count() > allowed {
                if starting {
                    self.emit();
                }
                return DraftOutcome::Rejected;
            }
            self.draft = text.to_string();
            DraftOutcome::Updated
        };

        self.emit();
        outcome
    }

    fn start(&mut self) {
        debug!(duration = self.duration_secs, topic = %self.topic, "session started");
        self.phase = Phase::Playing;
    }

    fn commit(&mut self, typed: &str) -> DraftOutcome {
        let correct = self
            .stream
            .active()
            .map(|w| w.text == typed)
            .unwrap_or(false);

        if correct {
            self.correct_words += 1;
        } else {
            self.incorrect_words += 1;
        }
        self.total_keystrokes += typed.chars().count() + 1;
        self.stream.commit(correct, &mut self.rng);
        self.draft.clear();

        DraftOutcome::Committed { correct }
    }

    /// One second passed. Returns the score when this tick ends the session.
    pub fn tick(&mut self) -> Option<ScoreEntry> {
        if self.phase != Phase::Playing {
            return None;
        }
        let score = if self.remaining_secs <= 1 {
            self.remaining_secs = 0;
            Some(self.finalize())
        } else {
            self.remaining_secs -= 1;
            None
        };
        self.emit();
        score
    }

    pub fn live_stats(&self) -> LiveStats {
        LiveStats::compute(
            self.correct_words,
            self.incorrect_words,
            self.elapsed_secs() as f64,
        )
    }

    fn finalize(&mut self) -> ScoreEntry {
        self.phase = Phase::Finished;
        let timestamp = Local::now();
        let entry = ScoreEntry {
            id: new_score_id(&timestamp),
            timestamp,
            topic: self.topic.to_string(),
            wpm: stats::words_per_minute(self.correct_words, self.duration_secs as f64),
            accuracy: stats::accuracy(self.correct_words, self.incorrect_words),
            correct_words: self.correct_words,
            incorrect_words: self.incorrect_words,
            total_keystrokes: self.total_keystrokes,
            time_spent: self.duration_secs,
        };
        info!(
            wpm = entry.wpm,
            accuracy = entry.accuracy,
            correct = entry.correct_words,
            incorrect = entry.incorrect_words,
            "session finished"
        );
        self.last_score = Some(entry.clone());
        entry
    }

    /// New shuffled stream, zeroed counters and a full clock. Refused while playing.
    pub fn reconfigure(
        &mut self,
        duration_secs: u32,
        topic: Topic,
        words: Vec<String>,
    ) -> Result<(), SessionError> {
        if self.phase == Phase::Playing {
            return Err(SessionError::Playing);
        }
        self.stream = WordStream::new(normalize_words(words), &mut self.rng);
        self.draft.clear();
        self.duration_secs = duration_secs;
        self.remaining_secs = duration_secs;
        self.topic = topic;
        self.correct_words = 0;
        self.incorrect_words = 0;
        self.total_keystrokes = 0;
        self.last_score = None;
        self.phase = Phase::Idle;
        debug!(duration = duration_secs, topic = %self.topic, words = self.stream.len(), "session reconfigured");
        self.emit();
        Ok(())
    }

    /// Starts over with the current duration, topic and base list.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        let words = self.stream.base().to_vec();
        self.reconfigure(self.duration_secs, self.topic.clone(), words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::WordStatus;
    use assert_matches::assert_matches;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn session_with(list: &[&str]) -> TypingSession {
        TypingSession::with_seed(15, Topic::Random, words(list), 11)
    }

    fn type_active(session: &mut TypingSession, correct: bool) -> DraftOutcome {
        let target = session.active_word().unwrap().text.clone();
        let text = if correct {
            format!("{} ", target)
        } else {
            format!("{}x ", target)
        };
        session.submit_draft(&text)
    }

    fn assert_invariants(session: &TypingSession) {
        assert_eq!(
            session.correct_words() + session.incorrect_words(),
            session.cursor()
        );
        assert!(session.cursor() <= session.words().len());
        if session.phase() != Phase::Finished {
            assert!(session.cursor() < session.words().len());
            let active = session
                .words()
                .iter()
                .filter(|w| w.status == WordStatus::Active)
                .count();
            assert_eq!(active, 1);
        }
    }

    #[test]
    fn test_new_session_is_idle_with_zero_stats() {
        let session = session_with(&["alpha", "beta"]);
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.remaining_secs(), 15);
        assert_eq!(session.live_stats(), LiveStats { wpm: 0, accuracy: 0 });
        assert_eq!(session.words()[0].status, WordStatus::Active);
    }

    #[test]
    fn test_first_character_starts_playing() {
        let mut session = session_with(&["alpha"]);
        assert_eq!(session.submit_draft("a"), DraftOutcome::Updated);
        assert_eq!(session.phase(), Phase::Playing);
        assert_eq!(session.draft(), "a");
    }

    #[test]
    fn test_empty_draft_does_not_start() {
        let mut session = session_with(&["alpha"]);
        session.submit_draft("");
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn test_slack_allows_three_extra_characters() {
        let mut session = session_with(&["cat"]);
        assert_eq!(session.submit_draft("catxyz"), DraftOutcome::Updated);
        assert_eq!(session.submit_draft("catxyzw"), DraftOutcome::Rejected);
        assert_eq!(session.draft(), "catxyz");
    }

    #[test]
    fn test_separator_commits_and_counts_keystrokes() {
        let mut session = session_with(&["cat"]);
        assert_matches!(
            session.submit_draft("cat "),
            DraftOutcome::Committed { correct: true }
        );
        assert_matches!(
            session.submit_draft("Cat "),
            DraftOutcome::Committed { correct: false }
        );
        assert_eq!(session.correct_words(), 1);
        assert_eq!(session.incorrect_words(), 1);
        assert_eq!(session.total_keystrokes(), 8);
        assert_eq!(session.draft(), "");
        assert_eq!(session.words()[0].status, WordStatus::Correct);
        assert_eq!(session.words()[1].status, WordStatus::Incorrect);
        assert_eq!(session.words()[2].status, WordStatus::Active);
    }

    #[test]
    fn test_commit_trims_surrounding_whitespace() {
        let mut session = session_with(&["cat"]);
        assert_matches!(
            session.submit_draft("  cat "),
            DraftOutcome::Committed { correct: true }
        );
        assert_eq!(session.total_keystrokes(), 4);
    }

    #[test]
    fn test_invariants_hold_over_mixed_submissions() {
        let mut session = session_with(&["one", "two", "three", "four"]);
        for i in 0..60 {
            if i % 4 == 0 {
                session.submit_draft("o");
            }
            type_active(&mut session, i % 3 != 0);
            assert_invariants(&session);
        }
    }

    #[test]
    fn test_stream_grows_before_the_next_submission() {
        let list: Vec<String> = (0..12).map(|i| format!("w{}", i)).collect();
        let mut session = TypingSession::with_seed(60, Topic::Random, list, 2);
        let initial = session.words().len();

        type_active(&mut session, true);
        type_active(&mut session, true);

        assert!(session.words().len() > initial);
        assert!(session.words().len() - session.cursor() > 10);
    }

    #[test]
    fn test_tick_counts_down_and_finishes_once() {
        let mut session = session_with(&["the"]);
        session.submit_draft("t");
        for _ in 0..14 {
            assert!(session.tick().is_none());
        }
        assert_eq!(session.remaining_secs(), 1);

        let score = session.tick().expect("final tick produces a score");
        assert_eq!(session.phase(), Phase::Finished);
        assert_eq!(session.remaining_secs(), 0);
        assert_eq!(score.time_spent, 15);

        assert!(session.tick().is_none());
        assert_eq!(session.remaining_secs(), 0);
    }

    #[test]
    fn test_ticks_are_ignored_unless_playing() {
        let mut session = session_with(&["the"]);
        assert!(session.tick().is_none());
        assert_eq!(session.remaining_secs(), 15);
    }

    #[test]
    fn test_live_stats_use_elapsed_time() {
        let mut session = TypingSession::with_seed(60, Topic::Random, words(&["a"]), 1);
        session.submit_draft("a ");
        session.submit_draft("b ");
        session.submit_draft("a ");
        for _ in 0..6 {
            session.tick();
        }
        // 2 correct in 6 seconds
        assert_eq!(session.live_stats(), LiveStats { wpm: 20, accuracy: 67 });
    }

    #[test]
    fn test_finished_session_ignores_drafts() {
        let mut session = session_with(&["the"]);
        session.submit_draft("the ");
        for _ in 0..15 {
            session.tick();
        }
        assert_eq!(session.submit_draft("x"), DraftOutcome::Ignored);
        assert!(session.active_word().is_none());
        assert_eq!(session.correct_words(), 1);
    }

    #[test]
    fn test_reconfigure_refused_while_playing() {
        let mut session = session_with(&["the"]);
        session.submit_draft("t");
        assert_eq!(
            session.reconfigure(30, Topic::Random, words(&["x"])),
            Err(SessionError::Playing)
        );
        assert_eq!(session.phase(), Phase::Playing);
    }

    #[test]
    fn test_reconfigure_in_idle_reshuffles_and_keeps_phase() {
        let mut session = session_with(&["a", "b", "c"]);
        session
            .reconfigure(60, Topic::Custom("boats".into()), words(&["hull", "mast"]))
            .unwrap();
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.remaining_secs(), 60);
        assert_eq!(session.topic(), &Topic::Custom("boats".into()));
        let mut texts: Vec<&str> = session.words().iter().map(|w| w.text.as_str()).collect();
        texts.sort_unstable();
        assert_eq!(texts, vec!["hull", "mast"]);
    }

    #[test]
    fn test_reset_after_finish_returns_to_idle() {
        let mut session = session_with(&["the", "quick", "fox"]);
        session.submit_draft("nope ");
        for _ in 0..15 {
            session.tick();
        }
        assert_eq!(session.phase(), Phase::Finished);

        session.reset().unwrap();
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.correct_words(), 0);
        assert_eq!(session.incorrect_words(), 0);
        assert_eq!(session.total_keystrokes(), 0);
        assert_eq!(session.remaining_secs(), 15);
        assert!(!session.words().is_empty());
        assert_eq!(session.words()[0].status, WordStatus::Active);
        assert!(session.last_score().is_none());
    }

    #[test]
    fn test_empty_word_list_falls_back_to_defaults() {
        let session = TypingSession::with_seed(15, Topic::Random, vec![], 4);
        assert!(!session.words().is_empty());
    }

    #[test]
    fn test_subscribers_see_every_mutation() {
        let mut session = session_with(&["the"]);
        let rx = session.subscribe();
        assert_eq!(rx.try_recv().unwrap().phase, Phase::Idle);

        session.submit_draft("t");
        session.submit_draft("th");
        session.submit_draft("thexxxx");

        let draft = rx.try_recv().unwrap();
        assert_eq!(draft.phase, Phase::Playing);
        assert_eq!(draft.draft, "t");
        assert_eq!(rx.try_recv().unwrap().draft, "th");
        // rejected updates do not emit
        assert!(rx.try_recv().is_err());

        session.tick();
        assert_eq!(rx.try_recv().unwrap().remaining_secs, 14);
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let mut session = session_with(&["the"]);
        drop(session.subscribe());
        session.submit_draft("t");
        assert!(session.subscribers.is_empty());
    }

    #[test]
    fn test_snapshot_projects_active_word() {
        let mut session = session_with(&["hello"]);
        session.submit_draft("heL");
        let view = session.snapshot().active_view().unwrap();
        assert_eq!(view.matched, "he");
        assert_eq!(view.mistyped, "L");
        assert_eq!(view.pending, "llo");
    }
}
