use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveStats {
    pub wpm: u32,
    pub accuracy: u32,
}

impl LiveStats {
    pub fn compute(correct_words: usize, incorrect_words: usize, elapsed_secs: f64) -> Self {
        Self {
            wpm: words_per_minute(correct_words, elapsed_secs),
            accuracy: accuracy(correct_words, incorrect_words),
        }
    }
}

/// `round(correct / elapsed * 60)`, zero before any time has passed.
pub fn words_per_minute(correct_words: usize, elapsed_secs: f64) -> u32 {
    if elapsed_secs <= 0.0 {
        return 0;
    }
    (correct_words as f64 / elapsed_secs * 60.0).round() as u32
}

/// `round(correct / submitted * 100)`, zero when nothing was submitted.
pub fn accuracy(correct_words: usize, incorrect_words: usize) -> u32 {
    let submitted = correct_words + incorrect_words;
    if submitted == 0 {
        return 0;
    }
    (correct_words as f64 / submitted as f64 * 100.0).round() as u32
}
