use serde::Serialize;
use std::io::Write;

use crate::score::ScoreEntry;

#[derive(Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    date: String,
    topic: &'a str,
    wpm: u32,
    accuracy: u32,
    correct_words: usize,
    incorrect_words: usize,
    total_keystrokes: usize,
    time_spent: u32,
}

impl<'a> From<&'a ScoreEntry> for CsvRow<'a> {
    fn from(e: &'a ScoreEntry) -> Self {
        Self {
            id: &e.id,
            date: e.timestamp.to_rfc3339(),
            topic: &e.topic,
            wpm: e.wpm,
            accuracy: e.accuracy,
            correct_words: e.correct_words,
            incorrect_words: e.incorrect_words,
            total_keystrokes: e.total_keystrokes,
            time_spent: e.time_spent,
        }
    }
}

/// Writes one header line and one row per entry, oldest first.
pub fn write_csv<W: Write>(entries: &[ScoreEntry], out: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);
    for entry in entries {
        writer.serialize(CsvRow::from(entry))?;
    }
    writer.flush()?;
    Ok(())
}
