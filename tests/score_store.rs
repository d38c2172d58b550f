use chrono::Local;
use rapidtype::{
    score::{KvScoreStore, ScoreEntry, ScoreStore, HISTORY_LIMIT, SCORES_KEY},
    storage::{KeyValueStore, SqliteStore},
};
use tempfile::tempdir;

fn entry(n: u32) -> ScoreEntry {
    ScoreEntry {
        id: format!("session-{n}"),
        timestamp: Local::now(),
        topic: "technology".into(),
        wpm: n % 90,
        accuracy: 95,
        correct_words: 20,
        incorrect_words: 1,
        total_keystrokes: 120,
        time_spent: 30,
    }
}

#[test]
fn sqlite_history_persists_across_opens() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state").join("scores.db");

    let mut store = KvScoreStore::new(SqliteStore::open(&path).unwrap());
    store.append(entry(1)).unwrap();
    store.append(entry(2)).unwrap();
    drop(store);

    let store = KvScoreStore::new(SqliteStore::open(&path).unwrap());
    let ids: Vec<String> = store.load_all().into_iter().map(|e| e.id).collect();
    assert_eq!(ids, vec!["session-1", "session-2"]);
}

#[test]
fn sqlite_history_keeps_the_latest_hundred() {
    let dir = tempdir().unwrap();
    let mut store = KvScoreStore::new(SqliteStore::open(dir.path().join("scores.db")).unwrap());

    for n in 1..=(HISTORY_LIMIT as u32 + 1) {
        store.append(entry(n)).unwrap();
    }

    let entries = store.load_all();
    assert_eq!(entries.len(), HISTORY_LIMIT);
    assert_eq!(entries[0].id, "session-2");
    assert_eq!(entries[HISTORY_LIMIT - 1].id, "session-101");
}

#[test]
fn corrupt_history_reads_empty_and_is_replaced() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scores.db");
    let mut raw = SqliteStore::open(&path).unwrap();
    raw.set(SCORES_KEY, "{not a list").unwrap();

    let mut store = KvScoreStore::new(raw);
    assert!(store.load_all().is_empty());

    store.append(entry(7)).unwrap();
    assert_eq!(store.load_all().len(), 1);

    store.clear().unwrap();
    assert!(store.load_all().is_empty());
    let raw = store.into_inner();
    assert_eq!(raw.get(SCORES_KEY).unwrap(), None);
}
