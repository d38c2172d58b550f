// Library surface for the binary, headless integration tests and reuse.
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod matching;
pub mod runtime;
pub mod score;
pub mod session;
pub mod settings;
pub mod shuffle;
pub mod stats;
pub mod storage;
pub mod stream;
pub mod trainer;
pub mod ui;
pub mod word_source;
pub mod words;
