use include_dir::{include_dir, Dir};
use serde::Deserialize;
use tracing::{error, warn};

use crate::error::GenerationError;

static LANG_DIR: Dir = include_dir!("src/lang");

const DEFAULT_LIST: &str = "english.json";

/// Used if the embedded list cannot be read.
const EMERGENCY_WORDS: [&str; 12] = [
    "the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog", "and", "runs", "far", "away",
];

#[derive(Deserialize, Clone, Debug)]
pub struct WordList {
    pub name: String,
    pub size: u32,
    pub words: Vec<String>,
}

fn read_word_list(file_name: &str) -> Option<WordList> {
    let file = LANG_DIR.get_file(file_name)?;
    let contents = file.contents_utf8()?;
    match serde_json::from_str(contents) {
        Ok(list) => Some(list),
        Err(e) => {
            error!(file = file_name, error = %e, "embedded word list is invalid");
            None
        }
    }
}

/// Built-in list used for the random topic and as the fallback for failed
/// generation.
pub fn default_words() -> Vec<String> {
    read_word_list(DEFAULT_LIST)
        .map(|list| split_words(&list.words))
        .filter(|words| !words.is_empty())
        .unwrap_or_else(|| EMERGENCY_WORDS.iter().map(|s| s.to_string()).collect())
}

/// Splits entries on whitespace and drops empties. Never returns an empty list.
pub fn normalize_words(words: Vec<String>) -> Vec<String> {
    let normalized = split_words(&words);
    if normalized.is_empty() {
        return default_words();
    }
    normalized
}

fn split_words(words: &[String]) -> Vec<String> {
    words
        .iter()
        .flat_map(|w| w.split_whitespace())
        .map(str::to_string)
        .collect()
}

/// Word list for a generation result: the generated words when there are
/// any, the default list otherwise.
pub fn resolve_words(result: Result<Vec<String>, GenerationError>) -> Vec<String> {
    match result {
        Ok(words) if words.iter().any(|w| !w.trim().is_empty()) => normalize_words(words),
        Ok(_) => {
            warn!("generator returned no words, using default list");
            default_words()
        }
        Err(e) => {
            warn!(error = %e, "word generation failed, using default list");
            default_words()
        }
    }
}

/// Extracts words from generator output: a JSON array of strings if the text
/// contains one, otherwise a comma or whitespace separated list. Surrounding
/// punctuation is stripped.
pub fn parse_word_list(text: &str) -> Vec<String> {
    let from_json = text
        .find('[')
        .zip(text.rfind(']'))
        .filter(|(start, end)| start < end)
        .and_then(|(start, end)| serde_json::from_str::<Vec<String>>(&text[start..=end]).ok());

    let raw: Vec<String> = match from_json {
        Some(items) => items,
        None => text
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(str::to_string)
            .collect(),
    };

    raw.iter()
        .flat_map(|item| item.split_whitespace())
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-'))
        .map(|w| w.trim_matches(|c: char| c == '\'' || c == '-'))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_list_loads() {
        let list = read_word_list(DEFAULT_LIST).expect("embedded list");
        assert_eq!(list.name, "english");
        assert_eq!(list.size as usize, list.words.len());
        assert!(list.words.contains(&"the".to_string()));
    }

    #[test]
    fn test_default_words_are_clean() {
        let words = default_words();
        assert!(words.len() >= 100);
        assert!(words
            .iter()
            .all(|w| !w.is_empty() && !w.contains(char::is_whitespace)));
    }

    #[test]
    fn test_missing_list_is_none() {
        assert!(read_word_list("klingon.json").is_none());
    }

    #[test]
    fn test_normalize_splits_and_drops_empties() {
        let words = normalize_words(vec![
            "ice cream".into(),
            "".into(),
            "  ".into(),
            "cake".into(),
        ]);
        assert_eq!(words, vec!["ice", "cream", "cake"]);
    }

    #[test]
    fn test_normalize_never_returns_empty() {
        assert!(!normalize_words(vec![" ".into()]).is_empty());
    }

    #[test]
    fn test_resolve_falls_back_on_error_and_empty() {
        let defaults = default_words();
        assert_eq!(resolve_words(Err(GenerationError::Empty)), defaults);
        assert_eq!(resolve_words(Ok(vec![])), defaults);
        assert_eq!(resolve_words(Ok(vec!["  ".into()])), defaults);
        assert_eq!(
            resolve_words(Ok(vec!["comet".into(), "orbit".into()])),
            vec!["comet", "orbit"]
        );
    }

    #[test]
    fn test_parses_json_array_inside_prose() {
        let text = "Sure! Here you go:\n[\"lion\", \"tiger\", \"snow leopard\"]\nEnjoy.";
        assert_eq!(parse_word_list(text), vec!["lion", "tiger", "snow", "leopard"]);
    }

    #[test]
    fn test_parses_plain_lists() {
        assert_eq!(
            parse_word_list("1. apple, banana,\ncherry."),
            vec!["1", "apple", "banana", "cherry"]
        );
        assert_eq!(parse_word_list("don't  well-known"), vec!["don't", "well-known"]);
        assert!(parse_word_list("  ,, ... ").is_empty());
    }
}
