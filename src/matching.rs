/// Number of leading characters of `draft` that match `target` position by
/// position. The run stops at the first mismatch.
pub fn matched_prefix_length(target: &str, draft: &str) -> usize {
    target
        .chars()
        .zip(draft.chars())
        .take_while(|(expected, typed)| expected == typed)
        .count()
}

/// The active word split for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveWordView {
    /// Correctly typed prefix of the target.
    pub matched: String,
    /// Draft characters after the matched prefix.
    pub mistyped: String,
    /// Target characters after the matched prefix.
    pub pending: String,
}

impl ActiveWordView {
    pub fn new(target: &str, draft: &str) -> Self {
        let matched_len = matched_prefix_length(target, draft);
        Self {
            matched: target.chars().take(matched_len).collect(),
            mistyped: draft.chars().skip(matched_len).collect(),
            pending: target.chars().skip(matched_len).collect(),
        }
    }

    pub fn has_error(&self) -> bool {
        !self.mistyped.is_empty()
    }
}
