//! Reddit thread content used as narration source.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single top-level comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RedditComment {
    pub author: String,
    pub body: String,
    pub score: i64,
}

/// A thread: title plus comments in selection order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RedditThread {
    pub thread_id: String,
    pub subreddit: String,
    pub title: String,
    #[serde(default)]
    pub comments: Vec<RedditComment>,
}

impl RedditThread {
    /// Filesystem-safe name derived from the title, for output files.
    pub fn output_stem(&self) -> String {
        let cleaned: String = self
            .title
            .chars()
            .filter(|c| !matches!(c, '?' | '\\' | '/' | '"' | '%' | '*' | ':' | '|' | '<' | '>'))
            .collect();
        let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        let stem: String = collapsed.chars().take(120).collect();
        if stem.is_empty() {
            "video".to_string()
        } else {
            stem
        }
    }
}
