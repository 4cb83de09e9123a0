//! Fuzzy task identity.
//!
//! A keyword signature is the sorted, de-duplicated set of a title's
//! significant words (three or more characters, lowercased) joined by
//! spaces. "Write the Q3 report" and "report: write" share a signature.

use serde::{Deserialize, Serialize};

const MIN_WORD_LEN: usize = 3;

/// Signature for `title`, or `None` when it has no significant words.
pub fn keyword_signature(title: &str) -> Option<String> {
    let mut words: Vec<String> = title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= MIN_WORD_LEN)
        .map(str::to_lowercase)
        .collect();
    words.sort();
    words.dedup();
    (!words.is_empty()).then(|| words.join(" "))
}

/// Lookup key for learned records: a list, optionally narrowed by signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LearningKey {
    pub list_name: String,
    pub signature: Option<String>,
}

impl LearningKey {
    pub fn new(list_name: &str, signature: Option<String>) -> Self {
        Self {
            list_name: list_name.to_string(),
            signature,
        }
    }

    pub fn list(list_name: &str) -> Self {
        Self::new(list_name, None)
    }

    /// Signature-level key for a title; `None` if the title has no keywords.
    pub fn for_title(list_name: &str, title: &str) -> Option<Self> {
        keyword_signature(title).map(|sig| Self::new(list_name, Some(sig)))
    }
}
