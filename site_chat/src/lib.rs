pub mod ai;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod session;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Readable text pulled from a single page. Replaced wholesale on every
/// successful scrape.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Document {
    pub source_url: String,
    pub text: String,
    pub extracted_at: DateTime<Utc>,
}

impl Document {
    pub fn new(source_url: String, text: String) -> Self {
        Self {
            source_url,
            text,
            extracted_at: Utc::now(),
        }
    }

    /// Length in characters, the unit every extraction threshold uses.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A role-tagged message as sent to the completion provider.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    User,
    Assistant,
    SystemError,
}

/// One line of the display transcript. Errors are kept apart from answers.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HistoryEntry {
    pub kind: EntryKind,
    pub content: String,
    pub at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(kind: EntryKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            at: Utc::now(),
        }
    }
}
