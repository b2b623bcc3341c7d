//! Per-session state and the operations a harness drives.
//!
//! A [`ChatSession`] owns everything one user accumulates: the validated key,
//! the current document and both histories. Harnesses call one operation per
//! user action and re-render from the accessors afterwards. Failed operations
//! leave the previous state in place.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::ai::{validate_key, ApiKey, ChatTransport, CompletionClient};
use crate::context::{build_prompt, ModelContext};
use crate::error::{AskError, ScrapeError, ValidationError};
use crate::extractor::extract;
use crate::fetcher::PageSource;
use crate::{Document, EntryKind, HistoryEntry};

pub const QUICK_QUESTIONS: [&str; 6] = [
    "What is this website about?",
    "What services are offered?",
    "What are the pricing options?",
    "How can I contact them?",
    "What are the main features?",
    "Tell me about the company",
];

/// Snapshot for status displays.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionStatus {
    pub key_validated: bool,
    pub website_url: Option<String>,
    pub document_chars: Option<usize>,
    pub exchanges: usize,
}

pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    pages: Arc<dyn PageSource>,
    credential: Option<ApiKey>,
    document: Option<Document>,
    display: Vec<HistoryEntry>,
    context: ModelContext,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn ChatTransport>, pages: Arc<dyn PageSource>) -> Self {
        Self {
            transport,
            pages,
            credential: None,
            document: None,
            display: Vec::new(),
            context: ModelContext::new(),
        }
    }

    /// Validate and store a key. Any failure forgets the previous key.
    pub async fn validate(&mut self, api_key: &str) -> Result<String, ValidationError> {
        match validate_key(self.transport.as_ref(), api_key).await {
            Ok(key) => {
                self.credential = Some(key);
                Ok("API key is valid! ✓".to_string())
            }
            Err(e) => {
                warn!("API key validation failed: {}", e);
                self.credential = None;
                Err(e)
            }
        }
    }

    /// Fetch and extract a page. On success the document is replaced and the
    /// conversation starts over; on failure the previous document stays.
    pub async fn scrape(&mut self, url: &str) -> Result<String, ScrapeError> {
        if self.credential.is_none() {
            return Err(ScrapeError::NotValidated);
        }
        if url.trim().is_empty() {
            return Err(ScrapeError::EmptyUrl);
        }

        let raw = self.pages.fetch(url).await?;
        let document = extract(&raw)?;
        let chars = document.char_count();
        info!("Scraped {} characters from {}", chars, document.source_url);

        self.document = Some(document);
        self.display.clear();
        self.context.clear();
        Ok(format!("Successfully scraped! Extracted {} characters.", chars))
    }

    /// Answer a question about the current document.
    ///
    /// Blank questions are rejected before anything else happens. Once the
    /// question is sent it is always recorded; the reply is recorded as an
    /// answer or as an error entry, and only answers enter the model context.
    pub async fn ask(&mut self, question: &str) -> Result<String, AskError> {
        let Some(credential) = self.credential.clone() else {
            return Err(AskError::NotValidated);
        };
        let Some(document) = self.document.as_ref() else {
            return Err(AskError::NoDocument);
        };
        let messages = build_prompt(document, question, self.context.as_slice())?;

        self.display.push(HistoryEntry::new(EntryKind::User, question));

        let client = CompletionClient::new(self.transport.clone(), credential);
        match client.complete(messages).await {
            Ok(answer) => {
                self.display.push(HistoryEntry::new(EntryKind::Assistant, answer.clone()));
                self.context.push_exchange(question, answer.clone());
                Ok(answer)
            }
            Err(e) => {
                let err = AskError::from(e);
                self.display.push(HistoryEntry::new(EntryKind::SystemError, err.to_string()));
                Err(err)
            }
        }
    }

    /// Ask one of [`QUICK_QUESTIONS`], numbered from 1.
    pub async fn ask_quick(&mut self, number: usize) -> Option<Result<String, AskError>> {
        let question = *QUICK_QUESTIONS.get(number.checked_sub(1)?)?;
        Some(self.ask(question).await)
    }

    pub fn clear_chat(&mut self) -> String {
        self.display.clear();
        self.context.clear();
        "Cleared!".to_string()
    }

    /// Forget everything, including the key and the document.
    pub fn reset_all(&mut self) -> String {
        self.credential = None;
        self.document = None;
        self.clear_chat();
        "Reset!".to_string()
    }

    pub fn is_validated(&self) -> bool {
        self.credential.is_some()
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.display
    }

    pub fn model_context(&self) -> &ModelContext {
        &self.context
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            key_validated: self.is_validated(),
            website_url: self.document.as_ref().map(|d| d.source_url.clone()),
            document_chars: self.document.as_ref().map(Document::char_count),
            exchanges: self.context.exchanges(),
        }
    }
}
