//! Prompt assembly and the sliding conversation window.

use crate::error::EmptyQuestion;
use crate::{Document, Message, Role};

/// Prior entries resent with each question (the two latest exchanges).
pub const PROMPT_HISTORY_ENTRIES: usize = 4;
/// Entries retained between questions (four exchanges).
pub const CONTEXT_CAPACITY: usize = 8;

const INSTRUCTIONS: &str = "INSTRUCTIONS:
- Answer using ONLY the website content above
- If info is not available, say \"I don't see that information on this website\"
- Be helpful, accurate, and concise
- Provide specific details from the website
- Format answers clearly with proper paragraphs
- Don't make up information";

/// User/assistant pairs kept for follow-up questions. Never holds system
/// messages; evicts whole exchanges, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelContext {
    entries: Vec<Message>,
}

impl ModelContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.entries.push(Message::user(question));
        self.entries.push(Message::assistant(answer));
        if self.entries.len() > CONTEXT_CAPACITY {
            let excess = self.entries.len() - CONTEXT_CAPACITY;
            self.entries.drain(..excess);
        }
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn exchanges(&self) -> usize {
        self.entries.len() / 2
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn system_prompt(document: &Document) -> String {
    format!(
        "You are a helpful AI assistant answering questions about websites.

WEBSITE URL: {}

WEBSITE CONTENT:
{}

{}",
        document.source_url, document.text, INSTRUCTIONS
    )
}

/// Build the message list for one question: system prompt, the most recent
/// history entries, then the question itself.
pub fn build_prompt(
    document: &Document,
    question: &str,
    history: &[Message],
) -> Result<Vec<Message>, EmptyQuestion> {
    if question.trim().is_empty() {
        return Err(EmptyQuestion);
    }

    let recent = &history[history.len().saturating_sub(PROMPT_HISTORY_ENTRIES)..];
    let mut messages = Vec::with_capacity(recent.len() + 2);
    messages.push(Message::system(system_prompt(document)));
    messages.extend(recent.iter().filter(|m| m.role != Role::System).cloned());
    messages.push(Message::user(question));
    Ok(messages)
}
