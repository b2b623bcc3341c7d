//! Error taxonomy shared by the fetch, extract, completion and session layers.
//!
//! The `Display` text of every variant is the message a harness shows the
//! user as-is.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timeout. Website took too long to respond.")]
    Timeout,

    #[error("Connection error. Check your internet or try a different URL.")]
    ConnectionFailure,

    #[error("Invalid URL {0}. Check the address and try again.")]
    InvalidUrl(String),

    #[error("Error: HTTP {status} for {url}")]
    HttpStatusError { status: u16, url: String },

    #[error("Error: {0}")]
    Other(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// The page is probably non-textual, rendered by JavaScript, or blocked.
    #[error("Could not extract enough content. Try a different URL.")]
    InsufficientContent { chars: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("Invalid API key. Please check your key.")]
    AuthenticationError,

    #[error("Rate limit exceeded. Please wait and try again.")]
    RateLimited,

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("API key cannot be empty")]
    EmptyKey,

    #[error("Invalid API key. Please check and try again.")]
    InvalidKey,

    #[error("Error: {0}")]
    Other(String),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Please enter a valid question.")]
pub struct EmptyQuestion;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScrapeError {
    #[error("Validate API key first!")]
    NotValidated,

    #[error("Enter a URL")]
    EmptyUrl,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AskError {
    #[error(transparent)]
    EmptyQuestion(#[from] EmptyQuestion),

    #[error("Validate API key first!")]
    NotValidated,

    #[error("Scrape a website first!")]
    NoDocument,

    #[error("Error: {0}")]
    Completion(#[from] CompletionError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a whole number of seconds, got {value:?}")]
    InvalidSeconds { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_errors_show_inner_message() {
        let err = ScrapeError::from(FetchError::Timeout);
        assert_eq!(
            err.to_string(),
            "Request timeout. Website took too long to respond."
        );

        let err = AskError::from(CompletionError::RateLimited);
        assert_eq!(
            err.to_string(),
            "Error: Rate limit exceeded. Please wait and try again."
        );

        let err = AskError::from(EmptyQuestion);
        assert_eq!(err.to_string(), "Please enter a valid question.");
    }
}
