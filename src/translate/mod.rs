use std::time::Duration;

use thiserror::Error;

mod http;
mod retry;

pub use http::ChatTranslator;
pub use retry::{RetryPolicy, translate_with_retry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub text: String,
    pub target_language: String,
    pub source_language: Option<String>,
    pub model: String,
    pub is_back_translation: bool,
}

impl TranslationRequest {
    /// English into `target_language`.
    pub fn forward(text: &str, target_language: &str, model: &str) -> Self {
        Self {
            text: text.to_string(),
            target_language: target_language.to_string(),
            source_language: None,
            model: model.to_string(),
            is_back_translation: false,
        }
    }

    /// `source_language` back into English.
    pub fn back(text: &str, source_language: &str, model: &str) -> Self {
        Self {
            text: text.to_string(),
            target_language: "english".to_string(),
            source_language: Some(source_language.to_string()),
            model: model.to_string(),
            is_back_translation: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rate limited by provider")]
    RateLimited { retry_after: Option<Duration> },

    #[error("provider returned server error {status}: {body}")]
    Server { status: u16, body: String },

    #[error("provider rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("provider returned an empty translation")]
    EmptyResponse,

    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<TranslationError>,
    },
}

impl TranslationError {
    /// Whether the same request may succeed if sent again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_)
            | Self::RateLimited { .. }
            | Self::Server { .. }
            | Self::EmptyResponse => true,
            Self::Rejected { .. } | Self::Malformed(_) | Self::Exhausted { .. } => false,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

pub trait Translator {
    fn translate(&self, request: &TranslationRequest) -> Result<String, TranslationError>;
}

/// Every wait in the pipeline goes through a pacer so tests can run without
/// sleeping.
pub trait Pacer {
    fn pause(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn back_request_targets_english_from_source_language() {
        let request = TranslationRequest::back("hola", "spanish", "kimi-k2");
        assert_eq!(request.target_language, "english");
        assert_eq!(request.source_language.as_deref(), Some("spanish"));
        assert!(request.is_back_translation);
    }

    #[test]
    fn transient_classification_matches_retryable_failures() {
        assert!(TranslationError::Transport("reset".to_string()).is_transient());
        assert!(TranslationError::EmptyResponse.is_transient());
        assert!(
            TranslationError::Server {
                status: 503,
                body: String::new()
            }
            .is_transient()
        );
        assert!(
            !TranslationError::Rejected {
                status: 401,
                body: String::new()
            }
            .is_transient()
        );
        assert!(!TranslationError::Malformed("no choices".to_string()).is_transient());
    }

    #[test]
    fn exhausted_error_keeps_last_cause_in_chain() {
        let err = TranslationError::Exhausted {
            attempts: 3,
            last: Box::new(TranslationError::RateLimited {
                retry_after: Some(Duration::from_secs(4)),
            }),
        };
        let source = std::error::Error::source(&err).expect("source");
        assert_eq!(source.to_string(), "rate limited by provider");
        assert_eq!(err.retry_after(), None);
    }
}
