use std::time::Duration;

use tracing::warn;

use super::{Pacer, TranslationError, TranslationRequest, Translator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// `attempt` is 1-based and counts the call that just failed.
    pub fn decide(&self, attempt: u32, error: &TranslationError) -> RetryDecision {
        if attempt >= self.max_attempts.max(1) || !error.is_transient() {
            return RetryDecision::GiveUp;
        }

        if let Some(hint) = error.retry_after() {
            return RetryDecision::RetryAfter(hint.min(self.max_delay));
        }

        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self
            .base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay);
        RetryDecision::RetryAfter(delay)
    }
}

pub fn translate_with_retry(
    translator: &dyn Translator,
    policy: &RetryPolicy,
    pacer: &dyn Pacer,
    request: &TranslationRequest,
) -> Result<String, TranslationError> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let err = match translator.translate(request) {
            Ok(text) => return Ok(text),
            Err(err) => err,
        };

        match policy.decide(attempt, &err) {
            RetryDecision::RetryAfter(delay) => {
                warn!(
                    model = %request.model,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "translation call failed; retrying"
                );
                pacer.pause(delay);
            }
            RetryDecision::GiveUp => {
                return Err(TranslationError::Exhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }
        }
    }
}
