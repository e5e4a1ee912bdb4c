use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use crate::model::{Category, Document};
use crate::scoring::{MetricKind, ScoreRequest, Scorer, ScoringError};
use crate::translate::{Pacer, TranslationError, TranslationRequest, Translator};

/// Deterministic translator: output is `[target|model] input`.
#[derive(Default)]
pub struct ScriptedTranslator {
    always_fail: bool,
    fail_containing: Option<String>,
    panic_after: Option<usize>,
    calls: Cell<usize>,
    requests: RefCell<Vec<TranslationRequest>>,
}

impl ScriptedTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn always_failing() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    /// Rejects any request whose text contains `needle`.
    pub fn failing_on(needle: &str) -> Self {
        Self {
            fail_containing: Some(needle.to_string()),
            ..Self::default()
        }
    }

    /// Panics on call number `calls + 1`, simulating a crash mid-run.
    pub fn panicking_after(calls: usize) -> Self {
        Self {
            panic_after: Some(calls),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn requests(&self) -> Vec<TranslationRequest> {
        self.requests.borrow().clone()
    }
}

impl Translator for ScriptedTranslator {
    fn translate(&self, request: &TranslationRequest) -> Result<String, TranslationError> {
        if let Some(limit) = self.panic_after {
            if self.calls.get() >= limit {
                panic!("scripted crash after {limit} calls");
            }
        }
        self.calls.set(self.calls.get() + 1);
        self.requests.borrow_mut().push(request.clone());

        let scripted_failure = self
            .fail_containing
            .as_deref()
            .is_some_and(|needle| request.text.contains(needle));
        if self.always_fail || scripted_failure {
            return Err(TranslationError::Rejected {
                status: 400,
                body: "scripted failure".to_string(),
            });
        }

        Ok(format!(
            "[{}|{}] {}",
            request.target_language, request.model, request.text
        ))
    }
}

/// Returns `value` for every metric except those configured to fail or be
/// unavailable.
pub struct ConstScorer {
    value: f64,
    failing: HashSet<MetricKind>,
    unavailable: HashSet<MetricKind>,
    non_finite: HashSet<MetricKind>,
    calls: Cell<usize>,
}

impl ConstScorer {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            failing: HashSet::new(),
            unavailable: HashSet::new(),
            non_finite: HashSet::new(),
            calls: Cell::new(0),
        }
    }

    pub fn failing(mut self, kind: MetricKind) -> Self {
        self.failing.insert(kind);
        self
    }

    pub fn unavailable(mut self, kind: MetricKind) -> Self {
        self.unavailable.insert(kind);
        self
    }

    pub fn returning_nan(mut self, kind: MetricKind) -> Self {
        self.non_finite.insert(kind);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Scorer for ConstScorer {
    fn score(&self, kind: MetricKind, _request: &ScoreRequest<'_>) -> Result<f64, ScoringError> {
        self.calls.set(self.calls.get() + 1);
        if self.failing.contains(&kind) {
            return Err(ScoringError::Failed {
                kind,
                message: "scripted failure".to_string(),
            });
        }
        if self.unavailable.contains(&kind) {
            return Err(ScoringError::Unavailable {
                kind,
                reason: "scripted".to_string(),
            });
        }
        if self.non_finite.contains(&kind) {
            return Ok(f64::NAN);
        }
        Ok(self.value)
    }
}

#[derive(Default)]
pub struct RecordingPacer {
    pauses: RefCell<Vec<Duration>>,
}

impl RecordingPacer {
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.borrow().clone()
    }
}

impl Pacer for RecordingPacer {
    fn pause(&self, duration: Duration) {
        self.pauses.borrow_mut().push(duration);
    }
}

pub fn document(doc_id: &str, english: &str, translations: &[(&str, &str)]) -> Document {
    let (category, topic) = doc_id.split_once('/').unwrap_or(("cancer", doc_id));
    Document {
        doc_id: doc_id.to_string(),
        category: Category::parse(category).unwrap_or(Category::Cancer),
        topic: topic.to_string(),
        english_text: english.to_string(),
        professional_translations: translations
            .iter()
            .map(|(language, text)| (language.to_string(), text.to_string()))
            .collect::<BTreeMap<_, _>>(),
    }
}
