use std::fmt;

use thiserror::Error;

mod bleu;
mod chrf;
mod external;

pub use bleu::sentence_bleu;
pub use chrf::sentence_chrf;
pub use external::ExternalScorer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Bleu,
    Chrf,
    BertScore,
    BertScoreMultilingual,
    Comet,
    CometQe,
    Labse,
    XlmRoberta,
    Mbert,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bleu => "bleu",
            Self::Chrf => "chrf",
            Self::BertScore => "bertscore",
            Self::BertScoreMultilingual => "bertscore_multilingual",
            Self::Comet => "comet",
            Self::CometQe => "comet_qe",
            Self::Labse => "labse",
            Self::XlmRoberta => "xlm_roberta",
            Self::Mbert => "mbert",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScoreRequest<'a> {
    pub hypothesis: &'a str,
    pub reference: &'a str,
    pub source: Option<&'a str>,
}

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("{kind} scorer unavailable: {reason}")]
    Unavailable { kind: MetricKind, reason: String },

    #[error("{kind} scorer failed: {message}")]
    Failed { kind: MetricKind, message: String },
}

pub trait Scorer {
    fn score(&self, kind: MetricKind, request: &ScoreRequest<'_>) -> Result<f64, ScoringError>;
}

/// Native lexical metrics plus an optional external process for the
/// neural ones.
#[derive(Default)]
pub struct ScorerRegistry {
    external: Option<ExternalScorer>,
}

impl ScorerRegistry {
    pub fn native_only() -> Self {
        Self { external: None }
    }

    pub fn with_external(external: ExternalScorer) -> Self {
        Self {
            external: Some(external),
        }
    }
}

impl Scorer for ScorerRegistry {
    fn score(&self, kind: MetricKind, request: &ScoreRequest<'_>) -> Result<f64, ScoringError> {
        match kind {
            MetricKind::Bleu => Ok(sentence_bleu(request.hypothesis, request.reference)),
            MetricKind::Chrf => Ok(sentence_chrf(request.hypothesis, request.reference)),
            _ => match &self.external {
                Some(external) => external.score(kind, request),
                None => Err(ScoringError::Unavailable {
                    kind,
                    reason: "no external scorer configured".to_string(),
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_scores_lexical_metrics_natively() {
        let registry = ScorerRegistry::native_only();
        let request = ScoreRequest {
            hypothesis: "the patient should rest",
            reference: "the patient should rest",
            source: None,
        };

        let bleu = registry.score(MetricKind::Bleu, &request).expect("bleu");
        let chrf = registry.score(MetricKind::Chrf, &request).expect("chrf");
        assert!((bleu - 100.0).abs() < 1e-9);
        assert!((chrf - 100.0).abs() < 1e-9);
    }

    #[test]
    fn registry_reports_neural_metrics_unavailable_without_external_process() {
        let registry = ScorerRegistry::native_only();
        let request = ScoreRequest {
            hypothesis: "a",
            reference: "b",
            source: Some("c"),
        };

        let err = registry.score(MetricKind::Comet, &request).unwrap_err();
        assert!(matches!(
            err,
            ScoringError::Unavailable {
                kind: MetricKind::Comet,
                ..
            }
        ));
    }
}
