use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::model::{Document, EvaluationRecord, MetricField, MetricsRecord};
use crate::queue::WorkItem;
use crate::scoring::{MetricKind, ScoreRequest, Scorer, ScoringError};
use crate::translate::{
    Pacer, RetryPolicy, TranslationError, TranslationRequest, Translator, translate_with_retry,
};
use crate::util::now_utc_string;

use MetricField as F;
use MetricKind as K;
use TextRole as R;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    Translating,
    BackTranslating,
    ProfBackTranslating,
    Scoring,
    Done,
    Failed,
}

impl ItemState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Translating => "translating",
            Self::BackTranslating => "back_translating",
            Self::ProfBackTranslating => "prof_back_translating",
            Self::Scoring => "scoring",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub call_delay: Duration,
    pub item_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            call_delay: Duration::from_secs(1),
            item_delay: Duration::from_secs(1),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub record: EvaluationRecord,
    pub metrics: Option<MetricsRecord>,
    pub state: ItemState,
    pub failed_during: Option<ItemState>,
}

pub struct Engine<'a> {
    translator: &'a dyn Translator,
    scorer: &'a dyn Scorer,
    pacer: &'a dyn Pacer,
    settings: EngineSettings,
}

impl<'a> Engine<'a> {
    pub fn new(
        translator: &'a dyn Translator,
        scorer: &'a dyn Scorer,
        pacer: &'a dyn Pacer,
        settings: EngineSettings,
    ) -> Self {
        Self {
            translator,
            scorer,
            pacer,
            settings,
        }
    }

    /// Runs the translation protocol and, when `score` is set, the metric plan.
    pub fn evaluate(&self, document: &Document, item: &WorkItem, score: bool) -> ItemOutcome {
        debug!(item = %item.key(), state = ItemState::Pending.as_str(), "starting item");
        let (record, failed_during) = self.translate_item(document, item);

        if let Some(stage) = failed_during {
            let metrics = score.then(|| {
                MetricsRecord::empty(&record.doc_id, &record.model, &record.language)
            });
            return ItemOutcome {
                record,
                metrics,
                state: ItemState::Failed,
                failed_during: Some(stage),
            };
        }

        let metrics = if score {
            debug!(item = %item.key(), state = ItemState::Scoring.as_str(), "scoring item");
            Some(score_record(self.scorer, &record))
        } else {
            None
        };

        ItemOutcome {
            record,
            metrics,
            state: ItemState::Done,
            failed_during: None,
        }
    }

    /// Builds the evaluation record for one item. The second value names the
    /// stage that failed, if any.
    pub fn translate_item(
        &self,
        document: &Document,
        item: &WorkItem,
    ) -> (EvaluationRecord, Option<ItemState>) {
        let professional = document
            .professional_translation(&item.language)
            .unwrap_or_default()
            .to_string();

        let mut record = EvaluationRecord {
            doc_id: document.doc_id.clone(),
            model: item.model.clone(),
            language: item.language.clone(),
            english_original: document.english_text.clone(),
            llm_translation: String::new(),
            professional_translation: professional,
            llm_back_translation: String::new(),
            professional_back_translation: String::new(),
            translation_time: 0.0,
            back_translation_time: 0.0,
            professional_back_translation_time: 0.0,
            timestamp: now_utc_string(),
            success: false,
            error_message: None,
        };

        debug!(item = %item.key(), state = ItemState::Translating.as_str(), "translating item");
        let forward = TranslationRequest::forward(&document.english_text, &item.language, &item.model);
        let (llm_translation, translation_time) = match self.call(&forward) {
            Ok(done) => done,
            Err(err) => return fail(record, ItemState::Translating, &err),
        };
        self.pacer.pause(self.settings.call_delay);

        debug!(item = %item.key(), state = ItemState::BackTranslating.as_str(), "back-translating item");
        let back = TranslationRequest::back(&llm_translation, &item.language, &item.model);
        let (llm_back_translation, back_translation_time) = match self.call(&back) {
            Ok(done) => done,
            Err(err) => return fail(record, ItemState::BackTranslating, &err),
        };

        record.llm_translation = llm_translation;
        record.llm_back_translation = llm_back_translation;
        record.translation_time = translation_time;
        record.back_translation_time = back_translation_time;

        if !record.professional_translation.is_empty() {
            self.pacer.pause(self.settings.call_delay);
            debug!(
                item = %item.key(),
                state = ItemState::ProfBackTranslating.as_str(),
                "back-translating professional text"
            );
            let prof = TranslationRequest::back(
                &record.professional_translation,
                &item.language,
                &item.model,
            );
            match self.call(&prof) {
                Ok((text, elapsed)) => {
                    record.professional_back_translation = text;
                    record.professional_back_translation_time = elapsed;
                }
                Err(err) => return fail(record, ItemState::ProfBackTranslating, &err),
            }
        }

        record.success = true;
        (record, None)
    }

    /// Replaces the professional text of a successful record and back-translates
    /// it with the record's own model. Returns whether the back-translation
    /// succeeded; on failure the professional back-translation stays empty.
    pub fn refresh_professional(&self, record: &mut EvaluationRecord, professional: &str) -> bool {
        record.professional_translation = professional.to_string();
        record.professional_back_translation.clear();
        record.professional_back_translation_time = 0.0;

        if professional.trim().is_empty() {
            return true;
        }

        let request = TranslationRequest::back(professional, &record.language, &record.model);
        match self.call(&request) {
            Ok((text, elapsed)) => {
                record.professional_back_translation = text;
                record.professional_back_translation_time = elapsed;
                true
            }
            Err(err) => {
                warn!(
                    item = %record.key(),
                    error = %err,
                    "professional back-translation failed during refresh"
                );
                false
            }
        }
    }

    pub fn score(&self, record: &EvaluationRecord) -> MetricsRecord {
        score_record(self.scorer, record)
    }

    pub fn pace_item(&self) {
        self.pacer.pause(self.settings.item_delay);
    }

    pub fn pace_call(&self) {
        self.pacer.pause(self.settings.call_delay);
    }

    fn call(&self, request: &TranslationRequest) -> Result<(String, f64), TranslationError> {
        let started = Instant::now();
        let text = translate_with_retry(self.translator, &self.settings.retry, self.pacer, request)?;
        Ok((text, started.elapsed().as_secs_f64()))
    }
}

fn fail(
    mut record: EvaluationRecord,
    stage: ItemState,
    err: &TranslationError,
) -> (EvaluationRecord, Option<ItemState>) {
    warn!(
        item = %record.key(),
        stage = stage.as_str(),
        error = %err,
        "item failed"
    );

    record.llm_translation.clear();
    record.llm_back_translation.clear();
    record.professional_back_translation.clear();
    record.translation_time = 0.0;
    record.back_translation_time = 0.0;
    record.professional_back_translation_time = 0.0;
    record.success = false;
    record.error_message = Some(format!("{} failed: {err}", stage.as_str()));
    (record, Some(stage))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextRole {
    English,
    LlmTranslation,
    ProfessionalTranslation,
    LlmBackTranslation,
    ProfessionalBackTranslation,
}

impl TextRole {
    fn text(self, record: &EvaluationRecord) -> &str {
        match self {
            Self::English => &record.english_original,
            Self::LlmTranslation => &record.llm_translation,
            Self::ProfessionalTranslation => &record.professional_translation,
            Self::LlmBackTranslation => &record.llm_back_translation,
            Self::ProfessionalBackTranslation => &record.professional_back_translation,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct MetricSpec {
    field: MetricField,
    kind: MetricKind,
    hypothesis: TextRole,
    reference: TextRole,
    source: Option<TextRole>,
}

const fn spec(
    field: MetricField,
    kind: MetricKind,
    hypothesis: TextRole,
    reference: TextRole,
    source: Option<TextRole>,
) -> MetricSpec {
    MetricSpec {
        field,
        kind,
        hypothesis,
        reference,
        source,
    }
}

const METRIC_PLAN: [MetricSpec; 20] = [
    // LLM translation against the professional translation, same language.
    spec(F::SameLangBleu, K::Bleu, R::LlmTranslation, R::ProfessionalTranslation, None),
    spec(F::SameLangChrf, K::Chrf, R::LlmTranslation, R::ProfessionalTranslation, None),
    spec(
        F::SameLangBertscore,
        K::BertScoreMultilingual,
        R::LlmTranslation,
        R::ProfessionalTranslation,
        None,
    ),
    spec(
        F::SameLangComet,
        K::Comet,
        R::LlmTranslation,
        R::ProfessionalTranslation,
        Some(R::English),
    ),
    // LLM back-translation against the English original.
    spec(F::CrossLangXlmRoberta, K::XlmRoberta, R::LlmBackTranslation, R::English, None),
    spec(F::CrossLangLabse, K::Labse, R::LlmBackTranslation, R::English, None),
    spec(F::CrossLangMbert, K::Mbert, R::LlmBackTranslation, R::English, None),
    spec(
        F::CrossLangCometQe,
        K::CometQe,
        R::LlmBackTranslation,
        R::English,
        Some(R::English),
    ),
    spec(F::BacktransBleu, K::Bleu, R::LlmBackTranslation, R::English, None),
    spec(F::BacktransChrf, K::Chrf, R::LlmBackTranslation, R::English, None),
    spec(F::BacktransBertscore, K::BertScore, R::LlmBackTranslation, R::English, None),
    // Professional back-translation against the English original.
    spec(F::ProfBacktransBleu, K::Bleu, R::ProfessionalBackTranslation, R::English, None),
    spec(F::ProfBacktransChrf, K::Chrf, R::ProfessionalBackTranslation, R::English, None),
    spec(
        F::ProfBacktransBertscore,
        K::BertScore,
        R::ProfessionalBackTranslation,
        R::English,
        None,
    ),
    spec(F::ProfBacktransLabse, K::Labse, R::ProfessionalBackTranslation, R::English, None),
    spec(
        F::ProfBacktransXlmRoberta,
        K::XlmRoberta,
        R::ProfessionalBackTranslation,
        R::English,
        None,
    ),
    // LLM back-translation against the professional back-translation.
    spec(
        F::LlmVsProfBacktransBleu,
        K::Bleu,
        R::LlmBackTranslation,
        R::ProfessionalBackTranslation,
        None,
    ),
    spec(
        F::LlmVsProfBacktransChrf,
        K::Chrf,
        R::LlmBackTranslation,
        R::ProfessionalBackTranslation,
        None,
    ),
    spec(
        F::LlmVsProfBacktransBertscore,
        K::BertScore,
        R::LlmBackTranslation,
        R::ProfessionalBackTranslation,
        None,
    ),
    spec(
        F::LlmVsProfBacktransLabse,
        K::Labse,
        R::LlmBackTranslation,
        R::ProfessionalBackTranslation,
        None,
    ),
];

/// Computes every metric the record's texts allow. Individual scorer failures
/// leave their field absent and never abort the record.
pub fn score_record(scorer: &dyn Scorer, record: &EvaluationRecord) -> MetricsRecord {
    let mut metrics = MetricsRecord::empty(&record.doc_id, &record.model, &record.language);
    if !record.success {
        return metrics;
    }

    for spec in &METRIC_PLAN {
        let hypothesis = spec.hypothesis.text(record);
        let reference = spec.reference.text(record);
        let source = spec.source.map(|role| role.text(record));

        if hypothesis.trim().is_empty()
            || reference.trim().is_empty()
            || source.is_some_and(|text| text.trim().is_empty())
        {
            continue;
        }

        let request = ScoreRequest {
            hypothesis,
            reference,
            source,
        };
        match scorer.score(spec.kind, &request) {
            Ok(value) if value.is_finite() => metrics.scores.set(spec.field, Some(value)),
            Ok(value) => warn!(
                item = %record.key(),
                field = %spec.field,
                value,
                "scorer returned a non-finite value; leaving field absent"
            ),
            Err(ScoringError::Unavailable { kind, reason }) => debug!(
                item = %record.key(),
                field = %spec.field,
                metric = %kind,
                reason = %reason,
                "metric unavailable"
            ),
            Err(err @ ScoringError::Failed { .. }) => warn!(
                item = %record.key(),
                field = %spec.field,
                error = %err,
                "metric failed"
            ),
        }
    }

    info!(
        item = %record.key(),
        present = metrics.scores.present_count(),
        "scored item"
    );
    metrics
}
