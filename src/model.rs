use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub fn item_key(doc_id: &str, model: &str, language: &str) -> String {
    format!("{doc_id}|{model}|{language}")
}

/// The category is the first path segment of a document id.
pub fn category_of(doc_id: &str) -> &str {
    doc_id.split('/').next().unwrap_or(doc_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Immunize,
    Cancer,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Immunize, Category::Cancer];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Immunize => "immunize",
            Self::Cancer => "cancer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: String,
    pub category: Category,
    pub topic: String,
    pub english_text: String,
    pub professional_translations: BTreeMap<String, String>,
}

impl Document {
    pub fn professional_translation(&self, language: &str) -> Option<&str> {
        self.professional_translations
            .get(language)
            .map(String::as_str)
            .filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub doc_id: String,
    pub model: String,
    pub language: String,
    pub english_original: String,
    pub llm_translation: String,
    pub professional_translation: String,
    pub llm_back_translation: String,
    #[serde(default)]
    pub professional_back_translation: String,
    pub translation_time: f64,
    pub back_translation_time: f64,
    #[serde(default)]
    pub professional_back_translation_time: f64,
    pub timestamp: String,
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl EvaluationRecord {
    pub fn key(&self) -> String {
        item_key(&self.doc_id, &self.model, &self.language)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricField {
    SameLangBleu,
    SameLangChrf,
    SameLangBertscore,
    SameLangComet,
    CrossLangXlmRoberta,
    CrossLangLabse,
    CrossLangMbert,
    CrossLangCometQe,
    BacktransBleu,
    BacktransChrf,
    BacktransBertscore,
    ProfBacktransBleu,
    ProfBacktransChrf,
    ProfBacktransBertscore,
    ProfBacktransLabse,
    ProfBacktransXlmRoberta,
    LlmVsProfBacktransBleu,
    LlmVsProfBacktransChrf,
    LlmVsProfBacktransBertscore,
    LlmVsProfBacktransLabse,
}

impl MetricField {
    pub const ALL: [MetricField; 20] = [
        MetricField::SameLangBleu,
        MetricField::SameLangChrf,
        MetricField::SameLangBertscore,
        MetricField::SameLangComet,
        MetricField::CrossLangXlmRoberta,
        MetricField::CrossLangLabse,
        MetricField::CrossLangMbert,
        MetricField::CrossLangCometQe,
        MetricField::BacktransBleu,
        MetricField::BacktransChrf,
        MetricField::BacktransBertscore,
        MetricField::ProfBacktransBleu,
        MetricField::ProfBacktransChrf,
        MetricField::ProfBacktransBertscore,
        MetricField::ProfBacktransLabse,
        MetricField::ProfBacktransXlmRoberta,
        MetricField::LlmVsProfBacktransBleu,
        MetricField::LlmVsProfBacktransChrf,
        MetricField::LlmVsProfBacktransBertscore,
        MetricField::LlmVsProfBacktransLabse,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SameLangBleu => "same_lang_bleu",
            Self::SameLangChrf => "same_lang_chrf",
            Self::SameLangBertscore => "same_lang_bertscore",
            Self::SameLangComet => "same_lang_comet",
            Self::CrossLangXlmRoberta => "cross_lang_xlm_roberta",
            Self::CrossLangLabse => "cross_lang_labse",
            Self::CrossLangMbert => "cross_lang_mbert",
            Self::CrossLangCometQe => "cross_lang_comet_qe",
            Self::BacktransBleu => "backtrans_bleu",
            Self::BacktransChrf => "backtrans_chrf",
            Self::BacktransBertscore => "backtrans_bertscore",
            Self::ProfBacktransBleu => "prof_backtrans_bleu",
            Self::ProfBacktransChrf => "prof_backtrans_chrf",
            Self::ProfBacktransBertscore => "prof_backtrans_bertscore",
            Self::ProfBacktransLabse => "prof_backtrans_labse",
            Self::ProfBacktransXlmRoberta => "prof_backtrans_xlm_roberta",
            Self::LlmVsProfBacktransBleu => "llm_vs_prof_backtrans_bleu",
            Self::LlmVsProfBacktransChrf => "llm_vs_prof_backtrans_chrf",
            Self::LlmVsProfBacktransBertscore => "llm_vs_prof_backtrans_bertscore",
            Self::LlmVsProfBacktransLabse => "llm_vs_prof_backtrans_labse",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == normalized)
    }
}

impl fmt::Display for MetricField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One optional value per metric field. `None` means "not computed" and is
/// never the same thing as a score of zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricScores {
    #[serde(default)]
    pub same_lang_bleu: Option<f64>,
    #[serde(default)]
    pub same_lang_chrf: Option<f64>,
    #[serde(default)]
    pub same_lang_bertscore: Option<f64>,
    #[serde(default)]
    pub same_lang_comet: Option<f64>,
    #[serde(default)]
    pub cross_lang_xlm_roberta: Option<f64>,
    #[serde(default)]
    pub cross_lang_labse: Option<f64>,
    #[serde(default)]
    pub cross_lang_mbert: Option<f64>,
    #[serde(default)]
    pub cross_lang_comet_qe: Option<f64>,
    #[serde(default)]
    pub backtrans_bleu: Option<f64>,
    #[serde(default)]
    pub backtrans_chrf: Option<f64>,
    #[serde(default)]
    pub backtrans_bertscore: Option<f64>,
    #[serde(default)]
    pub prof_backtrans_bleu: Option<f64>,
    #[serde(default)]
    pub prof_backtrans_chrf: Option<f64>,
    #[serde(default)]
    pub prof_backtrans_bertscore: Option<f64>,
    #[serde(default)]
    pub prof_backtrans_labse: Option<f64>,
    #[serde(default)]
    pub prof_backtrans_xlm_roberta: Option<f64>,
    #[serde(default)]
    pub llm_vs_prof_backtrans_bleu: Option<f64>,
    #[serde(default)]
    pub llm_vs_prof_backtrans_chrf: Option<f64>,
    #[serde(default)]
    pub llm_vs_prof_backtrans_bertscore: Option<f64>,
    #[serde(default)]
    pub llm_vs_prof_backtrans_labse: Option<f64>,
}

impl MetricScores {
    pub fn get(&self, field: MetricField) -> Option<f64> {
        *self.slot(field)
    }

    /// Stores a finite value; anything else leaves the field absent.
    pub fn set(&mut self, field: MetricField, value: Option<f64>) {
        *self.slot_mut(field) = value.filter(|score| score.is_finite());
    }

    pub fn present_count(&self) -> usize {
        MetricField::ALL
            .into_iter()
            .filter(|field| self.get(*field).is_some())
            .count()
    }

    fn slot(&self, field: MetricField) -> &Option<f64> {
        match field {
            MetricField::SameLangBleu => &self.same_lang_bleu,
            MetricField::SameLangChrf => &self.same_lang_chrf,
            MetricField::SameLangBertscore => &self.same_lang_bertscore,
            MetricField::SameLangComet => &self.same_lang_comet,
            MetricField::CrossLangXlmRoberta => &self.cross_lang_xlm_roberta,
            MetricField::CrossLangLabse => &self.cross_lang_labse,
            MetricField::CrossLangMbert => &self.cross_lang_mbert,
            MetricField::CrossLangCometQe => &self.cross_lang_comet_qe,
            MetricField::BacktransBleu => &self.backtrans_bleu,
            MetricField::BacktransChrf => &self.backtrans_chrf,
            MetricField::BacktransBertscore => &self.backtrans_bertscore,
            MetricField::ProfBacktransBleu => &self.prof_backtrans_bleu,
            MetricField::ProfBacktransChrf => &self.prof_backtrans_chrf,
            MetricField::ProfBacktransBertscore => &self.prof_backtrans_bertscore,
            MetricField::ProfBacktransLabse => &self.prof_backtrans_labse,
            MetricField::ProfBacktransXlmRoberta => &self.prof_backtrans_xlm_roberta,
            MetricField::LlmVsProfBacktransBleu => &self.llm_vs_prof_backtrans_bleu,
            MetricField::LlmVsProfBacktransChrf => &self.llm_vs_prof_backtrans_chrf,
            MetricField::LlmVsProfBacktransBertscore => &self.llm_vs_prof_backtrans_bertscore,
            MetricField::LlmVsProfBacktransLabse => &self.llm_vs_prof_backtrans_labse,
        }
    }

    fn slot_mut(&mut self, field: MetricField) -> &mut Option<f64> {
        match field {
            MetricField::SameLangBleu => &mut self.same_lang_bleu,
            MetricField::SameLangChrf => &mut self.same_lang_chrf,
            MetricField::SameLangBertscore => &mut self.same_lang_bertscore,
            MetricField::SameLangComet => &mut self.same_lang_comet,
            MetricField::CrossLangXlmRoberta => &mut self.cross_lang_xlm_roberta,
            MetricField::CrossLangLabse => &mut self.cross_lang_labse,
            MetricField::CrossLangMbert => &mut self.cross_lang_mbert,
            MetricField::CrossLangCometQe => &mut self.cross_lang_comet_qe,
            MetricField::BacktransBleu => &mut self.backtrans_bleu,
            MetricField::BacktransChrf => &mut self.backtrans_chrf,
            MetricField::BacktransBertscore => &mut self.backtrans_bertscore,
            MetricField::ProfBacktransBleu => &mut self.prof_backtrans_bleu,
            MetricField::ProfBacktransChrf => &mut self.prof_backtrans_chrf,
            MetricField::ProfBacktransBertscore => &mut self.prof_backtrans_bertscore,
            MetricField::ProfBacktransLabse => &mut self.prof_backtrans_labse,
            MetricField::ProfBacktransXlmRoberta => &mut self.prof_backtrans_xlm_roberta,
            MetricField::LlmVsProfBacktransBleu => &mut self.llm_vs_prof_backtrans_bleu,
            MetricField::LlmVsProfBacktransChrf => &mut self.llm_vs_prof_backtrans_chrf,
            MetricField::LlmVsProfBacktransBertscore => {
                &mut self.llm_vs_prof_backtrans_bertscore
            }
            MetricField::LlmVsProfBacktransLabse => &mut self.llm_vs_prof_backtrans_labse,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub doc_id: String,
    pub model: String,
    pub language: String,
    #[serde(flatten)]
    pub scores: MetricScores,
}

impl MetricsRecord {
    pub fn empty(doc_id: &str, model: &str, language: &str) -> Self {
        Self {
            doc_id: doc_id.to_string(),
            model: model.to_string(),
            language: language.to_string(),
            scores: MetricScores::default(),
        }
    }

    pub fn key(&self) -> String {
        item_key(&self.doc_id, &self.model, &self.language)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub doc_id: String,
    pub sha256: String,
    pub professional_languages: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunCounts {
    pub total_items: usize,
    pub skipped: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results_total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub models: Vec<String>,
    pub languages: Vec<String>,
    pub checkpoint_interval: usize,
    pub scored_inline: bool,
    pub counts: RunCounts,
    pub corpus: Vec<CorpusEntry>,
    pub warnings: Vec<String>,
}
