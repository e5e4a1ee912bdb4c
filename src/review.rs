//! Picks the documents on which models disagree most, for bilingual review.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::config::{language_name, model_spec};
use crate::model::{Category, EvaluationRecord, MetricField, MetricsRecord, category_of};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelScore {
    pub model: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentVariance {
    pub doc_id: String,
    pub mean: f64,
    pub variance: f64,
    pub scores: Vec<ModelScore>,
}

/// Documents of `language` in `category` ranked by the sample variance of
/// `field` across models. Documents with fewer than two values are skipped.
pub fn select_for_review(
    metrics: &[MetricsRecord],
    language: &str,
    category: Category,
    field: MetricField,
    count: usize,
) -> Vec<DocumentVariance> {
    let mut per_doc = BTreeMap::<&str, Vec<ModelScore>>::new();
    for record in metrics {
        if record.language != language || category_of(&record.doc_id) != category.as_str() {
            continue;
        }
        let Some(score) = record.scores.get(field) else {
            continue;
        };
        per_doc.entry(&record.doc_id).or_default().push(ModelScore {
            model: record.model.clone(),
            score,
        });
    }

    let mut ranked = per_doc
        .into_iter()
        .filter(|(_, scores)| scores.len() >= 2)
        .map(|(doc_id, mut scores)| {
            scores.sort_by(|a, b| a.model.cmp(&b.model));
            let values = scores.iter().map(|entry| entry.score).collect::<Vec<_>>();
            let (mean, variance) = mean_and_sample_variance(&values);
            DocumentVariance {
                doc_id: doc_id.to_string(),
                mean,
                variance,
                scores,
            }
        })
        .collect::<Vec<_>>();

    ranked.sort_by(|a, b| {
        b.variance
            .total_cmp(&a.variance)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
    ranked.truncate(count);
    ranked
}

fn mean_and_sample_variance(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let squared = values.iter().map(|value| (value - mean).powi(2)).sum::<f64>();
    (mean, squared / (n - 1.0))
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelReview {
    pub model: String,
    pub display_name: String,
    pub llm_translation: String,
    pub llm_back_translation: String,
    pub professional_back_translation: String,
    pub score: Option<f64>,
    pub same_lang_bleu: Option<f64>,
    pub backtrans_bleu: Option<f64>,
    pub prof_backtrans_bleu: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewDocument {
    pub doc_id: String,
    pub mean: f64,
    pub variance: f64,
    pub english_original: String,
    pub professional_translation: String,
    pub models: Vec<ModelReview>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewPacket {
    pub generated_at: String,
    pub language: String,
    pub language_name: String,
    pub category: Category,
    pub metric: String,
    pub documents: Vec<ReviewDocument>,
}

pub fn build_review_packet(
    results: &[EvaluationRecord],
    metrics: &[MetricsRecord],
    language: &str,
    category: Category,
    field: MetricField,
    selected: &[DocumentVariance],
    generated_at: String,
) -> ReviewPacket {
    let metrics_by_key = metrics
        .iter()
        .map(|record| (record.key(), record))
        .collect::<HashMap<_, _>>();

    let mut documents = Vec::with_capacity(selected.len());
    for choice in selected {
        let mut doc_results = results
            .iter()
            .filter(|record| {
                record.doc_id == choice.doc_id && record.language == language && record.success
            })
            .collect::<Vec<_>>();
        doc_results.sort_by(|a, b| a.model.cmp(&b.model));

        let Some(first) = doc_results.first() else {
            continue;
        };

        let models = doc_results
            .iter()
            .map(|record| {
                let scores = metrics_by_key.get(&record.key()).map(|m| &m.scores);
                ModelReview {
                    model: record.model.clone(),
                    display_name: model_spec(&record.model)
                        .map(|spec| spec.display_name.to_string())
                        .unwrap_or_else(|| record.model.clone()),
                    llm_translation: record.llm_translation.clone(),
                    llm_back_translation: record.llm_back_translation.clone(),
                    professional_back_translation: record.professional_back_translation.clone(),
                    score: scores.and_then(|s| s.get(field)),
                    same_lang_bleu: scores.and_then(|s| s.same_lang_bleu),
                    backtrans_bleu: scores.and_then(|s| s.backtrans_bleu),
                    prof_backtrans_bleu: scores.and_then(|s| s.prof_backtrans_bleu),
                }
            })
            .collect();

        documents.push(ReviewDocument {
            doc_id: choice.doc_id.clone(),
            mean: choice.mean,
            variance: choice.variance,
            english_original: first.english_original.clone(),
            professional_translation: first.professional_translation.clone(),
            models,
        });
    }

    ReviewPacket {
        generated_at,
        language: language.to_string(),
        language_name: language_name(language).to_string(),
        category,
        metric: field.as_str().to_string(),
        documents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comet(doc_id: &str, model: &str, language: &str, value: Option<f64>) -> MetricsRecord {
        let mut record = MetricsRecord::empty(doc_id, model, language);
        record.scores.set(MetricField::SameLangComet, value);
        record
    }

    fn result(doc_id: &str, model: &str) -> EvaluationRecord {
        EvaluationRecord {
            doc_id: doc_id.to_string(),
            model: model.to_string(),
            language: "spanish".to_string(),
            english_original: "English".to_string(),
            llm_translation: format!("{model} es"),
            professional_translation: "Profesional".to_string(),
            llm_back_translation: format!("{model} en"),
            professional_back_translation: "Professional".to_string(),
            translation_time: 1.0,
            back_translation_time: 1.0,
            professional_back_translation_time: 1.0,
            timestamp: "2025-01-01T00:00:00Z".to_string(),
            success: true,
            error_message: None,
        }
    }

    #[test]
    fn mean_and_sample_variance_uses_n_minus_one() {
        let (mean, variance) = mean_and_sample_variance(&[0.6, 0.8]);
        assert!((mean - 0.7).abs() < 1e-12);
        assert!((variance - 0.02).abs() < 1e-12);
    }

    #[test]
    fn select_for_review_ranks_by_disagreement_within_filter() {
        let metrics = vec![
            comet("cancer/calm", "gpt-5.1", "spanish", Some(0.80)),
            comet("cancer/calm", "kimi-k2", "spanish", Some(0.81)),
            comet("cancer/split", "gpt-5.1", "spanish", Some(0.50)),
            comet("cancer/split", "kimi-k2", "spanish", Some(0.90)),
            comet("cancer/single", "gpt-5.1", "spanish", Some(0.10)),
            comet("cancer/single", "kimi-k2", "spanish", None),
            comet("immunize/flu", "gpt-5.1", "spanish", Some(0.0)),
            comet("immunize/flu", "kimi-k2", "spanish", Some(1.0)),
            comet("cancer/split", "gemini-3-pro", "korean", Some(0.0)),
        ];

        let selected = select_for_review(
            &metrics,
            "spanish",
            Category::Cancer,
            MetricField::SameLangComet,
            5,
        );
        let ids = selected.iter().map(|doc| doc.doc_id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["cancer/split", "cancer/calm"]);
        assert_eq!(selected[0].scores.len(), 2);
    }

    #[test]
    fn select_for_review_breaks_ties_by_doc_id_and_truncates() {
        let metrics = vec![
            comet("cancer/b", "m1", "spanish", Some(0.25)),
            comet("cancer/b", "m2", "spanish", Some(0.75)),
            comet("cancer/a", "m1", "spanish", Some(0.5)),
            comet("cancer/a", "m2", "spanish", Some(1.0)),
        ];
        let selected =
            select_for_review(&metrics, "spanish", Category::Cancer, MetricField::SameLangComet, 1);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].doc_id, "cancer/a");
    }

    #[test]
    fn build_review_packet_collects_each_model_side_by_side() {
        let metrics = vec![
            comet("cancer/split", "kimi-k2", "spanish", Some(0.9)),
            comet("cancer/split", "gpt-5.1", "spanish", Some(0.5)),
        ];
        let results = vec![result("cancer/split", "kimi-k2"), result("cancer/split", "gpt-5.1")];
        let selected = select_for_review(
            &metrics,
            "spanish",
            Category::Cancer,
            MetricField::SameLangComet,
            2,
        );

        let packet = build_review_packet(
            &results,
            &metrics,
            "spanish",
            Category::Cancer,
            MetricField::SameLangComet,
            &selected,
            "2025-01-01T00:00:00Z".to_string(),
        );

        assert_eq!(packet.language_name, "Spanish");
        assert_eq!(packet.documents.len(), 1);
        let document = &packet.documents[0];
        assert_eq!(document.professional_translation, "Profesional");
        let models = document.models.iter().map(|m| m.display_name.as_str()).collect::<Vec<_>>();
        assert_eq!(models, vec!["GPT-5.1", "Kimi K2"]);
        assert_eq!(document.models[1].score, Some(0.9));
    }
}
