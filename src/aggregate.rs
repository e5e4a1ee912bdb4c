use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{MetricField, MetricScores, MetricsRecord, category_of};

/// Mean of the present values; `None` when nothing is present.
pub fn average(values: &[Option<f64>]) -> Option<f64> {
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for value in values.iter().flatten() {
        sum += value;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub count: usize,
    #[serde(flatten)]
    pub averages: MetricScores,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub by_model: BTreeMap<String, GroupSummary>,
    pub by_language: BTreeMap<String, GroupSummary>,
    pub by_category: BTreeMap<String, GroupSummary>,
    pub by_model_category: BTreeMap<String, GroupSummary>,
}

pub fn model_category_key(model: &str, category: &str) -> String {
    format!("{model}|{category}")
}

pub fn summarize(records: &[MetricsRecord]) -> Summary {
    let mut sorted = records.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|record| record.key());

    let mut by_model = BTreeMap::<String, Vec<&MetricsRecord>>::new();
    let mut by_language = BTreeMap::<String, Vec<&MetricsRecord>>::new();
    let mut by_category = BTreeMap::<String, Vec<&MetricsRecord>>::new();
    let mut by_model_category = BTreeMap::<String, Vec<&MetricsRecord>>::new();

    for record in sorted {
        let category = category_of(&record.doc_id);
        by_model.entry(record.model.clone()).or_default().push(record);
        by_language
            .entry(record.language.clone())
            .or_default()
            .push(record);
        by_category
            .entry(category.to_string())
            .or_default()
            .push(record);
        by_model_category
            .entry(model_category_key(&record.model, category))
            .or_default()
            .push(record);
    }

    Summary {
        by_model: summarize_groups(by_model),
        by_language: summarize_groups(by_language),
        by_category: summarize_groups(by_category),
        by_model_category: summarize_groups(by_model_category),
    }
}

fn summarize_groups(
    groups: BTreeMap<String, Vec<&MetricsRecord>>,
) -> BTreeMap<String, GroupSummary> {
    groups
        .into_iter()
        .map(|(key, members)| (key, summarize_group(&members)))
        .collect()
}

fn summarize_group(members: &[&MetricsRecord]) -> GroupSummary {
    let mut averages = MetricScores::default();
    for field in MetricField::ALL {
        let values = members
            .iter()
            .map(|record| record.scores.get(field))
            .collect::<Vec<_>>();
        averages.set(field, average(&values));
    }
    GroupSummary {
        count: members.len(),
        averages,
    }
}
