use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Result, bail};
use tracing::info;

use crate::aggregate::{GroupSummary, Summary, summarize};
use crate::cli::AggregateArgs;
use crate::model::{MetricField, MetricsRecord};
use crate::pipeline::RunStore;
use crate::util::{read_json, write_json_pretty};

pub fn run(args: AggregateArgs) -> Result<()> {
    let store = RunStore::new(&args.paths.output_root);

    let metrics: Vec<MetricsRecord> = match &args.metrics_path {
        Some(path) => read_json(path)?,
        None => store.metrics_ledger().load(true)?.records().to_vec(),
    };
    if metrics.is_empty() {
        bail!("no metrics to aggregate; run `score` or `run` first");
    }

    let summary_path = args
        .summary_path
        .clone()
        .unwrap_or_else(|| store.summary_path());
    let summary = write_summary(&metrics, &summary_path)?;
    print!("{}", render_tables(&summary));
    Ok(())
}

pub(crate) fn write_summary(metrics: &[MetricsRecord], summary_path: &Path) -> Result<Summary> {
    let summary = summarize(metrics);
    write_json_pretty(summary_path, &summary)?;
    info!(
        records = metrics.len(),
        models = summary.by_model.len(),
        languages = summary.by_language.len(),
        path = %summary_path.display(),
        "wrote summary"
    );
    Ok(summary)
}

struct Table<'a> {
    title: &'a str,
    columns: &'a [(&'a str, MetricField)],
}

const MODEL_TABLES: [Table<'static>; 4] = [
    Table {
        title: "LLM translation vs professional translation (by model)",
        columns: &[
            ("BLEU", MetricField::SameLangBleu),
            ("chrF", MetricField::SameLangChrf),
            ("BERT", MetricField::SameLangBertscore),
            ("COMET", MetricField::SameLangComet),
        ],
    },
    Table {
        title: "LLM back-translation vs original English (by model)",
        columns: &[
            ("BLEU", MetricField::BacktransBleu),
            ("BERT", MetricField::BacktransBertscore),
            ("LaBSE", MetricField::CrossLangLabse),
            ("XLM-R", MetricField::CrossLangXlmRoberta),
            ("COMET-QE", MetricField::CrossLangCometQe),
        ],
    },
    Table {
        title: "Professional back-translation vs original English (by model)",
        columns: &[
            ("BLEU", MetricField::ProfBacktransBleu),
            ("BERT", MetricField::ProfBacktransBertscore),
            ("LaBSE", MetricField::ProfBacktransLabse),
        ],
    },
    Table {
        title: "LLM back-translation vs professional back-translation (by model)",
        columns: &[
            ("BLEU", MetricField::LlmVsProfBacktransBleu),
            ("LaBSE", MetricField::LlmVsProfBacktransLabse),
        ],
    },
];

const CROSS_GOAL_COLUMNS: [(&str, MetricField); 5] = [
    ("G2:BLEU", MetricField::SameLangBleu),
    ("G1:BLEU", MetricField::BacktransBleu),
    ("G1:LaBSE", MetricField::CrossLangLabse),
    ("G3:BLEU", MetricField::ProfBacktransBleu),
    ("G3:LaBSE", MetricField::ProfBacktransLabse),
];

pub(crate) fn render_tables(summary: &Summary) -> String {
    let mut out = String::new();
    for table in &MODEL_TABLES {
        render_group_table(&mut out, table.title, "Model", &summary.by_model, table.columns);
    }
    render_group_table(
        &mut out,
        "By language",
        "Language",
        &summary.by_language,
        &CROSS_GOAL_COLUMNS,
    );
    render_group_table(
        &mut out,
        "By category",
        "Category",
        &summary.by_category,
        &CROSS_GOAL_COLUMNS,
    );
    render_group_table(
        &mut out,
        "By model and category",
        "Model|Category",
        &summary.by_model_category,
        &CROSS_GOAL_COLUMNS,
    );
    out
}

fn render_group_table(
    out: &mut String,
    title: &str,
    label: &str,
    groups: &BTreeMap<String, GroupSummary>,
    columns: &[(&str, MetricField)],
) {
    let rule = "=".repeat(28 + 7 + columns.len() * 10);
    out.push_str(&format!("\n{rule}\n{title}\n{rule}\n"));
    out.push_str(&format!("{label:<28} {:>6}", "Count"));
    for (heading, _) in columns {
        out.push_str(&format!(" {heading:>9}"));
    }
    out.push('\n');

    for (key, group) in groups {
        out.push_str(&format!("{key:<28} {:>6}", group.count));
        for (_, field) in columns {
            out.push_str(&format!(" {:>9}", format_score(group.averages.get(*field))));
        }
        out.push('\n');
    }
}

fn format_score(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{value:.2}"),
        None => "N/A".to_string(),
    }
}
