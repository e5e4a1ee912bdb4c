use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::cli::ReviewArgs;
use crate::config::resolve_languages;
use crate::model::{Category, MetricField};
use crate::pipeline::RunStore;
use crate::review::{build_review_packet, select_for_review};
use crate::util::{ensure_directory, now_utc_string, write_json_pretty};

pub fn run(args: ReviewArgs) -> Result<()> {
    let languages = resolve_languages(&args.languages)?;
    let Some(category) = Category::parse(&args.category) else {
        bail!("unknown category '{}' (expected immunize or cancer)", args.category);
    };
    let Some(field) = MetricField::parse(&args.metric) else {
        bail!("unknown metric field '{}'", args.metric);
    };

    let store = RunStore::new(&args.paths.output_root);
    let results = store.results_ledger().load(true)?;
    let metrics = store.metrics_ledger().load(true)?;
    if metrics.records().is_empty() {
        bail!("no metrics available; run `score` first");
    }

    let review_dir = store.review_dir();
    ensure_directory(&review_dir)?;

    for language in &languages {
        let selected = select_for_review(metrics.records(), language, category, field, args.count);
        if selected.is_empty() {
            warn!(
                language = %language,
                category = %category,
                metric = %field,
                "no documents with at least two scored models"
            );
            continue;
        }

        for choice in &selected {
            info!(
                language = %language,
                doc_id = %choice.doc_id,
                mean = choice.mean,
                variance = choice.variance,
                "selected for review"
            );
        }

        let packet = build_review_packet(
            results.records(),
            metrics.records(),
            language,
            category,
            field,
            &selected,
            now_utc_string(),
        );
        let path = review_dir.join(format!("review_{language}_{category}.json"));
        write_json_pretty(&path, &packet)?;
        info!(path = %path.display(), documents = packet.documents.len(), "wrote review packet");
    }

    Ok(())
}
