use anyhow::{Result, bail};
use tracing::info;

use crate::cli::ScoreArgs;
use crate::commands::scorer_registry;
use crate::model::EvaluationRecord;
use crate::pipeline::{RunStore, run_scoring};
use crate::util::read_json;

pub fn run(args: ScoreArgs) -> Result<()> {
    let store = RunStore::new(&args.paths.output_root);

    let results: Vec<EvaluationRecord> = match &args.input {
        Some(path) => {
            info!(input = %path.display(), "scoring results file");
            read_json(path)?
        }
        None => {
            let ledger = store.results_ledger();
            info!(input = %ledger.records_path().display(), "scoring run results");
            ledger.load(true)?.records().to_vec()
        }
    };
    if results.is_empty() {
        bail!("no results to score; run the `run` command first");
    }

    let scorer = scorer_registry(&args.scorer)?;
    let counts = run_scoring(
        &scorer,
        &results,
        &store.metrics_ledger(),
        !args.no_resume,
        args.checkpoint_interval,
    )?;

    info!(
        scored = counts.scored,
        skipped = counts.skipped,
        metrics = %store.metrics_path().display(),
        "metrics written; run `aggregate` for summaries"
    );
    Ok(())
}
