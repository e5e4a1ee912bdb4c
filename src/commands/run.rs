use anyhow::{Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::commands::status::{fingerprint_drift, latest_manifest};
use crate::commands::{engine_settings, scorer_registry};
use crate::config::{ApiSettings, resolve_languages, resolve_models};
use crate::corpus::{Corpus, fingerprint};
use crate::engine::Engine;
use crate::model::{RunCounts, RunManifest};
use crate::pipeline::{BatchOptions, RunStore, run_batch};
use crate::scoring::ScorerRegistry;
use crate::translate::{ChatTranslator, ThreadPacer};
use crate::util::{ensure_directory, now_utc_string, utc_compact_string, write_json_pretty};

const MANIFEST_VERSION: u32 = 1;

pub fn run(args: RunArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let models = resolve_models(&args.models)?;
    let languages = resolve_languages(&args.languages)?;

    let store = RunStore::new(&args.paths.output_root);
    let manifest_dir = store.manifests_dir();
    ensure_directory(&manifest_dir)?;
    let manifest_path = manifest_dir.join(format!("run_{}.json", utc_compact_string(started_ts)));

    info!(
        run_id = %run_id,
        data_root = %args.paths.data_root.display(),
        output_root = %args.paths.output_root.display(),
        "starting run"
    );

    let corpus = Corpus::new(&args.paths.data_root);
    let documents = corpus.load_all()?;
    if documents.is_empty() {
        bail!(
            "no documents found under {}",
            args.paths.data_root.display()
        );
    }

    let corpus_entries = fingerprint(&documents);
    let mut warnings = Vec::<String>::new();
    let resume = !args.no_resume;
    if resume {
        if let Some((previous_path, previous)) = latest_manifest(&manifest_dir)? {
            for drift in fingerprint_drift(&previous.corpus, &corpus_entries) {
                warn!(previous = %previous_path.display(), drift = %drift, "corpus changed since last run");
                warnings.push(drift);
            }
        }
    }

    let api = ApiSettings::from_env()?;
    let translator = ChatTranslator::new(&api)?;
    let scorer = if args.no_score {
        ScorerRegistry::native_only()
    } else {
        scorer_registry(&args.scorer)?
    };
    let pacer = ThreadPacer;
    let engine = Engine::new(&translator, &scorer, &pacer, engine_settings(&args.pacing));

    let options = BatchOptions {
        resume,
        retry_failed: args.retry_failed,
        limit: args.limit,
        checkpoint_interval: args.checkpoint_interval,
        score_inline: !args.no_score,
    };

    let mut manifest = RunManifest {
        manifest_version: MANIFEST_VERSION,
        run_id: run_id.clone(),
        status: "running".to_string(),
        started_at: started_at.clone(),
        updated_at: started_at,
        command: "run".to_string(),
        models: models.clone(),
        languages: languages.clone(),
        checkpoint_interval: options.checkpoint_interval,
        scored_inline: options.score_inline,
        counts: RunCounts::default(),
        corpus: corpus_entries,
        warnings,
    };
    write_json_pretty(&manifest_path, &manifest)?;

    let outcome = run_batch(&engine, &store, &documents, &models, &languages, &options);
    manifest.updated_at = now_utc_string();

    let counts = match outcome {
        Ok(counts) => counts,
        Err(err) => {
            manifest.status = "failed".to_string();
            manifest.warnings.push(format!("{err:#}"));
            write_json_pretty(&manifest_path, &manifest)?;
            return Err(err);
        }
    };

    let finished = counts.skipped + counts.processed == counts.total_items;
    manifest.status = if finished { "completed" } else { "partial" }.to_string();
    manifest.counts = counts;
    write_json_pretty(&manifest_path, &manifest)?;

    info!(
        run_id = %run_id,
        status = %manifest.status,
        manifest = %manifest_path.display(),
        results = %store.results_path().display(),
        "run finished"
    );

    Ok(())
}
