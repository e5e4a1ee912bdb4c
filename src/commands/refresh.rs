use anyhow::{Result, bail};
use tracing::info;

use crate::cli::RefreshArgs;
use crate::commands::aggregate::write_summary;
use crate::commands::{engine_settings, scorer_registry};
use crate::config::{ApiSettings, language_spec};
use crate::corpus::Corpus;
use crate::engine::Engine;
use crate::pipeline::{RunStore, refresh_language};
use crate::translate::{ChatTranslator, ThreadPacer};

pub fn run(args: RefreshArgs) -> Result<()> {
    let Some(language) = language_spec(&args.language) else {
        bail!("unknown language '{}'", args.language);
    };

    let store = RunStore::new(&args.paths.output_root);
    if !store.results_path().exists() {
        bail!(
            "no results at {}; nothing to refresh",
            store.results_path().display()
        );
    }

    let corpus = Corpus::new(&args.paths.data_root);
    let api = ApiSettings::from_env()?;
    let translator = ChatTranslator::new(&api)?;
    let scorer = scorer_registry(&args.scorer)?;
    let pacer = ThreadPacer;
    let engine = Engine::new(&translator, &scorer, &pacer, engine_settings(&args.pacing));

    info!(language = language.key, rescore_all = args.rescore_all, "refreshing professional translations");
    let counts = refresh_language(&engine, &store, &corpus, language, args.rescore_all)?;

    let metrics = store.metrics_ledger().load(true)?;
    write_summary(metrics.records(), &store.summary_path())?;

    info!(
        language = language.key,
        changed = counts.changed,
        rescored = counts.rescored,
        back_translation_failures = counts.back_translation_failures,
        "refresh finished"
    );
    Ok(())
}
