use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Result, bail};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::LanguageSpec;
use crate::corpus::Corpus;
use crate::engine::{Engine, score_record};
use crate::model::{Document, EvaluationRecord, MetricsRecord, RunCounts};
use crate::queue::{Ledger, LedgerState, enumerate};
use crate::scoring::Scorer;

pub const RUN_CHECKPOINT_INTERVAL: usize = 5;
pub const SCORE_CHECKPOINT_INTERVAL: usize = 50;

/// Output tree shared by every command.
#[derive(Debug, Clone)]
pub struct RunStore {
    root: PathBuf,
}

impl RunStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn results_path(&self) -> PathBuf {
        self.root.join("results").join("all_results.json")
    }

    pub fn results_checkpoint_path(&self) -> PathBuf {
        self.root.join("results").join("checkpoint.json")
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.root.join("metrics").join("all_metrics.json")
    }

    pub fn metrics_checkpoint_path(&self) -> PathBuf {
        self.root.join("metrics").join("metrics_checkpoint.json")
    }

    pub fn summary_path(&self) -> PathBuf {
        self.root.join("metrics").join("summary.json")
    }

    pub fn manifests_dir(&self) -> PathBuf {
        self.root.join("manifests")
    }

    pub fn review_dir(&self) -> PathBuf {
        self.root.join("review")
    }

    pub fn results_ledger(&self) -> Ledger<EvaluationRecord> {
        Ledger::new(self.results_path(), self.results_checkpoint_path())
    }

    pub fn metrics_ledger(&self) -> Ledger<MetricsRecord> {
        Ledger::new(self.metrics_path(), self.metrics_checkpoint_path())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub resume: bool,
    pub retry_failed: bool,
    pub limit: Option<usize>,
    pub checkpoint_interval: usize,
    pub score_inline: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            resume: true,
            retry_failed: false,
            limit: None,
            checkpoint_interval: RUN_CHECKPOINT_INTERVAL,
            score_inline: true,
        }
    }
}

/// Translates (and optionally scores) every pending item, committing both
/// ledgers every `checkpoint_interval` items and once more at the end.
pub fn run_batch(
    engine: &Engine<'_>,
    store: &RunStore,
    documents: &[Document],
    models: &[String],
    languages: &[String],
    options: &BatchOptions,
) -> Result<RunCounts> {
    let interval = options.checkpoint_interval.max(1);
    let results_ledger = store.results_ledger();
    let metrics_ledger = store.metrics_ledger();

    let mut results = results_ledger.load(options.resume)?;
    // Loaded even when scoring is deferred: metrics of items about to be
    // re-translated must not survive for `score` to skip.
    let mut metrics = metrics_ledger.load(options.resume)?;

    if options.retry_failed {
        let forgotten = results.forget_where(|record| !record.success);
        if !forgotten.is_empty() {
            info!(items = forgotten.len(), "re-queued failed items");
        }
    }

    let stale = metrics.forget_where(|record| !results.is_done(&record.key()));
    if !stale.is_empty() {
        info!(items = stale.len(), "dropped metrics of items queued for translation");
    }
    if !options.score_inline && (!options.resume || !stale.is_empty()) {
        metrics_ledger.commit(&metrics)?;
    }

    let by_id = documents
        .iter()
        .map(|document| (document.doc_id.as_str(), document))
        .collect::<HashMap<_, _>>();
    let items = enumerate(documents, models, languages);
    let total = items.len();

    let mut counts = RunCounts {
        total_items: total,
        ..RunCounts::default()
    };
    let mut done = 0usize;
    let mut since_commit = 0usize;

    info!(
        total,
        documents = documents.len(),
        models = %models.join(","),
        languages = %languages.join(","),
        "starting batch"
    );

    for item in &items {
        let key = item.key();
        if results.is_done(&key) {
            counts.skipped += 1;
            done += 1;
            continue;
        }

        if let Some(limit) = options.limit {
            if counts.processed >= limit {
                info!(limit, "item limit reached; stopping early");
                break;
            }
        }

        let Some(document) = by_id.get(item.document_id.as_str()) else {
            bail!("work item references unknown document {}", item.document_id);
        };

        let outcome = engine.evaluate(document, item, options.score_inline);
        let state = outcome.state;
        match outcome.failed_during {
            None => counts.succeeded += 1,
            Some(stage) => {
                counts.failed += 1;
                debug!(item = %key, stage = stage.as_str(), "recorded failed item");
            }
        }
        if let Some(record) = outcome.metrics {
            metrics.record(record);
        }
        results.record(outcome.record);

        counts.processed += 1;
        done += 1;
        since_commit += 1;
        info!(
            item = %key,
            state = state.as_str(),
            done,
            total,
            percent = %format!("{:.1}", percent(done, total)),
            "progress"
        );

        if since_commit >= interval {
            commit(
                &results_ledger,
                &results,
                &metrics_ledger,
                options.score_inline.then_some(&metrics),
            )?;
            since_commit = 0;
        }

        engine.pace_item();
    }

    commit(
        &results_ledger,
        &results,
        &metrics_ledger,
        options.score_inline.then_some(&metrics),
    )?;
    counts.results_total = results.records().len();

    info!(
        processed = counts.processed,
        succeeded = counts.succeeded,
        failed = counts.failed,
        skipped = counts.skipped,
        results_total = counts.results_total,
        "batch complete"
    );
    Ok(counts)
}

// Metrics go first so a results checkpoint never names an item whose inline
// metrics were lost.
fn commit(
    results_ledger: &Ledger<EvaluationRecord>,
    results: &LedgerState<EvaluationRecord>,
    metrics_ledger: &Ledger<MetricsRecord>,
    metrics: Option<&LedgerState<MetricsRecord>>,
) -> Result<()> {
    if let Some(metrics) = metrics {
        metrics_ledger.commit(metrics)?;
    }
    results_ledger.commit(results)
}

fn percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        done as f64 * 100.0 / total as f64
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScoreCounts {
    pub total: usize,
    pub skipped: usize,
    pub scored: usize,
    pub failed_records: usize,
}

/// Computes metrics for every result without a committed metrics record.
pub fn run_scoring(
    scorer: &dyn Scorer,
    results: &[EvaluationRecord],
    metrics_ledger: &Ledger<MetricsRecord>,
    resume: bool,
    checkpoint_interval: usize,
) -> Result<ScoreCounts> {
    let interval = checkpoint_interval.max(1);
    let mut metrics = metrics_ledger.load(resume)?;

    // Later entries supersede earlier ones with the same key.
    let mut latest = HashMap::<String, usize>::new();
    for (position, record) in results.iter().enumerate() {
        latest.insert(record.key(), position);
    }

    let mut counts = ScoreCounts {
        total: latest.len(),
        ..ScoreCounts::default()
    };
    let mut done = 0usize;
    let mut since_commit = 0usize;

    for (position, record) in results.iter().enumerate() {
        let key = record.key();
        if latest.get(&key) != Some(&position) {
            continue;
        }
        done += 1;
        if metrics.is_done(&key) {
            counts.skipped += 1;
            continue;
        }

        if !record.success {
            counts.failed_records += 1;
        }
        metrics.record(score_record(scorer, record));
        counts.scored += 1;
        since_commit += 1;

        info!(
            item = %key,
            done,
            total = counts.total,
            percent = %format!("{:.1}", percent(done, counts.total)),
            "scoring progress"
        );

        if since_commit >= interval {
            metrics_ledger.commit(&metrics)?;
            since_commit = 0;
        }
    }

    metrics_ledger.commit(&metrics)?;
    info!(
        scored = counts.scored,
        skipped = counts.skipped,
        failed_records = counts.failed_records,
        "scoring complete"
    );
    Ok(counts)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshCounts {
    pub examined: usize,
    pub changed: usize,
    pub rescored: usize,
    pub back_translation_failures: usize,
}

/// Re-reads one language's professional texts and supersedes the affected
/// evaluation and metrics records in place.
pub fn refresh_language(
    engine: &Engine<'_>,
    store: &RunStore,
    corpus: &Corpus,
    language: &LanguageSpec,
    rescore_all: bool,
) -> Result<RefreshCounts> {
    let results_ledger = store.results_ledger();
    let metrics_ledger = store.metrics_ledger();
    let mut results = results_ledger.load(true)?;
    let mut metrics = metrics_ledger.load(true)?;

    let current = corpus.load_professional_translations(language)?;
    let targets = results
        .records()
        .iter()
        .filter(|record| record.language == language.key && record.success)
        .cloned()
        .collect::<Vec<_>>();

    let mut counts = RefreshCounts::default();
    for mut record in targets {
        counts.examined += 1;
        let latest = current
            .get(&record.doc_id)
            .map(String::as_str)
            .unwrap_or_default();
        let changed = latest != record.professional_translation;
        if !changed && !rescore_all {
            continue;
        }

        if changed {
            counts.changed += 1;
            if counts.changed > 1 {
                engine.pace_call();
            }
            if !engine.refresh_professional(&mut record, latest) {
                counts.back_translation_failures += 1;
            }
        }

        metrics.record(engine.score(&record));
        results.record(record);
        counts.rescored += 1;
    }

    if counts.back_translation_failures > 0 {
        warn!(
            language = language.key,
            failures = counts.back_translation_failures,
            "some professional back-translations failed; their metrics stay absent"
        );
    }

    metrics_ledger.commit(&metrics)?;
    results_ledger.commit(&results)?;

    info!(
        language = language.key,
        examined = counts.examined,
        changed = counts.changed,
        rescored = counts.rescored,
        "refresh complete"
    );
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::fs;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::time::Duration;

    use super::*;
    use crate::config::language_spec;
    use crate::engine::EngineSettings;
    use crate::scoring::ScorerRegistry;
    use crate::test_support::{ConstScorer, RecordingPacer, ScriptedTranslator, document};
    use crate::translate::RetryPolicy;

    fn settings() -> EngineSettings {
        EngineSettings {
            call_delay: Duration::ZERO,
            item_delay: Duration::ZERO,
            retry: RetryPolicy {
                max_attempts: 1,
                base_delay: Duration::ZERO,
                max_delay: Duration::ZERO,
            },
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn corpus_docs(count: usize) -> Vec<Document> {
        (0..count)
            .map(|index| {
                document(
                    &format!("cancer/topic_{index:02}"),
                    &format!("Patient leaflet number {index} explains the treatment."),
                    &[("spanish", "Folleto para pacientes sobre el tratamiento.")],
                )
            })
            .collect()
    }

    fn texts(records: &[EvaluationRecord]) -> Vec<(String, String, String, String, bool)> {
        records
            .iter()
            .map(|record| {
                (
                    record.key(),
                    record.llm_translation.clone(),
                    record.llm_back_translation.clone(),
                    record.professional_back_translation.clone(),
                    record.success,
                )
            })
            .collect()
    }

    #[test]
    fn interrupted_then_resumed_run_matches_uninterrupted_run() {
        let documents = corpus_docs(3);
        let models = strings(&["gpt-5.1", "kimi-k2"]);
        let languages = strings(&["spanish", "korean"]);
        let scorer = ScorerRegistry::native_only();
        let pacer = RecordingPacer::default();

        let full_dir = tempfile::tempdir().expect("tempdir");
        let full_store = RunStore::new(full_dir.path());
        let translator = ScriptedTranslator::new();
        let engine = Engine::new(&translator, &scorer, &pacer, settings());
        let full = run_batch(
            &engine,
            &full_store,
            &documents,
            &models,
            &languages,
            &BatchOptions::default(),
        )
        .expect("full run");
        assert_eq!(full.processed, 12);

        let split_dir = tempfile::tempdir().expect("tempdir");
        let split_store = RunStore::new(split_dir.path());
        let limited = BatchOptions {
            limit: Some(5),
            ..BatchOptions::default()
        };
        let first = run_batch(&engine, &split_store, &documents, &models, &languages, &limited)
            .expect("limited run");
        assert_eq!(first.processed, 5);
        assert_eq!(first.results_total, 5);

        let second = run_batch(
            &engine,
            &split_store,
            &documents,
            &models,
            &languages,
            &BatchOptions::default(),
        )
        .expect("resumed run");
        assert_eq!(second.skipped, 5);
        assert_eq!(second.processed, 7);

        let full_results = full_store.results_ledger().load(true).expect("full results");
        let split_results = split_store.results_ledger().load(true).expect("split results");
        assert_eq!(texts(full_results.records()), texts(split_results.records()));

        let full_metrics = full_store.metrics_ledger().load(true).expect("full metrics");
        let split_metrics = split_store.metrics_ledger().load(true).expect("split metrics");
        assert_eq!(full_metrics.records(), split_metrics.records());
        assert_eq!(full_metrics.checkpoint(), split_metrics.checkpoint());
    }

    #[test]
    fn crash_mid_run_keeps_committed_prefix_and_resume_completes() {
        let documents = (0..10)
            .map(|index| document(&format!("immunize/vis_{index}"), "Vaccine info.", &[]))
            .collect::<Vec<_>>();
        let models = strings(&["gpt-5.1"]);
        let languages = strings(&["tagalog"]);
        let scorer = ConstScorer::new(1.0);
        let pacer = RecordingPacer::default();
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RunStore::new(dir.path());
        let options = BatchOptions {
            checkpoint_interval: 3,
            ..BatchOptions::default()
        };

        // Two calls per item without a professional text: crash inside item 6.
        let crashing = ScriptedTranslator::panicking_after(10);
        let engine = Engine::new(&crashing, &scorer, &pacer, settings());
        let crashed = catch_unwind(AssertUnwindSafe(|| {
            run_batch(&engine, &store, &documents, &models, &languages, &options)
        }));
        assert!(crashed.is_err());

        let committed = store.results_ledger().load(true).expect("committed");
        assert_eq!(committed.records().len(), 3);
        assert_eq!(committed.checkpoint().len(), 3);

        let translator = ScriptedTranslator::new();
        let engine = Engine::new(&translator, &scorer, &pacer, settings());
        let resumed = run_batch(&engine, &store, &documents, &models, &languages, &options)
            .expect("resume");
        assert_eq!(resumed.skipped, 3);
        assert_eq!(resumed.processed, 7);
        assert_eq!(translator.calls(), 14);

        let results = store.results_ledger().load(true).expect("final");
        let keys = results
            .records()
            .iter()
            .map(EvaluationRecord::key)
            .collect::<HashSet<_>>();
        assert_eq!(results.records().len(), 10);
        assert_eq!(keys.len(), 10);
    }

    #[test]
    fn no_resume_starts_over_and_retry_failed_requeues_failures() {
        let documents = vec![
            document("cancer/a", "first leaflet", &[]),
            document("cancer/b", "second leaflet", &[]),
        ];
        let models = strings(&["gpt-5.1"]);
        let languages = strings(&["russian"]);
        let scorer = ConstScorer::new(1.0);
        let pacer = RecordingPacer::default();
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RunStore::new(dir.path());

        let flaky = ScriptedTranslator::failing_on("second");
        let engine = Engine::new(&flaky, &scorer, &pacer, settings());
        let first = run_batch(
            &engine,
            &store,
            &documents,
            &models,
            &languages,
            &BatchOptions::default(),
        )
        .expect("first");
        assert_eq!((first.succeeded, first.failed), (1, 1));

        let healthy = ScriptedTranslator::new();
        let engine = Engine::new(&healthy, &scorer, &pacer, settings());
        let plain_resume = run_batch(
            &engine,
            &store,
            &documents,
            &models,
            &languages,
            &BatchOptions::default(),
        )
        .expect("resume");
        assert_eq!(plain_resume.processed, 0);

        let retried = run_batch(
            &engine,
            &store,
            &documents,
            &models,
            &languages,
            &BatchOptions {
                retry_failed: true,
                ..BatchOptions::default()
            },
        )
        .expect("retry");
        assert_eq!(retried.processed, 1);
        assert_eq!(retried.succeeded, 1);

        let results = store.results_ledger().load(true).expect("results");
        assert!(results.records().iter().all(|record| record.success));
        let metrics = store.metrics_ledger().load(true).expect("metrics");
        assert_eq!(metrics.records().len(), 2);
        assert!(metrics.records().iter().all(|m| m.scores.backtrans_bleu == Some(1.0)));

        let fresh = run_batch(
            &engine,
            &store,
            &documents,
            &models,
            &languages,
            &BatchOptions {
                resume: false,
                ..BatchOptions::default()
            },
        )
        .expect("fresh");
        assert_eq!(fresh.processed, 2);
        assert_eq!(fresh.results_total, 2);
    }

    #[test]
    fn deferred_scoring_fills_metrics_for_existing_results() {
        let documents = corpus_docs(2);
        let models = strings(&["gemini-3-pro"]);
        let languages = strings(&["spanish"]);
        let scorer = ConstScorer::new(2.0);
        let pacer = RecordingPacer::default();
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RunStore::new(dir.path());

        let translator = ScriptedTranslator::new();
        let engine = Engine::new(&translator, &scorer, &pacer, settings());
        run_batch(
            &engine,
            &store,
            &documents,
            &models,
            &languages,
            &BatchOptions {
                score_inline: false,
                ..BatchOptions::default()
            },
        )
        .expect("translate only");
        assert!(!store.metrics_path().exists());

        let results = store.results_ledger().load(true).expect("results");
        let counts = run_scoring(&scorer, results.records(), &store.metrics_ledger(), true, 50)
            .expect("score");
        assert_eq!(counts.scored, 2);

        let again = run_scoring(&scorer, results.records(), &store.metrics_ledger(), true, 50)
            .expect("rescore");
        assert_eq!(again.scored, 0);
        assert_eq!(again.skipped, 2);

        let metrics = store.metrics_ledger().load(true).expect("metrics");
        assert_eq!(metrics.records()[0].scores.present_count(), 20);
    }

    #[test]
    fn deferred_retry_of_failed_item_is_rescored() {
        let documents = vec![
            document("cancer/a", "first leaflet", &[]),
            document("cancer/b", "second leaflet", &[]),
        ];
        let models = strings(&["gpt-5.1"]);
        let languages = strings(&["russian"]);
        let scorer = ConstScorer::new(4.0);
        let pacer = RecordingPacer::default();
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RunStore::new(dir.path());

        let flaky = ScriptedTranslator::failing_on("second");
        let engine = Engine::new(&flaky, &scorer, &pacer, settings());
        run_batch(
            &engine,
            &store,
            &documents,
            &models,
            &languages,
            &BatchOptions::default(),
        )
        .expect("inline run");

        let healthy = ScriptedTranslator::new();
        let engine = Engine::new(&healthy, &scorer, &pacer, settings());
        let retried = run_batch(
            &engine,
            &store,
            &documents,
            &models,
            &languages,
            &BatchOptions {
                retry_failed: true,
                score_inline: false,
                ..BatchOptions::default()
            },
        )
        .expect("deferred retry");
        assert_eq!(retried.succeeded, 1);

        let pending = store.metrics_ledger().load(true).expect("metrics");
        assert!(!pending.is_done("cancer/b|gpt-5.1|russian"));
        assert!(pending.is_done("cancer/a|gpt-5.1|russian"));

        let results = store.results_ledger().load(true).expect("results");
        let counts = run_scoring(&scorer, results.records(), &store.metrics_ledger(), true, 50)
            .expect("score");
        assert_eq!((counts.scored, counts.skipped), (1, 1));

        let metrics = store.metrics_ledger().load(true).expect("metrics");
        let retried_metrics = metrics
            .records()
            .iter()
            .find(|record| record.doc_id == "cancer/b")
            .expect("metrics for retried item");
        assert_eq!(retried_metrics.scores.backtrans_bleu, Some(4.0));
    }

    #[test]
    fn deferred_run_without_resume_discards_previous_metrics() {
        let documents = vec![document(
            "immunize/flu",
            "Flu vaccine facts.",
            &[("korean", "독감 백신 정보.")],
        )];
        let models = strings(&["kimi-k2"]);
        let languages = strings(&["korean"]);
        let scorer = ConstScorer::new(5.0);
        let pacer = RecordingPacer::default();
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RunStore::new(dir.path());

        let broken = ScriptedTranslator::always_failing();
        let engine = Engine::new(&broken, &scorer, &pacer, settings());
        run_batch(
            &engine,
            &store,
            &documents,
            &models,
            &languages,
            &BatchOptions::default(),
        )
        .expect("failing run");
        let failed_metrics = store.metrics_ledger().load(true).expect("metrics");
        assert!(failed_metrics.is_done("immunize/flu|kimi-k2|korean"));

        let healthy = ScriptedTranslator::new();
        let engine = Engine::new(&healthy, &scorer, &pacer, settings());
        run_batch(
            &engine,
            &store,
            &documents,
            &models,
            &languages,
            &BatchOptions {
                resume: false,
                score_inline: false,
                ..BatchOptions::default()
            },
        )
        .expect("fresh deferred run");

        let results = store.results_ledger().load(true).expect("results");
        assert!(results.records()[0].success);
        let counts = run_scoring(&scorer, results.records(), &store.metrics_ledger(), true, 50)
            .expect("score");
        assert_eq!((counts.scored, counts.skipped), (1, 0));

        let metrics = store.metrics_ledger().load(true).expect("metrics");
        assert_eq!(metrics.records()[0].scores.present_count(), 20);
    }

    #[test]
    fn refresh_supersedes_changed_professional_texts_in_place() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data = dir.path().join("data");
        let output = dir.path().join("output");
        fs::create_dir_all(data.join("cancer/english")).expect("mkdir");
        fs::create_dir_all(data.join("cancer/arabic")).expect("mkdir");
        fs::write(data.join("cancer/english/skin.txt"), "Skin cancer facts.").expect("write");
        fs::write(data.join("cancer/english/lung.txt"), "Lung cancer facts.").expect("write");
        fs::write(data.join("cancer/arabic/skin.txt"), "garbled extraction").expect("write");
        fs::write(data.join("cancer/arabic/lung.txt"), "lung arabic").expect("write");

        let corpus = Corpus::new(&data);
        let documents = corpus.load_all().expect("corpus");
        let store = RunStore::new(&output);
        let scorer = ConstScorer::new(3.0);
        let pacer = RecordingPacer::default();
        let translator = ScriptedTranslator::new();
        let engine = Engine::new(&translator, &scorer, &pacer, settings());
        let models = strings(&["gpt-5.1", "kimi-k2"]);
        let languages = strings(&["arabic"]);
        run_batch(
            &engine,
            &store,
            &documents,
            &models,
            &languages,
            &BatchOptions::default(),
        )
        .expect("run");

        fs::write(data.join("cancer/arabic/skin.txt"), "clean extraction").expect("rewrite");

        let arabic = language_spec("arabic").expect("arabic");
        let counts = refresh_language(&engine, &store, &corpus, arabic, false).expect("refresh");
        assert_eq!(counts.examined, 4);
        assert_eq!(counts.changed, 2);
        assert_eq!(counts.rescored, 2);

        let results = store.results_ledger().load(true).expect("results");
        assert_eq!(results.records().len(), 4);
        let skin_kimi = results.get("cancer/skin|kimi-k2|arabic").expect("record");
        assert_eq!(skin_kimi.professional_translation, "clean extraction");
        assert_eq!(
            skin_kimi.professional_back_translation,
            "[english|kimi-k2] clean extraction"
        );
        let lung = results.get("cancer/lung|gpt-5.1|arabic").expect("record");
        assert_eq!(lung.professional_translation, "lung arabic");

        let metrics = store.metrics_ledger().load(true).expect("metrics");
        assert_eq!(metrics.records().len(), 4);
    }

    #[test]
    fn run_batch_rejects_checkpoint_without_results() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RunStore::new(dir.path());
        fs::create_dir_all(dir.path().join("results")).expect("mkdir");
        fs::write(
            store.results_checkpoint_path(),
            "{\"completed\": [\"cancer/a|gpt-5.1|russian\"]}",
        )
        .expect("write");

        let scorer = ConstScorer::new(1.0);
        let pacer = RecordingPacer::default();
        let translator = ScriptedTranslator::new();
        let engine = Engine::new(&translator, &scorer, &pacer, settings());
        let err = run_batch(
            &engine,
            &store,
            &[document("cancer/a", "text", &[])],
            &strings(&["gpt-5.1"]),
            &strings(&["russian"]),
            &BatchOptions::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("no saved record"), "{err}");
        assert_eq!(translator.calls(), 0);
    }
}
