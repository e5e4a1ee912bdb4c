use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::corpus::{Corpus, fingerprint};
use crate::model::{CorpusEntry, RunManifest};
use crate::pipeline::RunStore;
use crate::util::read_json;

pub fn run(args: StatusArgs) -> Result<()> {
    let store = RunStore::new(&args.paths.output_root);
    info!(output_root = %args.paths.output_root.display(), "status requested");

    match store.results_ledger().load(true) {
        Ok(results) => {
            let failed = results
                .records()
                .iter()
                .filter(|record| !record.success)
                .count();
            info!(
                path = %store.results_path().display(),
                records = results.records().len(),
                completed = results.checkpoint().len(),
                failed,
                "results ledger"
            );
        }
        Err(err) => warn!(error = %err, "results ledger unreadable"),
    }

    match store.metrics_ledger().load(true) {
        Ok(metrics) => info!(
            path = %store.metrics_path().display(),
            records = metrics.records().len(),
            completed = metrics.checkpoint().len(),
            "metrics ledger"
        ),
        Err(err) => warn!(error = %err, "metrics ledger unreadable"),
    }

    let Some((manifest_path, manifest)) = latest_manifest(&store.manifests_dir())? else {
        warn!(path = %store.manifests_dir().display(), "no run manifests found");
        return Ok(());
    };

    info!(
        path = %manifest_path.display(),
        run_id = %manifest.run_id,
        status = %manifest.status,
        started_at = %manifest.started_at,
        updated_at = %manifest.updated_at,
        models = %manifest.models.join(","),
        languages = %manifest.languages.join(","),
        processed = manifest.counts.processed,
        succeeded = manifest.counts.succeeded,
        failed = manifest.counts.failed,
        "latest run manifest"
    );
    for warning in &manifest.warnings {
        warn!(warning = %warning, "recorded run warning");
    }

    if args.paths.data_root.exists() {
        let documents = Corpus::new(&args.paths.data_root).load_all()?;
        let drift = fingerprint_drift(&manifest.corpus, &fingerprint(&documents));
        if drift.is_empty() {
            info!(documents = documents.len(), "corpus unchanged since latest run");
        }
        for change in drift {
            warn!(drift = %change, "corpus changed since latest run");
        }
    } else {
        warn!(path = %args.paths.data_root.display(), "data root missing; skipping drift check");
    }

    Ok(())
}

/// Newest `run_*.json` manifest in `dir`. Names embed a compact UTC timestamp,
/// so lexical order is chronological.
pub(crate) fn latest_manifest(dir: &Path) -> Result<Option<(PathBuf, RunManifest)>> {
    if !dir.exists() {
        return Ok(None);
    }

    let mut newest: Option<PathBuf> = None;
    for entry in fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))? {
        let path = entry
            .with_context(|| format!("failed to list {}", dir.display()))?
            .path();
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !name.starts_with("run_") || !name.ends_with(".json") {
            continue;
        }
        if newest.as_ref().is_none_or(|current| path > *current) {
            newest = Some(path);
        }
    }

    match newest {
        Some(path) => {
            let manifest = read_json(&path)?;
            Ok(Some((path, manifest)))
        }
        None => Ok(None),
    }
}

pub(crate) fn fingerprint_drift(previous: &[CorpusEntry], current: &[CorpusEntry]) -> Vec<String> {
    let before = previous
        .iter()
        .map(|entry| (entry.doc_id.as_str(), entry))
        .collect::<BTreeMap<_, _>>();
    let after = current
        .iter()
        .map(|entry| (entry.doc_id.as_str(), entry))
        .collect::<BTreeMap<_, _>>();

    let mut drift = Vec::new();
    for (doc_id, entry) in &after {
        match before.get(doc_id) {
            None => drift.push(format!("{doc_id}: added")),
            Some(old) if old.sha256 != entry.sha256 => {
                drift.push(format!("{doc_id}: content changed"))
            }
            Some(_) => {}
        }
    }
    for doc_id in before.keys() {
        if !after.contains_key(doc_id) {
            drift.push(format!("{doc_id}: removed"));
        }
    }
    drift
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunCounts;
    use crate::util::write_json_pretty;

    fn entry(doc_id: &str, sha256: &str) -> CorpusEntry {
        CorpusEntry {
            doc_id: doc_id.to_string(),
            sha256: sha256.to_string(),
            professional_languages: vec!["spanish".to_string()],
        }
    }

    fn manifest(run_id: &str) -> RunManifest {
        RunManifest {
            manifest_version: 1,
            run_id: run_id.to_string(),
            status: "completed".to_string(),
            started_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
            command: "run".to_string(),
            models: vec!["gpt-5.1".to_string()],
            languages: vec!["spanish".to_string()],
            checkpoint_interval: 5,
            scored_inline: true,
            counts: RunCounts::default(),
            corpus: vec![entry("cancer/skin", "aa")],
            warnings: Vec::new(),
        }
    }

    #[test]
    fn drift_reports_added_changed_and_removed_documents() {
        let previous = vec![entry("cancer/skin", "aa"), entry("immunize/flu", "bb"), entry("immunize/hpv", "cc")];
        let current = vec![entry("cancer/skin", "aa"), entry("immunize/flu", "b2"), entry("immunize/mmr", "dd")];

        let drift = fingerprint_drift(&previous, &current);
        assert_eq!(
            drift,
            vec![
                "immunize/flu: content changed".to_string(),
                "immunize/mmr: added".to_string(),
                "immunize/hpv: removed".to_string(),
            ]
        );
        assert!(fingerprint_drift(&previous, &previous).is_empty());
    }

    #[test]
    fn latest_manifest_picks_newest_run_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_json_pretty(&dir.path().join("run_20260101T000000Z.json"), &manifest("old"))
            .expect("write old");
        write_json_pretty(&dir.path().join("run_20260301T000000Z.json"), &manifest("new"))
            .expect("write new");
        fs::write(dir.path().join("notes.json"), "{}").expect("write unrelated");

        let (path, found) = latest_manifest(dir.path())
            .expect("scan")
            .expect("manifest present");
        assert_eq!(found.run_id, "new");
        assert!(path.ends_with("run_20260301T000000Z.json"));
    }

    #[test]
    fn latest_manifest_is_none_for_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(
            latest_manifest(&dir.path().join("manifests"))
                .expect("scan")
                .is_none()
        );
    }
}
