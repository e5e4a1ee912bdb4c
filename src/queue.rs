//! Work item enumeration and resumable progress tracking.
//!
//! A ledger pairs a records file with a checkpoint file. Commits always
//! write the records first and the checkpoint second, so every checkpoint
//! key has a persisted record behind it.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::model::{Document, EvaluationRecord, MetricsRecord, item_key};
use crate::util::{read_json_array_or_empty, write_atomic, write_json_pretty};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    pub document_id: String,
    pub model: String,
    pub language: String,
}

impl WorkItem {
    pub fn new(document_id: &str, model: &str, language: &str) -> Self {
        Self {
            document_id: document_id.to_string(),
            model: model.to_string(),
            language: language.to_string(),
        }
    }

    pub fn key(&self) -> String {
        item_key(&self.document_id, &self.model, &self.language)
    }
}

/// Documents outermost, then models, then languages, each in the order given.
pub fn enumerate(documents: &[Document], models: &[String], languages: &[String]) -> Vec<WorkItem> {
    let mut seen = HashSet::<String>::new();
    let mut items = Vec::with_capacity(documents.len() * models.len() * languages.len());

    for document in documents {
        for model in models {
            for language in languages {
                let item = WorkItem::new(&document.doc_id, model, language);
                if seen.insert(item.key()) {
                    items.push(item);
                }
            }
        }
    }

    items
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint {path} is malformed; refusing to discard recorded progress")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to access checkpoint {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "checkpoint {path} lists {missing} completed item(s) with no saved record (first: {first})"
    )]
    Diverged {
        path: PathBuf,
        missing: usize,
        first: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub completed: BTreeSet<String>,
}

impl Checkpoint {
    pub fn load(path: &Path) -> Result<Self, CheckpointError> {
        let raw = match std::fs::read(path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(CheckpointError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_slice(&raw).map_err(|source| CheckpointError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), CheckpointError> {
        let mut data = serde_json::to_vec_pretty(self).map_err(|source| {
            CheckpointError::Corrupt {
                path: path.to_path_buf(),
                source,
            }
        })?;
        data.push(b'\n');

        write_atomic(path, &data).map_err(|source| CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn is_done(&self, key: &str) -> bool {
        self.completed.contains(key)
    }

    pub fn record_done(&mut self, key: String) {
        self.completed.insert(key);
    }

    pub fn len(&self) -> usize {
        self.completed.len()
    }
}

pub trait Keyed {
    fn key(&self) -> String;
}

impl Keyed for EvaluationRecord {
    fn key(&self) -> String {
        EvaluationRecord::key(self)
    }
}

impl Keyed for MetricsRecord {
    fn key(&self) -> String {
        MetricsRecord::key(self)
    }
}

/// In-memory view of one ledger: records in commit order plus the set of
/// keys that are considered complete.
#[derive(Debug, Clone)]
pub struct LedgerState<T> {
    records: Vec<T>,
    index: HashMap<String, usize>,
    checkpoint: Checkpoint,
}

impl<T: Keyed> Default for LedgerState<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            index: HashMap::new(),
            checkpoint: Checkpoint::default(),
        }
    }
}

impl<T: Keyed> LedgerState<T> {
    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    pub fn is_done(&self, key: &str) -> bool {
        self.checkpoint.is_done(key)
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|position| &self.records[*position])
    }

    /// Appends a record, or supersedes the existing record with the same key,
    /// and marks the key done.
    pub fn record(&mut self, record: T) {
        let key = record.key();
        match self.index.get(&key) {
            Some(position) => self.records[*position] = record,
            None => {
                self.index.insert(key.clone(), self.records.len());
                self.records.push(record);
            }
        }
        self.checkpoint.record_done(key);
    }

    /// Removes every record matching `predicate` along with its key and
    /// returns the removed keys.
    pub fn forget_where(&mut self, mut predicate: impl FnMut(&T) -> bool) -> Vec<String> {
        let mut forgotten = Vec::new();
        let mut kept = Vec::with_capacity(self.records.len());
        for record in self.records.drain(..) {
            if predicate(&record) {
                forgotten.push(record.key());
            } else {
                kept.push(record);
            }
        }
        for key in &forgotten {
            self.checkpoint.completed.remove(key);
        }
        self.records = kept;
        self.reindex();
        forgotten
    }

    fn reindex(&mut self) {
        self.index = self
            .records
            .iter()
            .enumerate()
            .map(|(position, record)| (record.key(), position))
            .collect();
    }

    fn from_parts(raw_records: Vec<T>, checkpoint: Checkpoint) -> (Self, usize) {
        let mut state = Self {
            records: Vec::with_capacity(raw_records.len()),
            index: HashMap::new(),
            checkpoint: Checkpoint::default(),
        };

        let mut dropped = 0usize;
        for record in raw_records {
            if checkpoint.is_done(&record.key()) {
                state.record(record);
            } else {
                dropped += 1;
            }
        }
        state.checkpoint = checkpoint;
        (state, dropped)
    }
}

pub struct Ledger<T> {
    records_path: PathBuf,
    checkpoint_path: PathBuf,
    _records: PhantomData<T>,
}

impl<T> Ledger<T>
where
    T: Keyed + Serialize + DeserializeOwned,
{
    pub fn new(records_path: PathBuf, checkpoint_path: PathBuf) -> Self {
        Self {
            records_path,
            checkpoint_path,
            _records: PhantomData,
        }
    }

    pub fn records_path(&self) -> &Path {
        &self.records_path
    }

    /// Loads committed progress. With `resume == false` the previous files
    /// are ignored and overwritten on the first commit.
    pub fn load(&self, resume: bool) -> Result<LedgerState<T>> {
        if !resume {
            return Ok(LedgerState::default());
        }

        let checkpoint = Checkpoint::load(&self.checkpoint_path)?;
        let raw_records = read_json_array_or_empty::<T>(&self.records_path)?;
        let raw_count = raw_records.len();
        let (state, dropped) = LedgerState::from_parts(raw_records, checkpoint);

        if dropped > 0 {
            warn!(
                path = %self.records_path.display(),
                dropped,
                "discarding records that were saved without a checkpoint entry"
            );
        }

        let missing = state
            .checkpoint
            .completed
            .iter()
            .filter(|key| !state.index.contains_key(*key))
            .collect::<Vec<_>>();
        if let Some(first) = missing.first() {
            return Err(CheckpointError::Diverged {
                path: self.checkpoint_path.clone(),
                missing: missing.len(),
                first: (*first).clone(),
            }
            .into());
        }

        info!(
            path = %self.checkpoint_path.display(),
            completed = state.checkpoint.len(),
            records = raw_count,
            "resuming from checkpoint"
        );

        Ok(state)
    }

    pub fn commit(&self, state: &LedgerState<T>) -> Result<()> {
        write_json_pretty(&self.records_path, &state.records)?;
        state
            .checkpoint
            .save(&self.checkpoint_path)
            .with_context(|| format!("failed to commit {}", self.checkpoint_path.display()))?;
        Ok(())
    }
}
