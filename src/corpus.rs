use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::{LANGUAGES, LanguageSpec, topic_variation};
use crate::model::{Category, CorpusEntry, Document};
use crate::util::sha256_text;

/// Extracted-text tree laid out as `<root>/<category>/<language folder>/*.txt`.
pub struct Corpus {
    root: PathBuf,
}

impl Corpus {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn load_all(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();

        for category in Category::ALL {
            let english_dir = self.root.join(category.as_str()).join("english");
            if !english_dir.is_dir() {
                warn!(path = %english_dir.display(), "english directory not found");
                continue;
            }

            for english_path in list_text_files(&english_dir)? {
                let Some(topic) = english_path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
                else {
                    continue;
                };
                let doc_id = format!("{}/{}", category.as_str(), topic);

                let english_text = read_text(&english_path)?;
                if english_text.trim().is_empty() {
                    warn!(doc_id = %doc_id, "skipping document with empty english text");
                    continue;
                }

                let mut professional_translations = BTreeMap::new();
                for language in LANGUAGES {
                    match self.professional_path(category, &topic, language) {
                        Some(path) => {
                            let text = read_text(&path)?;
                            if text.trim().is_empty() {
                                debug!(doc_id = %doc_id, language = language.key, "professional translation is empty");
                                continue;
                            }
                            professional_translations.insert(language.key.to_string(), text);
                        }
                        None => {
                            debug!(doc_id = %doc_id, language = language.key, "no professional translation");
                        }
                    }
                }

                info!(
                    doc_id = %doc_id,
                    translations = professional_translations.len(),
                    "loaded document"
                );
                documents.push(Document {
                    doc_id,
                    category,
                    topic,
                    english_text,
                    professional_translations,
                });
            }
        }

        info!(documents = documents.len(), root = %self.root.display(), "corpus loaded");
        Ok(documents)
    }

    /// Current professional texts of one language, keyed by doc id.
    pub fn load_professional_translations(
        &self,
        language: &LanguageSpec,
    ) -> Result<BTreeMap<String, String>> {
        let mut translations = BTreeMap::new();

        for category in Category::ALL {
            let english_dir = self.root.join(category.as_str()).join("english");
            if !english_dir.is_dir() {
                continue;
            }
            for english_path in list_text_files(&english_dir)? {
                let Some(topic) = english_path.file_stem().and_then(|stem| stem.to_str()) else {
                    continue;
                };
                let Some(path) = self.professional_path(category, topic, language) else {
                    continue;
                };
                let text = read_text(&path)?;
                if !text.trim().is_empty() {
                    translations.insert(format!("{}/{}", category.as_str(), topic), text);
                }
            }
        }

        Ok(translations)
    }

    /// First existing file among the naming conventions used by the source
    /// material.
    pub fn professional_path(
        &self,
        category: Category,
        topic: &str,
        language: &LanguageSpec,
    ) -> Option<PathBuf> {
        let dir = self.root.join(category.as_str()).join(language.folder);
        candidate_names(topic, language)
            .into_iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }
}

pub fn candidate_names(topic: &str, language: &LanguageSpec) -> Vec<String> {
    let variant = topic_variation(topic);
    let prefix = language.file_prefix;
    let folder = language.folder;

    let mut names = Vec::with_capacity(6);
    for name in [
        format!("{prefix}_{variant}.txt"),
        format!("{prefix}_{topic}.txt"),
        format!("{folder}_{variant}.txt"),
        format!("{folder}_{topic}.txt"),
        format!("{variant}.txt"),
        format!("{topic}.txt"),
    ] {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

pub fn fingerprint(documents: &[Document]) -> Vec<CorpusEntry> {
    documents
        .iter()
        .map(|document| {
            let mut material = document.english_text.clone();
            for (language, text) in &document.professional_translations {
                material.push('\u{0}');
                material.push_str(language);
                material.push('\u{0}');
                material.push_str(text);
            }
            CorpusEntry {
                doc_id: document.doc_id.clone(),
                sha256: sha256_text(&material),
                professional_languages: document.professional_translations.keys().cloned().collect(),
            }
        })
        .collect()
}

fn list_text_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();
        let is_txt = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
        if is_txt && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
