use std::time::Duration;

use anyhow::{Result, bail};

pub const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";
pub const API_BASE_ENV: &str = "MEDBT_API_BASE";
pub const API_KEY_ENVS: [&str; 2] = ["MEDBT_API_KEY", "OPENROUTER_API_KEY"];
pub const API_TIMEOUT_ENV: &str = "MEDBT_API_TIMEOUT_SECS";
const DEFAULT_API_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec {
    pub key: &'static str,
    pub provider_id: &'static str,
    pub display_name: &'static str,
}

pub const MODELS: &[ModelSpec] = &[
    ModelSpec {
        key: "gpt-5.1",
        provider_id: "openai/gpt-5.1",
        display_name: "GPT-5.1",
    },
    ModelSpec {
        key: "claude-opus-4.5",
        provider_id: "anthropic/claude-opus-4.5",
        display_name: "Claude Opus 4.5",
    },
    ModelSpec {
        key: "gemini-3-pro",
        provider_id: "google/gemini-3-pro-preview",
        display_name: "Gemini 3 Pro",
    },
    ModelSpec {
        key: "kimi-k2",
        provider_id: "moonshotai/kimi-k2",
        display_name: "Kimi K2",
    },
];

/// A target language and where its professional translations live on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageSpec {
    pub key: &'static str,
    pub name: &'static str,
    pub folder: &'static str,
    pub file_prefix: &'static str,
}

pub const LANGUAGES: &[LanguageSpec] = &[
    LanguageSpec {
        key: "spanish",
        name: "Spanish",
        folder: "spanish",
        file_prefix: "spanish",
    },
    LanguageSpec {
        key: "chinese_simplified",
        name: "Chinese (Simplified)",
        folder: "chinese",
        file_prefix: "chinese_simplified",
    },
    LanguageSpec {
        key: "vietnamese",
        name: "Vietnamese",
        folder: "vietnamese",
        file_prefix: "vietnamese",
    },
    LanguageSpec {
        key: "russian",
        name: "Russian",
        folder: "russian",
        file_prefix: "russian",
    },
    LanguageSpec {
        key: "arabic",
        name: "Arabic",
        folder: "arabic",
        file_prefix: "arabic",
    },
    LanguageSpec {
        key: "korean",
        name: "Korean",
        folder: "korean",
        file_prefix: "korean",
    },
    LanguageSpec {
        key: "tagalog",
        name: "Tagalog",
        folder: "tagalog",
        file_prefix: "tagalog",
    },
    LanguageSpec {
        key: "haitian_creole",
        name: "Haitian Creole",
        folder: "haitian_creole",
        file_prefix: "haitian_creole",
    },
];

/// English topic stems whose translated files use a shorter name.
pub const TOPIC_VARIATIONS: &[(&str, &str)] = &[("meningococcal_acwy", "meningococcal")];

pub fn model_spec(key: &str) -> Option<&'static ModelSpec> {
    MODELS.iter().find(|spec| spec.key == key)
}

pub fn language_spec(key: &str) -> Option<&'static LanguageSpec> {
    LANGUAGES.iter().find(|spec| spec.key == key)
}

pub fn language_name(key: &str) -> &str {
    language_spec(key).map(|spec| spec.name).unwrap_or(key)
}

pub fn topic_variation(topic: &str) -> &str {
    TOPIC_VARIATIONS
        .iter()
        .find(|(english, _)| *english == topic)
        .map(|(_, translated)| *translated)
        .unwrap_or(topic)
}

/// Validates requested model keys, keeping catalog order when none are given
/// and request order (deduplicated) otherwise.
pub fn resolve_models(requested: &[String]) -> Result<Vec<String>> {
    if requested.is_empty() {
        return Ok(MODELS.iter().map(|spec| spec.key.to_string()).collect());
    }

    let mut resolved = Vec::<String>::with_capacity(requested.len());
    for key in requested {
        if model_spec(key).is_none() {
            let known = MODELS.iter().map(|spec| spec.key).collect::<Vec<_>>();
            bail!("unknown model '{key}' (known: {})", known.join(", "));
        }
        if !resolved.contains(key) {
            resolved.push(key.clone());
        }
    }
    Ok(resolved)
}

pub fn resolve_languages(requested: &[String]) -> Result<Vec<String>> {
    if requested.is_empty() {
        return Ok(LANGUAGES.iter().map(|spec| spec.key.to_string()).collect());
    }

    let mut resolved = Vec::<String>::with_capacity(requested.len());
    for key in requested {
        if language_spec(key).is_none() {
            let known = LANGUAGES.iter().map(|spec| spec.key).collect::<Vec<_>>();
            bail!("unknown language '{key}' (known: {})", known.join(", "));
        }
        if !resolved.contains(key) {
            resolved.push(key.clone());
        }
    }
    Ok(resolved)
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl ApiSettings {
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var(API_BASE_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let Some(api_key) = API_KEY_ENVS
            .iter()
            .find_map(|name| std::env::var(name).ok())
            .filter(|value| !value.trim().is_empty())
        else {
            bail!(
                "no API key configured; set {} or {}",
                API_KEY_ENVS[0],
                API_KEY_ENVS[1]
            );
        };

        let timeout_secs = match std::env::var(API_TIMEOUT_ENV) {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(value) if value > 0 => value,
                _ => bail!("{API_TIMEOUT_ENV} must be a positive integer, got '{raw}'"),
            },
            Err(_) => DEFAULT_API_TIMEOUT_SECS,
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}
