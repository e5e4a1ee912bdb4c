use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::RETRY_AFTER;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{TranslationError, TranslationRequest, Translator};
use crate::config::{ApiSettings, language_name, model_spec};
use crate::util::excerpt;

const ERROR_BODY_CHARS: usize = 300;

/// Translator backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatTranslator {
    client: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatTranslator {
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("medbt/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: settings.chat_completions_url(),
            api_key: settings.api_key.clone(),
        })
    }

    fn send(&self, request: &TranslationRequest) -> Result<Response, TranslationError> {
        // Model keys that are not in the catalog are passed through verbatim.
        let provider_model = model_spec(&request.model)
            .map(|spec| spec.provider_id)
            .unwrap_or(request.model.as_str());

        let body = ChatRequest {
            model: provider_model,
            messages: build_messages(request),
            temperature: 0.0,
        };

        self.client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|err| TranslationError::Transport(err.to_string()))
    }
}

impl Translator for ChatTranslator {
    fn translate(&self, request: &TranslationRequest) -> Result<String, TranslationError> {
        let response = self.send(request)?;
        let status = response.status();

        if !status.is_success() {
            let retry_after = parse_retry_after(&response);
            let body = response.text().unwrap_or_default();
            return Err(classify_status(status, retry_after, &body));
        }

        let raw = response
            .text()
            .map_err(|err| TranslationError::Transport(err.to_string()))?;
        let text = extract_completion(&raw)?;

        debug!(
            model = %request.model,
            back = request.is_back_translation,
            chars = text.chars().count(),
            "translation call completed"
        );
        Ok(text)
    }
}

fn parse_retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn classify_status(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> TranslationError {
    let body = excerpt(body.trim(), ERROR_BODY_CHARS);
    if status == StatusCode::TOO_MANY_REQUESTS {
        TranslationError::RateLimited { retry_after }
    } else if status.is_server_error() {
        TranslationError::Server {
            status: status.as_u16(),
            body,
        }
    } else {
        TranslationError::Rejected {
            status: status.as_u16(),
            body,
        }
    }
}

fn extract_completion(raw: &str) -> Result<String, TranslationError> {
    let parsed: ChatResponse =
        serde_json::from_str(raw).map_err(|err| TranslationError::Malformed(err.to_string()))?;

    let Some(choice) = parsed.choices.into_iter().next() else {
        return Err(TranslationError::Malformed(
            "response contained no choices".to_string(),
        ));
    };

    let text = choice.message.content.unwrap_or_default().trim().to_string();
    if text.is_empty() {
        return Err(TranslationError::EmptyResponse);
    }
    Ok(text)
}

fn display_language(key: &str) -> &str {
    if key.eq_ignore_ascii_case("english") {
        "English"
    } else {
        language_name(key)
    }
}

fn build_messages(request: &TranslationRequest) -> Vec<ChatMessage> {
    let target = display_language(&request.target_language);
    let source = request
        .source_language
        .as_deref()
        .map(display_language)
        .unwrap_or("English");

    let system = format!(
        "You are a professional medical translator. Translate patient education material \
         from {source} into {target}. Preserve medical terminology, dosages, numbers and \
         the document's structure. Return only the translation with no commentary."
    );

    vec![
        ChatMessage {
            role: "system",
            content: system,
        },
        ChatMessage {
            role: "user",
            content: request.text.clone(),
        },
    ]
}
