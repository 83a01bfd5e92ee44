//! Item description generation: a remote text-generation endpoint when one is
//! configured, a templated sentence otherwise.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::config::TextgenConfig;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_TOKENS: u32 = 120;
const TEMPERATURE: f32 = 0.2;
const TONE: &str = "friendly, concise";

static SHARED: OnceCell<DescriptionGenerator> = OnceCell::const_new();

#[derive(Debug, Error)]
pub enum TextgenError {
    /// The generator could not be set up at all.
    #[error("{0}")]
    NotConfigured(String),

    #[error("{0}")]
    Generation(String),
}

impl From<reqwest::Error> for TextgenError {
    fn from(err: reqwest::Error) -> Self {
        TextgenError::Generation(err.to_string())
    }
}

#[derive(Debug, Clone)]
enum Backend {
    Fallback,
    Remote {
        client: reqwest::Client,
        url: String,
        model: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct DescriptionGenerator {
    backend: Backend,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

/// The process-wide generator, built from `config` on first use and reused
/// afterwards.
pub async fn shared(config: &TextgenConfig) -> Result<&'static DescriptionGenerator, TextgenError> {
    SHARED
        .get_or_try_init(|| async { DescriptionGenerator::from_config(config) })
        .await
}

impl DescriptionGenerator {
    pub fn fallback() -> Self {
        Self {
            backend: Backend::Fallback,
        }
    }

    pub fn from_config(config: &TextgenConfig) -> Result<Self, TextgenError> {
        let (Some(url), Some(key)) = (&config.api_url, &config.api_key) else {
            tracing::info!("text generation endpoint not set, using templated descriptions");
            return Ok(Self::fallback());
        };

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", key.expose_secret()))
            .map_err(|e| TextgenError::NotConfigured(format!("invalid API key: {e}")))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|e| TextgenError::NotConfigured(e.to_string()))?;

        Ok(Self {
            backend: Backend::Remote {
                client,
                url: url.clone(),
                model: config.model.clone(),
            },
        })
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.backend, Backend::Remote { .. })
    }

    pub async fn generate(&self, title: &str, price: Option<f64>) -> Result<String, TextgenError> {
        match &self.backend {
            Backend::Fallback => Ok(fallback_description(title, price)),
            Backend::Remote { client, url, model } => {
                let prompt = build_prompt(title, price);
                let payload = CompletionRequest {
                    model: model.as_deref(),
                    prompt: &prompt,
                    max_tokens: MAX_TOKENS,
                    temperature: TEMPERATURE,
                };

                let resp = client
                    .post(url)
                    .json(&payload)
                    .send()
                    .await?
                    .error_for_status()?;
                let body = resp.text().await?;

                let text = match serde_json::from_str::<Value>(&body) {
                    Ok(json) => extract_text(&json),
                    Err(_) => body.trim().to_string(),
                };
                tracing::debug!(chars = text.len(), "generated description");
                Ok(text)
            }
        }
    }
}

pub fn fallback_description(title: &str, price: Option<f64>) -> String {
    let mut desc = format!("A high-quality {}.", title.to_lowercase());
    match price {
        Some(price) => desc.push_str(&format!(" Great value at ${price:.2}.")),
        None => desc.push_str(" Excellent product."),
    }
    desc
}

pub fn build_prompt(title: &str, price: Option<f64>) -> String {
    let mut lines = vec![format!(
        "Write a short, {TONE} product description for the item titled: \"{title}\"."
    )];
    if let Some(price) = price {
        lines.push(format!("The price is ${price:.2}."));
    }
    lines.push("Keep it to 1-3 sentences, suitable for an item listing.".to_string());
    lines.join("\n")
}

/// Pull the generated text out of the common completion response shapes.
pub fn extract_text(json: &Value) -> String {
    for key in ["text", "completion", "output", "result"] {
        match json.get(key) {
            Some(Value::String(s)) => return s.trim().to_string(),
            Some(Value::Object(obj)) => {
                if let Some(Value::String(s)) = obj.get("text") {
                    return s.trim().to_string();
                }
            }
            _ => {}
        }
    }

    if let Some(choice) = json
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
    {
        if let Some(content) = choice
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
        {
            return content.trim().to_string();
        }
        for key in ["text", "content"] {
            if let Some(s) = choice.get(key).and_then(Value::as_str) {
                return s.trim().to_string();
            }
        }
    }

    if let Some(s) = json.get("output_text").and_then(Value::as_str) {
        return s.trim().to_string();
    }

    json.to_string()
}
