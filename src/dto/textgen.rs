use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

/// Body of `POST /generate-description`, accepted as JSON or as a form.
#[derive(Debug, Default, Clone, PartialEq, ToSchema)]
pub struct GenerateRequest {
    pub title: String,
    pub price: Option<f64>,
}

impl GenerateRequest {
    pub fn from_json(body: &Value) -> Self {
        let title = body
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();
        let price = body.get("price").and_then(price_from_value);
        Self { title, price }
    }

    pub fn from_form(form: &HashMap<String, String>) -> Self {
        let title = form
            .get("title")
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        let price = form.get("price").and_then(|p| parse_price(p));
        Self { title, price }
    }
}

/// Numbers and numeric strings are prices; anything else is treated as absent.
fn price_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|p| p.is_finite()),
        Value::String(s) => parse_price(s),
        _ => None,
    }
}

fn parse_price(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok().filter(|p| p.is_finite())
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GenerateResponse {
    pub description: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GenerateError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
