use async_trait::async_trait;

use super::TextGenerator;
use crate::error::GenerateError;

const ENGINE: &str = "openai";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

pub fn responses_endpoint(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/responses")
}

/// OpenAI Responses API backend.
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    pub client: reqwest::Client,
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub instructions: String,
    pub temperature: f32,
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let mut body = serde_json::json!({
            "model": self.model,
            "instructions": self.instructions,
            "input": prompt,
            "text": { "format": { "type": "text" } },
            "store": false,
        });

        // NOTE: GPT-5 models reject sampling params like `temperature`.
        if !self.model.starts_with("gpt-5")
            && let Some(obj) = body.as_object_mut()
        {
            obj.insert("temperature".to_owned(), serde_json::json!(self.temperature));
        }

        tracing::info!(engine = ENGINE, model = %self.model, prompt_chars = prompt.len(), "generate recap");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| request_error(&self.endpoint, err))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|err| request_error(&self.endpoint, err))?;
        if !status.is_success() {
            let message = parse_error_message(&raw).unwrap_or_else(|| raw.clone());
            return Err(GenerateError::Api {
                engine: ENGINE,
                status: status.as_u16(),
                message,
            });
        }

        let value: serde_json::Value =
            serde_json::from_str(&raw).map_err(|err| GenerateError::Request {
                engine: ENGINE,
                message: format!("parse response: {err}"),
            })?;
        extract_output_text(&value)
    }
}

fn request_error(endpoint: &str, err: reqwest::Error) -> GenerateError {
    GenerateError::Request {
        engine: ENGINE,
        message: format!("POST {endpoint}: {err}"),
    }
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.to_owned();
    Some(message)
}

fn extract_output_text(value: &serde_json::Value) -> Result<String, GenerateError> {
    let output = value
        .get("output")
        .and_then(|v| v.as_array())
        .ok_or_else(|| GenerateError::Request {
            engine: ENGINE,
            message: "missing `output` array in response".to_owned(),
        })?;

    let mut text = String::new();
    for item in output {
        if item.get("type").and_then(|v| v.as_str()) != Some("message") {
            continue;
        }
        let Some(content) = item.get("content").and_then(|v| v.as_array()) else {
            continue;
        };
        for part in content {
            if part.get("type").and_then(|v| v.as_str()) != Some("output_text") {
                continue;
            }
            if let Some(part_text) = part.get("text").and_then(|v| v.as_str()) {
                text.push_str(part_text);
            }
        }
    }

    if text.trim().is_empty() {
        return Err(GenerateError::EmptyOutput { engine: ENGINE });
    }
    Ok(text)
}
