use async_trait::async_trait;

use super::TextGenerator;
use crate::error::GenerateError;

const ENGINE: &str = "gemini";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Google Gemini `generateContent` backend.
#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    pub client: reqwest::Client,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub system_instruction: String,
    pub temperature: f32,
}

impl GeminiGenerator {
    fn endpoint(&self) -> String {
        let base_url = self.base_url.trim_end_matches('/');
        format!("{base_url}/models/{}:generateContent", self.model)
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let endpoint = self.endpoint();
        let body = serde_json::json!({
            "systemInstruction": { "parts": [{ "text": self.system_instruction }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": self.temperature },
        });

        tracing::info!(engine = ENGINE, model = %self.model, prompt_chars = prompt.len(), "generate recap");

        let response = self
            .client
            .post(&endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| GenerateError::Request {
                engine: ENGINE,
                message: format!("POST {endpoint}: {err}"),
            })?;

        let status = response.status();
        let raw = response.text().await.map_err(|err| GenerateError::Request {
            engine: ENGINE,
            message: format!("read response body: {err}"),
        })?;
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
        extract_candidate_text(&value)
    }
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let message = value.pointer("/error/message")?.as_str()?.to_owned();
    Some(message)
}

fn extract_candidate_text(value: &serde_json::Value) -> Result<String, GenerateError> {
    let parts = value
        .pointer("/candidates/0/content/parts")
        .and_then(|v| v.as_array())
        .ok_or_else(|| {
            let reason = value
                .pointer("/promptFeedback/blockReason")
                .and_then(|v| v.as_str())
                .unwrap_or("missing candidates");
            GenerateError::Request {
                engine: ENGINE,
                message: format!("no candidate content ({reason})"),
            }
        })?;

    let text = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|v| v.as_str()))
        .collect::<String>();

    if text.trim().is_empty() {
        return Err(GenerateError::EmptyOutput { engine: ENGINE });
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_parts_of_first_candidate() {
        let value = serde_json::json!({
            "candidates": [
                { "content": { "parts": [{ "text": "SECTION 1 — " }, { "text": "..." }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        });
        assert_eq!(extract_candidate_text(&value).unwrap(), "SECTION 1 — ...");
    }

    #[test]
    fn blocked_prompt_reports_reason() {
        let value = serde_json::json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = extract_candidate_text(&value).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn endpoint_includes_model() {
        let generator = GeminiGenerator {
            client: reqwest::Client::new(),
            base_url: "http://localhost:1/v1beta/".to_owned(),
            api_key: "k".to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            system_instruction: String::new(),
            temperature: 0.4,
        };
        assert_eq!(
            generator.endpoint(),
            "http://localhost:1/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
