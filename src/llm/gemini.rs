use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::{ChatMessage, ChatRequest, EmbeddingTask};
use crate::core::config::LlmSettings;
use crate::core::errors::AppError;

/// Google Generative Language REST client (chat + embeddings).
#[derive(Clone)]
pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AppError::internal)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    pub fn from_settings(settings: &LlmSettings) -> Result<Self, AppError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("GEMINI_API_KEY is not set (llm.api_key)".to_string())
            })?;

        Self::new(
            settings.base_url.clone(),
            api_key,
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    fn model_url(&self, model_id: &str, method: &str) -> String {
        let model = model_path(model_id);
        format!("{}/{}:{}", self.base_url, model, method)
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value, AppError> {
        let res = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(AppError::transport)?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(AppError::Provider {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        res.json().await.map_err(AppError::transport)
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, AppError> {
        let url = self.model_url(model_id, "generateContent");
        let body = generate_body(&request);

        let payload = self.post(&url, &body).await?;
        let response: GenerateResponse =
            serde_json::from_value(payload).map_err(AppError::internal)?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or_else(|| AppError::Internal("Gemini returned no candidates".to_string()))?;

        Ok(text)
    }

    async fn embed(
        &self,
        inputs: &[String],
        model_id: &str,
        task: EmbeddingTask,
    ) -> Result<Vec<Vec<f32>>, AppError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.model_url(model_id, "batchEmbedContents");
        let model = model_path(model_id);
        let requests: Vec<Value> = inputs
            .iter()
            .map(|text| {
                json!({
                    "model": model,
                    "content": { "parts": [{ "text": text }] },
                    "taskType": task.as_str(),
                })
            })
            .collect();

        let payload = self.post(&url, &json!({ "requests": requests })).await?;
        let response: BatchEmbedResponse =
            serde_json::from_value(payload).map_err(AppError::internal)?;

        if response.embeddings.len() != inputs.len() {
            return Err(AppError::Internal(format!(
                "Embedding count mismatch: {} != {}",
                response.embeddings.len(),
                inputs.len()
            )));
        }

        Ok(response.embeddings.into_iter().map(|e| e.values).collect())
    }
}

fn model_path(model_id: &str) -> String {
    if model_id.starts_with("models/") {
        model_id.to_string()
    } else {
        format!("models/{}", model_id)
    }
}

/// Gemini keeps system text out of `contents` and calls the assistant "model".
fn generate_body(request: &ChatRequest) -> Value {
    let system_text: Vec<&str> = request
        .messages
        .iter()
        .filter(|m| m.role == "system")
        .map(|m| m.content.as_str())
        .collect();

    let contents: Vec<Value> = request
        .messages
        .iter()
        .filter(|m| m.role != "system")
        .map(content_entry)
        .collect();

    let mut body = json!({ "contents": contents });

    if let Some(obj) = body.as_object_mut() {
        if !system_text.is_empty() {
            obj.insert(
                "systemInstruction".to_string(),
                json!({ "parts": [{ "text": system_text.join("\n\n") }] }),
            );
        }

        let mut generation = serde_json::Map::new();
        if let Some(t) = request.temperature {
            generation.insert("temperature".to_string(), json!(t));
        }
        if !generation.is_empty() {
            obj.insert("generationConfig".to_string(), Value::Object(generation));
        }
    }

    body
}

fn content_entry(message: &ChatMessage) -> Value {
    let role = if message.role == "assistant" {
        "model"
    } else {
        "user"
    };
    json!({ "role": role, "parts": [{ "text": message.content }] })
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
