//! Scripted collaborators shared by the agent unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::errors::AppError;
use crate::llm::{ChatRequest, EmbeddingTask, LlmProvider};

/// Replays canned chat results in order and records every request.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, AppError>>>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<String, AppError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> String {
        self.requests
            .lock()
            .unwrap()
            .last()
            .and_then(|r| r.messages.last())
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

pub fn status(code: u16) -> AppError {
    AppError::Provider {
        status: code,
        message: format!("scripted {}", code),
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, AppError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::Internal("script exhausted".to_string())))
    }

    async fn embed(
        &self,
        inputs: &[String],
        _model_id: &str,
        _task: EmbeddingTask,
    ) -> Result<Vec<Vec<f32>>, AppError> {
        Ok(inputs.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}
