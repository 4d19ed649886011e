// Answer Synthesizer
// Fills the fixed fraud-analysis prompt and asks the LLM for the final reply

use std::sync::Arc;

use crate::core::config::LlmSettings;
use crate::core::errors::AppError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider, RetryPolicy};

pub fn build_prompt(query: &str, retrieved_docs: &str, fraud_api_result: &str) -> String {
    format!(
        "You are a fraud analysis assistant.\n\
         \n\
         User Query:\n\
         {query}\n\
         \n\
         Retrieved Knowledge Context:\n\
         {retrieved_docs}\n\
         \n\
         Fraud Check Result (if applicable):\n\
         {fraud_api_result}\n\
         \n\
         Based on all of the above, provide a clear and actionable response to the user."
    )
}

pub struct AnswerSynthesizer {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f64,
    retry: RetryPolicy,
}

impl AnswerSynthesizer {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: &LlmSettings) -> Self {
        Self {
            provider,
            model: settings.model.clone(),
            temperature: settings.temperature,
            retry: RetryPolicy::from_settings(&settings.retry),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// One completion over the filled prompt. Rate limiting and temporary
    /// unavailability are retried; every other failure is returned as is.
    pub async fn synthesize(
        &self,
        query: &str,
        retrieved_docs: &str,
        fraud_api_result: &str,
    ) -> Result<String, AppError> {
        let prompt = build_prompt(query, retrieved_docs, fraud_api_result);

        self.retry
            .run("answer synthesis", || {
                let request =
                    ChatRequest::new(vec![ChatMessage::user(prompt.clone())])
                        .with_temperature(self.temperature);
                self.provider.chat(request, &self.model)
            })
            .await
    }
}
