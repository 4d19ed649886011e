use std::sync::Arc;

use async_trait::async_trait;

use super::synthesizer::AnswerSynthesizer;
use crate::core::errors::AppError;
use crate::rag::KnowledgeStore;
use crate::tools::{signal, ReputationLookup};

pub const FRAUD_TOOL_NAME: &str = "FraudKnowledgeAndCheckTool";
pub const FRAUD_TOOL_DESCRIPTION: &str = "Use this to handle any query involving fraud detection, signs of fraud, or suspicious IP/email lookup.";
pub const NO_SIGNAL_TEXT: &str = "No IP or email detected in query.";

/// A capability the agent can invoke with a text input.
#[async_trait]
pub trait AgentTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn run(&self, input: &str) -> Result<String, AppError>;
}

/// Retrieval, optional reputation check and synthesis in one step.
pub struct FraudKnowledgeTool {
    knowledge: Arc<KnowledgeStore>,
    reputation: Arc<dyn ReputationLookup>,
    synthesizer: Arc<AnswerSynthesizer>,
    top_k: usize,
}

impl FraudKnowledgeTool {
    pub fn new(
        knowledge: Arc<KnowledgeStore>,
        reputation: Arc<dyn ReputationLookup>,
        synthesizer: Arc<AnswerSynthesizer>,
        top_k: usize,
    ) -> Self {
        Self {
            knowledge,
            reputation,
            synthesizer,
            top_k,
        }
    }
}

#[async_trait]
impl AgentTool for FraudKnowledgeTool {
    fn name(&self) -> &str {
        FRAUD_TOOL_NAME
    }

    fn description(&self) -> &str {
        FRAUD_TOOL_DESCRIPTION
    }

    async fn run(&self, input: &str) -> Result<String, AppError> {
        let documents = self.knowledge.query(input, self.top_k).await?;
        let retrieved = documents.join("\n");

        let fraud_result = match signal::extract(input) {
            Some(found) => {
                tracing::debug!("Checking reputation of {} {}", found.kind(), found);
                self.reputation.check(found.value()).await.to_string()
            }
            None => NO_SIGNAL_TEXT.to_string(),
        };

        self.synthesizer
            .synthesize(input, &retrieved, &fraud_result)
            .await
    }
}
