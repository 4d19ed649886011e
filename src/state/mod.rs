use std::sync::Arc;

use crate::agent::{
    policy_for, AgentTool, AnswerSynthesizer, DecisionPolicy, FraudAgent, FraudKnowledgeTool,
};
use crate::core::config::{AppConfig, AppPaths};
use crate::llm::{GeminiProvider, LlmProvider};
use crate::rag::{Embedder, KnowledgeStore};
use crate::tools::ReputationClient;

pub mod error;

pub use error::InitializationError;

/// Long-lived collaborators, built once at startup and shared by every session.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: AppConfig,
    pub llm: Arc<dyn LlmProvider>,
    pub knowledge: Arc<KnowledgeStore>,
    pub reputation: Arc<ReputationClient>,
    pub synthesizer: Arc<AnswerSynthesizer>,
    pub tool: Arc<dyn AgentTool>,
    pub policy: Arc<dyn DecisionPolicy>,
}

impl AppState {
    /// Initializes the application state against the configured Gemini backend.
    ///
    /// Opening the knowledge store ingests the seed file, so this performs
    /// embedding calls before returning.
    pub async fn initialize(
        paths: Arc<AppPaths>,
        config: AppConfig,
    ) -> Result<Arc<Self>, InitializationError> {
        let llm: Arc<dyn LlmProvider> = Arc::new(
            GeminiProvider::from_settings(&config.llm)
                .map_err(|e| InitializationError::Llm(e.into()))?,
        );

        Self::with_provider(paths, config, llm).await
    }

    pub async fn with_provider(
        paths: Arc<AppPaths>,
        config: AppConfig,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Arc<Self>, InitializationError> {
        tracing::info!("Using LLM provider '{}' ({})", llm.name(), config.llm.model);

        let embedder = Embedder::new(llm.clone(), config.embedding.model.clone());
        let knowledge = Arc::new(
            KnowledgeStore::from_settings(paths.as_ref(), &config.store, embedder)
                .await
                .map_err(|e| InitializationError::Knowledge(e.into()))?,
        );

        let reputation = Arc::new(
            ReputationClient::new(&config.reputation)
                .map_err(|e| InitializationError::Reputation(e.into()))?,
        );
        if config.reputation.api_key.is_none() {
            tracing::warn!("FRAUD_API_KEY is not set; reputation checks will report API errors");
        }

        let synthesizer = Arc::new(AnswerSynthesizer::new(llm.clone(), &config.llm));
        let tool: Arc<dyn AgentTool> = Arc::new(FraudKnowledgeTool::new(
            knowledge.clone(),
            reputation.clone(),
            synthesizer.clone(),
            config.store.top_k,
        ));
        let policy = policy_for(config.agent.decision, llm.clone(), &config.llm);

        Ok(Arc::new(AppState {
            paths,
            config,
            llm,
            knowledge,
            reputation,
            synthesizer,
            tool,
            policy,
        }))
    }

    /// Fresh conversational session with an empty transcript.
    pub fn new_agent(&self) -> FraudAgent {
        FraudAgent::new(
            self.policy.clone(),
            self.tool.clone(),
            self.config.agent.max_history_turns,
        )
    }
}
