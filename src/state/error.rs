use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to initialize LLM provider: {0}")]
    Llm(#[source] anyhow::Error),

    #[error("Failed to initialize knowledge store: {0}")]
    Knowledge(#[source] anyhow::Error),

    #[error("Failed to initialize reputation client: {0}")]
    Reputation(#[source] anyhow::Error),
}
