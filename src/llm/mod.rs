pub mod gemini;
pub mod provider;
pub mod retry;
pub mod types;

pub use gemini::GeminiProvider;
pub use provider::LlmProvider;
pub use retry::RetryPolicy;
pub use types::{ChatMessage, ChatRequest, EmbeddingTask};
