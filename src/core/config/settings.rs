use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Typed view of the merged configuration tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub reputation: ReputationSettings,
    pub store: StoreSettings,
    pub agent: AgentSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub temperature: f64,
    pub request_timeout_secs: u64,
    pub retry: RetrySettings,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            temperature: 0.2,
            request_timeout_secs: 60,
            retry: RetrySettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model: String,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-004".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReputationSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ReputationSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.ipqualityscore.com/api/json/ip/".to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub persist_directory: PathBuf,
    pub collection_name: String,
    pub seed_path: Option<PathBuf>,
    pub top_k: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            persist_directory: PathBuf::from("chroma_db"),
            collection_name: "fraud_knowledge".to_string(),
            seed_path: Some(PathBuf::from("data/knowledge_base.txt")),
            top_k: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DecisionMode {
    #[default]
    React,
    AlwaysTool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub max_history_turns: usize,
    pub decision: DecisionMode,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_history_turns: 40,
            decision: DecisionMode::React,
        }
    }
}
