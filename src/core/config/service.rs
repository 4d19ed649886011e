use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::AppConfig;
use super::validation::validate_config;
use crate::core::errors::AppError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 8] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "private_key",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 3] = ["max_tokens", "total_tokens", "tokens"];

/// Environment variables that override a single config leaf.
const ENV_OVERRIDES: [(&str, &[&str]); 6] = [
    ("GENAI_MODEL", &["llm", "model"]),
    ("GEMINI_API_KEY", &["llm", "api_key"]),
    ("EMBEDDING_MODEL", &["embedding", "model"]),
    ("FRAUD_API_KEY", &["reputation", "api_key"]),
    ("FRAUD_API_URL", &["reputation", "base_url"]),
    ("CHROMA_COLLECTION_NAME", &["store", "collection_name"]),
];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("FRAUD_ASSISTANT_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    /// Loads `.env` files into the process environment without clobbering
    /// variables that are already set.
    pub fn load_dotenv(&self) {
        for candidate in [
            self.paths.project_root.join(".env"),
            self.paths.project_root.join("config").join(".env"),
        ] {
            if candidate.exists() {
                match dotenvy::from_path(&candidate) {
                    Ok(()) => tracing::debug!("Loaded environment from {}", candidate.display()),
                    Err(err) => {
                        tracing::warn!("Failed to read {}: {}", candidate.display(), err)
                    }
                }
            }
        }
    }

    /// Raw merged tree: config file, then environment overrides.
    pub fn load_value(&self) -> Result<Value, AppError> {
        let file_config = load_yaml_file(&self.config_path())?;
        let overrides = env_overrides(|key| env::var(key).ok());
        Ok(deep_merge(&file_config, &overrides))
    }

    pub fn load(&self) -> Result<AppConfig, AppError> {
        self.load_dotenv();
        let merged = self.load_value()?;
        let config = parse_config(&merged)?;
        tracing::debug!(
            "Effective configuration: {}",
            redact_sensitive_values(&merged)
        );
        Ok(config)
    }
}

/// Validates a raw tree and deserializes it into [`AppConfig`].
pub fn parse_config(value: &Value) -> Result<AppConfig, AppError> {
    validate_config(value)?;
    serde_json::from_value(value.clone())
        .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))
}

fn load_yaml_file(path: &Path) -> Result<Value, AppError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let value = serde_yaml::from_str::<Value>(&contents).map_err(|e| {
        AppError::Config(format!("Failed to parse {}: {}", path.display(), e))
    })?;

    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(AppError::Config(format!(
            "{} must contain a mapping at the top level",
            path.display()
        ))),
    }
}

fn env_overrides<F>(lookup: F) -> Value
where
    F: Fn(&str) -> Option<String>,
{
    let mut root = Map::new();
    for (var, path) in ENV_OVERRIDES {
        let Some(value) = lookup(var).map(|v| v.trim().to_string()) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        insert_path(&mut root, path, Value::String(value));
    }
    Value::Object(root)
}

fn insert_path(root: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some((leaf, parents)) = path.split_last() else {
        return;
    };
    let mut cursor = root;
    for key in parents {
        let entry = cursor
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        cursor = match entry {
            Value::Object(map) => map,
            _ => return,
        };
    }
    cursor.insert(leaf.to_string(), value);
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}
