use serde_json::{Map, Value};

use crate::core::errors::AppError;

const SUPPORTED_PROVIDERS: [&str; 1] = ["gemini"];
const DECISION_MODES: [&str; 2] = ["react", "always_tool"];

pub fn validate_config(config: &Value) -> Result<(), AppError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_choice_field(llm, "llm.provider", "provider", &SUPPORTED_PROVIDERS)?;
        validate_non_empty_string_field(llm, "llm.model", "model")?;
        validate_optional_string_field(llm, "llm.api_key", "api_key")?;
        validate_non_empty_string_field(llm, "llm.base_url", "base_url")?;
        validate_f64_field(llm, "llm.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(
            llm,
            "llm.request_timeout_secs",
            "request_timeout_secs",
            1,
            3_600,
        )?;

        if let Some(retry) = expect_optional_object(llm, "retry")? {
            validate_u64_field(retry, "llm.retry.max_attempts", "max_attempts", 1, 20)?;
            validate_u64_field(
                retry,
                "llm.retry.base_delay_ms",
                "base_delay_ms",
                0,
                60_000,
            )?;
            validate_u64_field(
                retry,
                "llm.retry.max_delay_ms",
                "max_delay_ms",
                0,
                600_000,
            )?;
        }
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_non_empty_string_field(embedding, "embedding.model", "model")?;
    }

    if let Some(reputation) = expect_optional_object(root, "reputation")? {
        validate_optional_string_field(reputation, "reputation.base_url", "base_url")?;
        validate_optional_string_field(reputation, "reputation.api_key", "api_key")?;
        validate_u64_field(
            reputation,
            "reputation.timeout_secs",
            "timeout_secs",
            1,
            300,
        )?;
    }

    if let Some(store) = expect_optional_object(root, "store")? {
        validate_non_empty_string_field(
            store,
            "store.persist_directory",
            "persist_directory",
        )?;
        validate_non_empty_string_field(store, "store.collection_name", "collection_name")?;
        validate_optional_string_field(store, "store.seed_path", "seed_path")?;
        validate_u64_field(store, "store.top_k", "top_k", 1, 100)?;
    }

    if let Some(agent) = expect_optional_object(root, "agent")? {
        validate_u64_field(
            agent,
            "agent.max_history_turns",
            "max_history_turns",
            2,
            10_000,
        )?;
        validate_choice_field(agent, "agent.decision", "decision", &DECISION_MODES)?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, AppError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), AppError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(AppError::Config(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), AppError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if !(min..=max).contains(&number) {
        return Err(AppError::Config(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_non_empty_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), AppError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(AppError::Config(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), AppError> {
    match section.get(key) {
        None | Some(Value::Null) | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(config_type_error(path, "string")),
    }
}

fn validate_choice_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), AppError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if !allowed.contains(&text) {
        return Err(AppError::Config(format!(
            "Invalid config at '{}': '{}' is not one of {}",
            path,
            text,
            allowed.join(", ")
        )));
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> AppError {
    AppError::Config(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
