use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::memory::{ConversationTurn, Role};
use super::tool::AgentTool;
use crate::core::config::{DecisionMode, LlmSettings};
use crate::core::errors::AppError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider, RetryPolicy};

pub const FINAL_ANSWER_ACTION: &str = "Final Answer";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    UseTool { input: String },
    Respond(String),
}

/// Chooses, per turn, between invoking the tool and answering directly.
#[async_trait]
pub trait DecisionPolicy: Send + Sync {
    async fn decide(
        &self,
        input: &str,
        history: &[ConversationTurn],
        tool: &dyn AgentTool,
    ) -> Result<Decision, AppError>;
}

/// Routes every turn through the tool with the raw user input.
pub struct AlwaysUseTool;

#[async_trait]
impl DecisionPolicy for AlwaysUseTool {
    async fn decide(
        &self,
        input: &str,
        _history: &[ConversationTurn],
        _tool: &dyn AgentTool,
    ) -> Result<Decision, AppError> {
        Ok(Decision::UseTool {
            input: input.to_string(),
        })
    }
}

/// Asks the LLM for an `{"action", "action_input"}` blob.
pub struct ReactPolicy {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f64,
    retry: RetryPolicy,
}

impl ReactPolicy {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: &LlmSettings) -> Self {
        Self {
            provider,
            model: settings.model.clone(),
            temperature: settings.temperature,
            retry: RetryPolicy::from_settings(&settings.retry),
        }
    }
}

#[async_trait]
impl DecisionPolicy for ReactPolicy {
    async fn decide(
        &self,
        input: &str,
        history: &[ConversationTurn],
        tool: &dyn AgentTool,
    ) -> Result<Decision, AppError> {
        let mut messages = vec![ChatMessage::system(build_decision_instructions(tool))];
        for turn in history {
            messages.push(match turn.role {
                Role::User => ChatMessage::user(turn.content.clone()),
                Role::Assistant => ChatMessage::assistant(turn.content.clone()),
            });
        }
        messages.push(ChatMessage::user(input.to_string()));

        let text = self
            .retry
            .run("agent decision", || {
                let request = ChatRequest::new(messages.clone()).with_temperature(self.temperature);
                self.provider.chat(request, &self.model)
            })
            .await?;

        Ok(parse_decision(&text, tool.name(), input))
    }
}

pub fn policy_for(
    mode: DecisionMode,
    provider: Arc<dyn LlmProvider>,
    settings: &LlmSettings,
) -> Arc<dyn DecisionPolicy> {
    match mode {
        DecisionMode::React => Arc::new(ReactPolicy::new(provider, settings)),
        DecisionMode::AlwaysTool => Arc::new(AlwaysUseTool),
    }
}

fn build_decision_instructions(tool: &dyn AgentTool) -> String {
    format!(
        r#"You are a fraud analysis assistant talking with a user.
You have access to the following tool:

{name}: {description}

To use the tool, respond ONLY with JSON in this format:
{{"action": "{name}", "action_input": "<the user's question, restated if needed>"}}
To reply without the tool, respond ONLY with JSON in this format:
{{"action": "{final_action}", "action_input": "<your reply>"}}
Do not include any extra text outside the JSON."#,
        name = tool.name(),
        description = tool.description(),
        final_action = FINAL_ANSWER_ACTION,
    )
}

/// Text that is not a recognizable decision blob is taken as the reply itself.
fn parse_decision(text: &str, tool_name: &str, user_input: &str) -> Decision {
    let Some(value) = parse_json_from_text(text) else {
        return Decision::Respond(text.trim().to_string());
    };

    let action = value.get("action").and_then(Value::as_str).unwrap_or("");
    let action_input = match value.get("action_input") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    if action == tool_name {
        let input = if action_input.is_empty() {
            user_input.to_string()
        } else {
            action_input
        };
        return Decision::UseTool { input };
    }

    if action == FINAL_ANSWER_ACTION {
        return Decision::Respond(action_input);
    }

    Decision::Respond(text.trim().to_string())
}

fn parse_json_from_text(text: &str) -> Option<Value> {
    let trimmed = text.trim();

    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        return v.is_object().then_some(v);
    }

    // fenced or chatty output
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end])
        .ok()
        .filter(Value::is_object)
}
