use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use super::memory::ConversationMemory;
use super::policy::{Decision, DecisionPolicy};
use super::tool::AgentTool;
use crate::core::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPhase {
    Idle,
    Deciding,
    ToolRunning,
    Responding,
}

impl fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentPhase::Idle => "idle",
            AgentPhase::Deciding => "deciding",
            AgentPhase::ToolRunning => "tool_running",
            AgentPhase::Responding => "responding",
        };
        f.write_str(name)
    }
}

/// One conversational session. Turns are processed strictly one at a time.
pub struct FraudAgent {
    session_id: String,
    policy: Arc<dyn DecisionPolicy>,
    tool: Arc<dyn AgentTool>,
    memory: ConversationMemory,
    phase: AgentPhase,
}

impl FraudAgent {
    pub fn new(
        policy: Arc<dyn DecisionPolicy>,
        tool: Arc<dyn AgentTool>,
        max_history_turns: usize,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            policy,
            tool,
            memory: ConversationMemory::new(max_history_turns),
            phase: AgentPhase::Idle,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn phase(&self) -> AgentPhase {
        self.phase
    }

    fn enter(&mut self, phase: AgentPhase) {
        tracing::debug!(session = %self.session_id, "{} -> {}", self.phase, phase);
        self.phase = phase;
    }

    /// Handle one user turn and return the reply. A failed turn leaves the
    /// transcript untouched.
    pub async fn run_turn(&mut self, input: &str) -> Result<String, AppError> {
        if input.trim().is_empty() {
            return Err(AppError::BadRequest("query must not be empty".to_string()));
        }

        let result = self.process(input).await;
        self.enter(AgentPhase::Idle);

        let reply = result?;
        self.memory.record_exchange(input, &reply);
        Ok(reply)
    }

    async fn process(&mut self, input: &str) -> Result<String, AppError> {
        self.enter(AgentPhase::Deciding);
        let decision = self
            .policy
            .decide(input, self.memory.turns(), self.tool.as_ref())
            .await?;

        let reply = match decision {
            Decision::UseTool { input: tool_input } => {
                self.enter(AgentPhase::ToolRunning);
                tracing::info!(session = %self.session_id, "Invoking {}", self.tool.name());
                self.tool.run(&tool_input).await?
            }
            Decision::Respond(text) => text,
        };

        self.enter(AgentPhase::Responding);
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::memory::{ConversationTurn, Role};
    use crate::agent::policy::AlwaysUseTool;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct EchoTool {
        inputs: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl AgentTool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "echoes"
        }

        async fn run(&self, input: &str) -> Result<String, AppError> {
            self.inputs.lock().unwrap().push(input.to_string());
            if self.fail {
                return Err(AppError::Storage("disk gone".to_string()));
            }
            Ok(format!("tool:{}", input))
        }
    }

    struct Greeter;

    #[async_trait]
    impl DecisionPolicy for Greeter {
        async fn decide(
            &self,
            input: &str,
            history: &[ConversationTurn],
            _tool: &dyn AgentTool,
        ) -> Result<Decision, AppError> {
            if input == "hi" {
                return Ok(Decision::Respond(format!("hello ({} turns so far)", history.len())));
            }
            Ok(Decision::UseTool {
                input: input.to_uppercase(),
            })
        }
    }

    #[tokio::test]
    async fn tool_reply_is_returned_and_recorded() {
        let tool = Arc::new(EchoTool::default());
        let mut agent = FraudAgent::new(Arc::new(AlwaysUseTool), tool.clone(), 10);

        let reply = agent.run_turn("check 203.0.113.7").await.unwrap();
        assert_eq!(reply, "tool:check 203.0.113.7");
        assert_eq!(agent.phase(), AgentPhase::Idle);

        let turns = agent.memory().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].content, "tool:check 203.0.113.7");
    }

    #[tokio::test]
    async fn direct_answers_skip_the_tool_and_see_history() {
        let tool = Arc::new(EchoTool::default());
        let mut agent = FraudAgent::new(Arc::new(Greeter), tool.clone(), 10);

        assert_eq!(agent.run_turn("hi").await.unwrap(), "hello (0 turns so far)");
        assert_eq!(agent.run_turn("scan").await.unwrap(), "tool:SCAN");
        assert_eq!(agent.run_turn("hi").await.unwrap(), "hello (4 turns so far)");

        assert_eq!(*tool.inputs.lock().unwrap(), vec!["SCAN".to_string()]);
        assert_eq!(agent.memory().total_turns(), 6);
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let mut agent = FraudAgent::new(Arc::new(AlwaysUseTool), Arc::new(EchoTool::default()), 10);
        let err = agent.run_turn("   ").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(agent.memory().is_empty());
    }

    #[tokio::test]
    async fn failed_turn_propagates_and_keeps_transcript() {
        let tool = Arc::new(EchoTool {
            fail: true,
            ..Default::default()
        });
        let mut agent = FraudAgent::new(Arc::new(AlwaysUseTool), tool, 10);

        let err = agent.run_turn("lookup").await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert!(agent.memory().is_empty());
        assert_eq!(agent.phase(), AgentPhase::Idle);
    }

    #[test]
    fn sessions_get_distinct_ids() {
        let a = FraudAgent::new(Arc::new(AlwaysUseTool), Arc::new(EchoTool::default()), 10);
        let b = FraudAgent::new(Arc::new(AlwaysUseTool), Arc::new(EchoTool::default()), 10);
        assert_ne!(a.session_id(), b.session_id());
    }
}
