//! Conversational fraud agent.
//!
//! A turn flows through the decision policy, then (optionally) the combined
//! knowledge/reputation tool, whose synthesized text becomes the reply.

pub mod memory;
pub mod policy;
pub mod runtime;
pub mod synthesizer;
pub mod tool;

#[cfg(test)]
pub(crate) mod testing;

pub use memory::{ConversationMemory, ConversationTurn, Role};
pub use policy::{policy_for, AlwaysUseTool, Decision, DecisionPolicy, ReactPolicy};
pub use runtime::{AgentPhase, FraudAgent};
pub use synthesizer::AnswerSynthesizer;
pub use tool::{AgentTool, FraudKnowledgeTool, FRAUD_TOOL_NAME, NO_SIGNAL_TEXT};
