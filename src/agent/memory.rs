use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// In-process transcript for one session.
///
/// At most the newest `max_turns` turns are retained, always starting on a
/// user turn; `total_turns` keeps counting everything ever appended.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    turns: Vec<ConversationTurn>,
    max_turns: usize,
    total_turns: u64,
}

impl ConversationMemory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_turns: max_turns.max(2),
            total_turns: 0,
        }
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push(ConversationTurn {
            role,
            content: content.into(),
            at: Utc::now(),
        });
        self.total_turns += 1;

        if self.turns.len() > self.max_turns {
            let mut excess = self.turns.len() - self.max_turns;
            // never start the retained history on a reply
            while excess < self.turns.len() && self.turns[excess].role == Role::Assistant {
                excess += 1;
            }
            self.turns.drain(..excess);
        }
    }

    pub fn record_exchange(&mut self, user: &str, assistant: &str) {
        self.push(Role::User, user);
        self.push(Role::Assistant, assistant);
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn total_turns(&self) -> u64 {
        self.total_turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
