use std::fmt;

use rand::Rng;

use crate::environment::spaces::{BoxSpace, Discrete};
use crate::environment::{DiscreteAction, Space};

pub const N_ACTION_TYPES: usize = 9;
pub const N_TARGETS: usize = 1000;
pub const N_EMOJIS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    SendMessage,
    React,
    CreateChannel,
    JoinChannel,
    SendDm,
    MarkRead,
    PinMessage,
    SearchMessages,
    Wait,
}

impl ActionType {
    pub const ALL: [ActionType; N_ACTION_TYPES] = [
        ActionType::SendMessage,
        ActionType::React,
        ActionType::CreateChannel,
        ActionType::JoinChannel,
        ActionType::SendDm,
        ActionType::MarkRead,
        ActionType::PinMessage,
        ActionType::SearchMessages,
        ActionType::Wait,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActionType::SendMessage => "send_message",
            ActionType::React => "react",
            ActionType::CreateChannel => "create_channel",
            ActionType::JoinChannel => "join_channel",
            ActionType::SendDm => "send_dm",
            ActionType::MarkRead => "mark_read",
            ActionType::PinMessage => "pin_message",
            ActionType::SearchMessages => "search_messages",
            ActionType::Wait => "wait",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A structured agent decision: what to do, plus the parameters some
/// action types consume.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatAction {
    pub action_type: ActionType,
    /// Decoded into message text by send and DM actions.
    pub message_embedding: Vec<f32>,
    /// Channel or user selector.
    pub target_id: usize,
    pub emoji: usize,
}

impl ChatAction {
    pub fn new(action_type: ActionType) -> Self {
        ChatAction {
            action_type,
            message_embedding: Vec::new(),
            target_id: 0,
            emoji: 0,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.message_embedding = embedding;
        self
    }

    pub fn with_target(mut self, target_id: usize) -> Self {
        self.target_id = target_id;
        self
    }

    pub fn with_emoji(mut self, emoji: usize) -> Self {
        self.emoji = emoji;
        self
    }
}

// Value-based agents pick only the action type; parameters stay at defaults.
impl DiscreteAction for ChatAction {
    fn count() -> usize {
        N_ACTION_TYPES
    }

    fn from_index(index: usize) -> Self {
        ChatAction::new(ActionType::from_index(index).unwrap_or(ActionType::Wait))
    }

    fn index(&self) -> usize {
        self.action_type.index()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatActionSpace {
    pub action_type: Discrete,
    pub message_embedding: BoxSpace,
    pub target_id: Discrete,
    pub emoji: Discrete,
}

impl ChatActionSpace {
    pub fn new(embedding_dim: usize) -> Self {
        ChatActionSpace {
            action_type: Discrete::new(N_ACTION_TYPES),
            message_embedding: BoxSpace::unit(vec![embedding_dim]),
            target_id: Discrete::new(N_TARGETS),
            emoji: Discrete::new(N_EMOJIS),
        }
    }
}

impl Space for ChatActionSpace {
    type Element = ChatAction;

    fn sample<R: Rng>(&self, rng: &mut R) -> ChatAction {
        let action_type = ActionType::from_index(self.action_type.sample(rng))
            .unwrap_or(ActionType::Wait);
        ChatAction {
            action_type,
            message_embedding: self.message_embedding.sample(rng),
            target_id: self.target_id.sample(rng),
            emoji: self.emoji.sample(rng),
        }
    }

    fn contains(&self, action: &ChatAction) -> bool {
        self.action_type.contains(&action.action_type.index())
            && self.message_embedding.contains(&action.message_embedding)
            && self.target_id.contains(&action.target_id)
            && self.emoji.contains(&action.emoji)
    }
}
