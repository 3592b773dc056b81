use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::action::ActionType;

pub const SUCCESS_BONUS: f64 = 0.1;
pub const ACTION_PENALTY: f64 = 0.01;
/// Responses before this step count as timely.
pub const TIMELY_STEPS: u64 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    #[default]
    Conversation,
    Moderation,
    Routing,
}

impl Task {
    pub const ALL: [Task; 3] = [Task::Conversation, Task::Moderation, Task::Routing];

    pub fn name(&self) -> &'static str {
        match self {
            Task::Conversation => "conversation",
            Task::Moderation => "moderation",
            Task::Routing => "routing",
        }
    }

    pub fn weights(&self) -> RewardWeights {
        match self {
            Task::Conversation => RewardWeights::Conversation {
                response_relevance: 0.4,
                timeliness: 0.3,
                engagement: 0.3,
            },
            Task::Moderation => RewardWeights::Moderation {
                spam_detection: 0.5,
                inappropriate_content: 0.5,
            },
            Task::Routing => RewardWeights::Routing {
                correct_channel: 0.7,
                message_clarity: 0.3,
            },
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Task {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Task::ALL
            .into_iter()
            .find(|task| task.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown task {s:?}, expected conversation, moderation or routing"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RewardWeights {
    Conversation {
        response_relevance: f64,
        timeliness: f64,
        engagement: f64,
    },
    Moderation {
        spam_detection: f64,
        inappropriate_content: f64,
    },
    Routing {
        correct_channel: f64,
        message_clarity: f64,
    },
}

/// What the reward of a single step depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardContext {
    pub action_type: ActionType,
    pub success: bool,
    pub step: u64,
    pub buffered_messages: usize,
}

pub fn calculate_reward(task: Task, ctx: &RewardContext) -> f64 {
    let mut reward = 0.0;
    if ctx.success {
        reward += SUCCESS_BONUS;
    }

    // Only the conversation task shapes rewards beyond success and effort.
    if let RewardWeights::Conversation {
        response_relevance,
        timeliness,
        engagement,
    } = task.weights()
    {
        if ctx.action_type == ActionType::SendMessage && ctx.buffered_messages > 0 {
            reward += response_relevance * 0.5;
            if ctx.step < TIMELY_STEPS {
                reward += timeliness * 0.3;
            }
            reward += engagement * 0.2;
        }
    }

    if ctx.step > 0 && ctx.action_type != ActionType::Wait {
        reward -= ACTION_PENALTY;
    }
    reward
}
