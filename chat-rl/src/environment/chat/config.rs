use std::str::FromStr;
use std::time::Duration;

use burn::config::Config;
use thiserror::Error;

use super::reward::Task;

pub const ENV_BACKEND_URL: &str = "CHAT_RL_BACKEND_URL";
pub const ENV_AGENT_EMAIL: &str = "CHAT_RL_AGENT_EMAIL";
pub const ENV_AGENT_PASSWORD: &str = "CHAT_RL_AGENT_PASSWORD";
pub const ENV_TASK: &str = "CHAT_RL_TASK";
pub const ENV_MAX_STEPS: &str = "CHAT_RL_MAX_STEPS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Config, Debug)]
pub struct ChatEnvironmentConfig {
    #[config(default = "String::from(\"http://localhost:3001\")")]
    pub backend_url: String,
    #[config(default = "String::from(\"rl_agent@slack.ai\")")]
    pub agent_email: String,
    #[config(default = "String::from(\"agent123\")")]
    pub agent_password: String,
    #[config(default = "String::from(\"RL_Agent\")")]
    pub agent_username: String,
    #[config(default = "Task::Conversation")]
    pub task: Task,
    #[config(default = 100)]
    pub max_steps: u64,
    #[config(default = 128)]
    pub embedding_dim: usize,
    #[config(default = "String::from(\"RL Training Space\")")]
    pub workspace_name: String,
    #[config(default = "String::from(\"rl-training\")")]
    pub workspace_slug: String,
    #[config(default = 50)]
    pub inbox_capacity: usize,
    /// Pause after each action so that echoed events can arrive.
    #[config(default = 0)]
    pub settle_ms: u64,
    #[config(default = 5000)]
    pub connect_timeout_ms: u64,
}

impl ChatEnvironmentConfig {
    /// Overrides fields from `CHAT_RL_*` variables of the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BACKEND_URL) {
            self.backend_url = url;
        }
        if let Some(email) = lookup(ENV_AGENT_EMAIL) {
            self.agent_email = email;
        }
        if let Some(password) = lookup(ENV_AGENT_PASSWORD) {
            self.agent_password = password;
        }
        if let Some(task) = lookup(ENV_TASK) {
            self.task = Task::from_str(&task).map_err(|reason| ConfigError::InvalidValue {
                key: ENV_TASK,
                value: task.clone(),
                reason,
            })?;
        }
        if let Some(steps) = lookup(ENV_MAX_STEPS) {
            self.max_steps = steps.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidValue {
                    key: ENV_MAX_STEPS,
                    value: steps.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        Ok(self)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
