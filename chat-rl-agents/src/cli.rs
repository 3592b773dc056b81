//! Argument and logging setup shared by the binaries.

use chat_rl::environment::chat::{ChatEnvironmentConfig, ConfigError, Task};
use chat_rl::environment::simple::SimpleEnvironmentConfig;
use clap::{Args, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EnvKind {
    /// Offline environment with fixed rewards.
    Simple,
    /// Live chat backend.
    Chat,
}

#[derive(Debug, Clone, Args)]
pub struct EnvArgs {
    #[arg(long, value_enum, default_value_t = EnvKind::Simple)]
    pub env: EnvKind,
    /// conversation, moderation or routing.
    #[arg(long)]
    pub task: Option<Task>,
    #[arg(long)]
    pub backend_url: Option<String>,
    #[arg(long)]
    pub max_steps: Option<u64>,
}

impl EnvArgs {
    /// Defaults, then `CHAT_RL_*` variables, then command line flags.
    pub fn chat_config(&self) -> Result<ChatEnvironmentConfig, ConfigError> {
        self.chat_config_with(|key| std::env::var(key).ok())
    }

    pub fn chat_config_with<F>(&self, lookup: F) -> Result<ChatEnvironmentConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = ChatEnvironmentConfig::new().with_overrides(lookup)?;
        if let Some(task) = self.task {
            cfg.task = task;
        }
        if let Some(url) = &self.backend_url {
            cfg.backend_url = url.clone();
        }
        if let Some(max_steps) = self.max_steps {
            cfg.max_steps = max_steps;
        }
        Ok(cfg)
    }

    pub fn simple_config(&self) -> SimpleEnvironmentConfig {
        let mut cfg = SimpleEnvironmentConfig::new();
        if let Some(task) = self.task {
            cfg.task = task;
        }
        if let Some(url) = &self.backend_url {
            cfg.backend_url = url.clone();
        }
        if let Some(max_steps) = self.max_steps {
            cfg.max_steps = max_steps;
        }
        cfg
    }
}

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_rl=info,chat_rl_agents=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

#[cfg(test)]
mod tests {
    use chat_rl::environment::chat::config::{ENV_BACKEND_URL, ENV_TASK};
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        env: EnvArgs,
    }

    #[test]
    fn test_flags_override_environment() {
        let cli = TestCli::parse_from(["test", "--env", "chat", "--task", "Routing", "--max-steps", "7"]);
        assert_eq!(cli.env.env, EnvKind::Chat);
        let cfg = cli
            .env
            .chat_config_with(|key| match key {
                ENV_TASK => Some("moderation".to_string()),
                ENV_BACKEND_URL => Some("http://backend:3001".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(cfg.task, Task::Routing);
        assert_eq!(cfg.backend_url, "http://backend:3001");
        assert_eq!(cfg.max_steps, 7);
    }

    #[test]
    fn test_simple_defaults() {
        let cli = TestCli::parse_from(["test"]);
        assert_eq!(cli.env.env, EnvKind::Simple);
        assert_eq!(cli.env.simple_config().max_steps, 50);
        assert!(TestCli::try_parse_from(["test", "--task", "chitchat"]).is_err());
    }
}
