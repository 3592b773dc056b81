//! Offline chat environment with a fixed reward per action.
//!
//! Useful for smoke-testing agents without a running chat backend.

use std::convert::Infallible;
use std::fmt;

use burn::config::Config;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::info;

use super::chat::reward::Task;
use super::spaces::Enumerated;
use super::{DiscreteAction, Environment, Step};

pub const OBSERVATION_DIM: usize = 10;

#[derive(Config, Debug)]
pub struct SimpleEnvironmentConfig {
    #[config(default = 50)]
    pub max_steps: u64,
    #[config(default = "String::from(\"http://localhost:3001\")")]
    pub backend_url: String,
    #[config(default = "Task::Conversation")]
    pub task: Task,
}

impl SimpleEnvironmentConfig {
    pub fn init(&self) -> SimpleChatEnvironment {
        info!(
            backend_url = %self.backend_url,
            task = %self.task,
            max_steps = self.max_steps,
            "simple chat environment initialized"
        );
        SimpleChatEnvironment {
            cfg: self.clone(),
            current_step: 0,
            rng: StdRng::from_entropy(),
            action_space: Enumerated::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleAction {
    SendMessage,
    ReactToMessage,
    CreateChannel,
    ReadMessages,
    Idle,
}

impl SimpleAction {
    pub const ALL: [SimpleAction; 5] = [
        SimpleAction::SendMessage,
        SimpleAction::ReactToMessage,
        SimpleAction::CreateChannel,
        SimpleAction::ReadMessages,
        SimpleAction::Idle,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SimpleAction::SendMessage => "send_message",
            SimpleAction::ReactToMessage => "react_to_message",
            SimpleAction::CreateChannel => "create_channel",
            SimpleAction::ReadMessages => "read_messages",
            SimpleAction::Idle => "idle",
        }
    }

    pub fn reward(&self) -> f64 {
        match self {
            SimpleAction::SendMessage => 1.0,
            SimpleAction::ReactToMessage => 0.5,
            SimpleAction::CreateChannel => 2.0,
            SimpleAction::ReadMessages => 0.3,
            SimpleAction::Idle => -0.1,
        }
    }
}

impl fmt::Display for SimpleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl DiscreteAction for SimpleAction {
    fn count() -> usize {
        Self::ALL.len()
    }

    // Out-of-range indices fall back to idling.
    fn from_index(index: usize) -> Self {
        Self::ALL
            .get(index)
            .copied()
            .unwrap_or(SimpleAction::Idle)
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimpleStepInfo {
    pub step: u64,
    pub action: SimpleAction,
    pub reward: f64,
}

pub struct SimpleChatEnvironment {
    cfg: SimpleEnvironmentConfig,
    current_step: u64,
    rng: StdRng,
    action_space: Enumerated<SimpleAction>,
}

impl SimpleChatEnvironment {
    pub fn config(&self) -> &SimpleEnvironmentConfig {
        &self.cfg
    }

    pub fn current_step(&self) -> u64 {
        self.current_step
    }

    fn observation(&mut self) -> Vec<f32> {
        let mut obs = Vec::with_capacity(OBSERVATION_DIM);
        obs.push(self.current_step as f32 / self.cfg.max_steps.max(1) as f32);
        for _ in 1..OBSERVATION_DIM {
            obs.push(self.rng.gen::<f32>());
        }
        obs
    }
}

impl Environment for SimpleChatEnvironment {
    type A = SimpleAction;
    type O = Vec<f32>;
    type Info = SimpleStepInfo;
    type Error = Infallible;
    type ActionSpace = Enumerated<SimpleAction>;

    fn action_space(&self) -> &Self::ActionSpace {
        &self.action_space
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<Vec<f32>, Infallible> {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self.current_step = 0;
        Ok(self.observation())
    }

    fn step(&mut self, action: SimpleAction) -> Result<Step<Vec<f32>, SimpleStepInfo>, Infallible> {
        self.current_step += 1;
        let reward = action.reward();
        let observation = self.observation();
        Ok(Step {
            observation,
            reward,
            done: self.current_step >= self.cfg.max_steps,
            info: SimpleStepInfo {
                step: self.current_step,
                action,
                reward,
            },
        })
    }

    fn close(&mut self) -> Result<(), Infallible> {
        info!("simple chat environment closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use super::*;
    use crate::environment::Space;

    #[test]
    fn test_rewards_are_constant_per_action() {
        let mut env = SimpleEnvironmentConfig::new().init();
        env.reset(Some(0)).unwrap();
        let rewards: Vec<(String, f64)> = SimpleAction::ALL
            .iter()
            .map(|a| {
                let step = env.step(*a).unwrap();
                (step.info.action.to_string(), step.reward)
            })
            .collect();
        let expected = expect![[r#"
            [
                (
                    "send_message",
                    1.0,
                ),
                (
                    "react_to_message",
                    0.5,
                ),
                (
                    "create_channel",
                    2.0,
                ),
                (
                    "read_messages",
                    0.3,
                ),
                (
                    "idle",
                    -0.1,
                ),
            ]
        "#]];
        expected.assert_debug_eq(&rewards);
    }

    #[test]
    fn test_unknown_index_is_idle() {
        assert_eq!(SimpleAction::from_index(2), SimpleAction::CreateChannel);
        assert_eq!(SimpleAction::from_index(17), SimpleAction::Idle);
    }

    #[test]
    fn test_episode_truncates_at_max_steps() {
        let mut env = SimpleEnvironmentConfig::new().with_max_steps(20).init();
        let obs = env.reset(Some(3)).unwrap();
        assert_eq!(obs.len(), OBSERVATION_DIM);
        assert_eq!(obs[0], 0.0);

        let mut steps = 0;
        loop {
            let step = env.step(SimpleAction::Idle).unwrap();
            steps += 1;
            assert!(step.observation[1..].iter().all(|x| (0.0..1.0).contains(x)));
            if step.done {
                assert_eq!(step.observation[0], 1.0);
                break;
            }
        }
        assert_eq!(steps, 20);
    }

    #[test]
    fn test_seeded_reset_is_deterministic() {
        let mut a = SimpleEnvironmentConfig::new().init();
        let mut b = SimpleEnvironmentConfig::new().init();
        assert_eq!(a.reset(Some(11)).unwrap(), b.reset(Some(11)).unwrap());
        let action = a.action_space().sample(&mut StdRng::seed_from_u64(1));
        assert_eq!(
            a.step(action).unwrap().observation,
            b.step(action).unwrap().observation
        );
    }
}
