use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use burn::config::Config;
use burn::record::RecorderError;
use burn::tensor::backend::AutodiffBackend;
use chat_rl::data::util::{collect_multiple, collect_single};
use chat_rl::logging::{evaluate, EvaluationSummary};
use chat_rl::module::component::Actor;
use chat_rl::module::exploration::{epsilon_greedy, linear_decay};
use chat_rl::{
    data::{memory::Memory, util::Transition},
    environment::{Environment, Space},
};
use rand::Rng;
use thiserror::Error;
use tqdm::tqdm;
use tracing::info;

pub trait OffPolicyAgent<B: AutodiffBackend, TBatch>: Actor {
    fn update(self, batch: TBatch) -> Self;

    fn save(&self, path: &Path) -> Result<(), RecorderError>;
}

#[derive(Debug, Error)]
pub enum TrainError<E: std::error::Error + 'static> {
    #[error("environment failed: {0}")]
    Environment(#[source] E),
    #[error("failed to write checkpoint: {0}")]
    Checkpoint(#[from] RecorderError),
    #[error("failed to prepare checkpoint directory: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Config, Debug)]
pub struct OffPolicyAlgorithmConfig {
    #[config(default = 1_000)]
    pub early_start_steps: u64,
    pub training_steps: u64,
    pub batch_size: usize,
    #[config(default = 1.0)]
    pub exploration_start: f64,
    #[config(default = 0.1)]
    pub exploration_end: f64,
    /// Training steps over which exploration decays linearly.
    #[config(default = 1_000)]
    pub exploration_decay_steps: u64,
    #[config(default = 500)]
    pub eval_interval: u64,
    #[config(default = 5)]
    pub eval_episodes: u64,
    /// Zero disables periodic checkpoints.
    #[config(default = 0)]
    pub checkpoint_interval: u64,
}

#[derive(Debug, Clone, Default)]
pub struct TrainingReport {
    pub evaluations: Vec<(u64, EvaluationSummary)>,
    pub checkpoints: Vec<PathBuf>,
}

impl TrainingReport {
    pub fn final_evaluation(&self) -> Option<&EvaluationSummary> {
        self.evaluations.last().map(|(_, summary)| summary)
    }
}

pub struct OffPolicyAlgorithm<B, E, A, M, R>
where
    E: Environment,
    B: AutodiffBackend,
    A: OffPolicyAgent<B, Vec<Transition<E::O, E::A>>, A = E::A, O = E::O>,
    M: Memory<T = Transition<E::O, E::A>, TBatch = Vec<Transition<E::O, E::A>>>,
    R: Rng,
{
    cfg: OffPolicyAlgorithmConfig,
    env: E,
    eval_env: E,
    agent: A,
    memory: M,
    rng: R,
    checkpoint_dir: Option<PathBuf>,
    _phantom: PhantomData<B>,
}

impl OffPolicyAlgorithmConfig {
    pub fn init<A, B, E, M, R>(
        &self,
        env: E,
        eval_env: E,
        agent: A,
        memory: M,
        rng: R,
    ) -> OffPolicyAlgorithm<B, E, A, M, R>
    where
        E: Environment,
        B: AutodiffBackend,
        A: OffPolicyAgent<B, Vec<Transition<E::O, E::A>>, A = E::A, O = E::O>,
        M: Memory<T = Transition<E::O, E::A>, TBatch = Vec<Transition<E::O, E::A>>>,
        R: Rng,
    {
        OffPolicyAlgorithm {
            cfg: self.clone(),
            env,
            eval_env,
            agent,
            memory,
            rng,
            checkpoint_dir: None,
            _phantom: Default::default(),
        }
    }
}

impl<B, E, A, M, R> OffPolicyAlgorithm<B, E, A, M, R>
where
    E: Environment,
    E::ActionSpace: Clone,
    B: AutodiffBackend,
    A: OffPolicyAgent<B, Vec<Transition<E::O, E::A>>, A = E::A, O = E::O>,
    M: Memory<T = Transition<E::O, E::A>, TBatch = Vec<Transition<E::O, E::A>>>,
    R: Rng,
{
    pub fn with_checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = Some(dir.into());
        self
    }

    /// Runs the training loop, handing back the trained agent and both
    /// environments.
    #[allow(clippy::type_complexity)]
    pub fn train(mut self) -> Result<(A, E, E, TrainingReport), TrainError<E::Error>> {
        let mut report = TrainingReport::default();
        let space = self.env.action_space().clone();

        // Environment seeding
        let seed: u64 = self.rng.gen();
        let observation = self.env.reset(Some(seed)).map_err(TrainError::Environment)?;

        // Early Start
        let rng = &mut self.rng;
        let mut policy = |_: &E::O| space.sample(rng);
        let transitions = collect_multiple(
            &mut self.env,
            Some(observation),
            &mut policy,
            self.cfg.early_start_steps as usize,
        )
        .map_err(TrainError::Environment)?;
        self.memory.append(transitions);
        info!(transitions = self.memory.len(), "early start finished");

        // Main Training Loop
        let mut observation = Some(self.env.reset(None).map_err(TrainError::Environment)?);
        for step in tqdm(0..self.cfg.training_steps) {
            // Step Environment
            let epsilon = linear_decay(
                self.cfg.exploration_start,
                self.cfg.exploration_end,
                self.cfg.exploration_decay_steps,
                step,
            );
            let agent = &self.agent;
            let rng = &mut self.rng;
            let (transition, next) = collect_single(&mut self.env, observation.take(), &mut |o| {
                epsilon_greedy(epsilon, &space, agent.a(o), rng)
            })
            .map_err(TrainError::Environment)?;
            observation = Some(next);
            self.memory.push(transition);

            // Update Agent
            if self.memory.len() >= self.cfg.batch_size {
                let batch = self.memory.sample_random_batch(self.cfg.batch_size);
                self.agent = self.agent.update(batch);
            }

            // Evaluate
            if self.cfg.eval_interval > 0 && step % self.cfg.eval_interval == 0 {
                let summary = self.evaluate()?;
                info!(
                    step,
                    epsilon,
                    mean_reward = summary.mean_reward,
                    std_reward = summary.std_reward,
                    mean_length = summary.mean_length,
                    "evaluation"
                );
                report.evaluations.push((step, summary));
            }

            // Checkpoint
            if self.cfg.checkpoint_interval > 0 && (step + 1) % self.cfg.checkpoint_interval == 0 {
                if let Some(path) = self.checkpoint(step + 1)? {
                    report.checkpoints.push(path);
                }
            }
        }

        let summary = self.evaluate()?;
        info!(
            mean_reward = summary.mean_reward,
            std_reward = summary.std_reward,
            "final evaluation"
        );
        report.evaluations.push((self.cfg.training_steps, summary));

        Ok((self.agent, self.env, self.eval_env, report))
    }

    fn evaluate(&mut self) -> Result<EvaluationSummary, TrainError<E::Error>> {
        let agent = &self.agent;
        evaluate(
            &mut self.eval_env,
            &mut |o| agent.a(o),
            self.cfg.eval_episodes.max(1),
        )
        .map_err(TrainError::Environment)
    }

    fn checkpoint(&self, step: u64) -> Result<Option<PathBuf>, TrainError<E::Error>> {
        let Some(dir) = &self.checkpoint_dir else {
            return Ok(None);
        };
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("checkpoint_{step}"));
        self.agent.save(&path)?;
        info!(path = %path.display(), "checkpoint saved");
        Ok(Some(path))
    }
}
