use std::path::PathBuf;

use anyhow::Context;
use burn::{
    backend::{Autodiff, NdArray},
    config::Config,
    optim::AdamConfig,
};
use chat_rl::{
    data::memory::RingbufferMemory,
    environment::{
        chat::ChatObservation, simple::OBSERVATION_DIM, DiscreteAction, Environment, Features,
    },
    logging::{evaluate, EvaluationSummary},
    module::component::Actor,
};
use chat_rl_agents::{
    cli::{init_tracing, EnvArgs, EnvKind},
    dqn::DeepQNetworkAgentConfig,
    off_policy::OffPolicyAlgorithmConfig,
    random::RandomAgent,
};
use clap::Parser;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::info;

/// Train a Deep Q-Network agent on one of the chat environments.
#[derive(Debug, Parser)]
struct Cli {
    #[command(flatten)]
    env: EnvArgs,
    #[arg(long, default_value_t = 10_000)]
    timesteps: u64,
    #[arg(long, default_value_t = 32)]
    batch_size: usize,
    #[arg(long, default_value_t = 5)]
    eval_episodes: u64,
    #[arg(long, default_value_t = 1_000)]
    early_start_steps: u64,
    #[arg(long, default_value_t = 10_000)]
    memory_capacity: usize,
    /// Save a checkpoint every N steps; 0 disables.
    #[arg(long, default_value_t = 0)]
    checkpoint_interval: u64,
    /// Evaluate a random agent against the trained one.
    #[arg(long)]
    compare: bool,
    #[arg(long, default_value = "models")]
    model_dir: PathBuf,
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    match cli.env.env {
        EnvKind::Simple => {
            let cfg = cli.env.simple_config();
            run(&cli, || Ok(cfg.init()), OBSERVATION_DIM)
        }
        EnvKind::Chat => {
            let cfg = cli.env.chat_config()?;
            let n_features = ChatObservation::feature_len(cfg.embedding_dim);
            run(
                &cli,
                || cfg.init().context("failed to start chat environment"),
                n_features,
            )
        }
    }
}

fn run<E, F>(cli: &Cli, mut make_env: F, n_features: usize) -> anyhow::Result<()>
where
    E: Environment,
    E::O: Features,
    E::A: DiscreteAction,
    E::ActionSpace: Clone,
    F: FnMut() -> anyhow::Result<E>,
{
    type B = Autodiff<NdArray>;
    let device = Default::default();
    let mut rng = StdRng::seed_from_u64(cli.seed);
    std::fs::create_dir_all(&cli.model_dir)
        .with_context(|| format!("failed to create {}", cli.model_dir.display()))?;

    let agent_cfg = DeepQNetworkAgentConfig::new();
    let agent = agent_cfg.init::<B, E::O, E::A, _>(n_features, AdamConfig::new().init(), &device)?;
    let memory = RingbufferMemory::new(cli.memory_capacity, StdRng::seed_from_u64(rng.gen()));
    let algorithm_cfg = OffPolicyAlgorithmConfig::new(cli.timesteps, cli.batch_size)
        .with_early_start_steps(cli.early_start_steps)
        .with_eval_episodes(cli.eval_episodes)
        .with_checkpoint_interval(cli.checkpoint_interval);

    println!("Running Deep Q-Learning Agent");
    info!(
        env = ?cli.env.env,
        timesteps = cli.timesteps,
        batch_size = cli.batch_size,
        n_features,
        "starting training"
    );
    let (agent, mut env, mut eval_env, report) = algorithm_cfg
        .init::<_, B, _, _, _>(
            make_env()?,
            make_env()?,
            agent,
            memory,
            StdRng::seed_from_u64(rng.gen()),
        )
        .with_checkpoint_dir(cli.model_dir.clone())
        .train()?;

    let model_path = cli.model_dir.join("dqn_final");
    agent.save(&model_path)?;
    agent_cfg.save(cli.model_dir.join("agent_config.json"))?;
    algorithm_cfg.save(cli.model_dir.join("training_config.json"))?;
    println!("Saved model to {}", model_path.display());

    for (step, summary) in &report.evaluations {
        print_summary(&format!("step {step}"), summary);
    }

    if cli.compare {
        let mut random = RandomAgent::new(
            eval_env.action_space().clone(),
            StdRng::seed_from_u64(rng.gen()),
        );
        let random_summary = evaluate(&mut eval_env, &mut |o| random.act(o), cli.eval_episodes)?;
        let dqn_summary = evaluate(&mut eval_env, &mut |o| agent.a(o), cli.eval_episodes)?;
        println!("\n=== Comparison over {} episodes ===", cli.eval_episodes);
        print_summary("dqn", &dqn_summary);
        print_summary("random", &random_summary);
        println!(
            "Improvement: {:+.3}",
            dqn_summary.mean_reward - random_summary.mean_reward
        );
    }

    env.close()?;
    eval_env.close()?;
    Ok(())
}

fn print_summary(label: &str, summary: &EvaluationSummary) {
    println!(
        "{label:>12}: reward {:.3} +/- {:.3}, length {:.1}",
        summary.mean_reward, summary.std_reward, summary.mean_length
    );
}
