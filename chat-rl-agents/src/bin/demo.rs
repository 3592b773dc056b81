use std::thread::sleep;
use std::time::Duration;

use anyhow::Context;
use chat_rl::environment::{
    chat::{ChatAction, RenderMode},
    simple::SimpleAction,
    Environment,
};
use chat_rl_agents::{
    cli::{init_tracing, EnvArgs, EnvKind},
    random::RandomAgent,
};
use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};

/// Run one episode of random actions and print every step.
#[derive(Debug, Parser)]
struct Cli {
    #[command(flatten)]
    env: EnvArgs,
    #[arg(long, default_value_t = 20)]
    steps: u64,
    /// Pause between steps.
    #[arg(long, default_value_t = 500)]
    delay_ms: u64,
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    match cli.env.env {
        EnvKind::Simple => {
            let mut env = cli.env.simple_config().init();
            run(&mut env, &cli, |a: &SimpleAction| a.to_string(), |_| None)
        }
        EnvKind::Chat => {
            let cfg = cli.env.chat_config()?;
            println!("Connecting to {} ...", cfg.backend_url);
            let mut env = cfg.init().context("failed to start chat environment")?;
            run(
                &mut env,
                &cli,
                |a: &ChatAction| format!("{} (target {}, emoji {})", a.action_type, a.target_id, a.emoji),
                |env| env.render(RenderMode::Ansi),
            )
        }
    }
}

fn run<E, D, R>(env: &mut E, cli: &Cli, describe: D, render: R) -> anyhow::Result<()>
where
    E: Environment,
    E::ActionSpace: Clone,
    D: Fn(&E::A) -> String,
    R: Fn(&E) -> Option<String>,
{
    println!("=== Chat RL demo: {} random steps ===", cli.steps);
    let mut agent = RandomAgent::new(env.action_space().clone(), StdRng::seed_from_u64(cli.seed));
    let mut observation = env.reset(Some(cli.seed))?;
    let mut total_reward = 0.0;

    for n in 1..=cli.steps {
        let action = agent.act(&observation);
        let label = describe(&action);
        let step = env.step(action)?;
        total_reward += step.reward;
        println!("Step {n:>3}: {label:<40} reward {:+.3}", step.reward);
        if let Some(frame) = render(env) {
            println!("          {frame}");
        }
        observation = step.observation;
        if step.done {
            println!("Episode finished after {n} steps");
            break;
        }
        sleep(Duration::from_millis(cli.delay_ms));
    }

    println!("Total reward: {total_reward:.3}");
    env.close()?;
    Ok(())
}
