use tracing::debug;

use crate::environment::{Environment, Step};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeStats {
    pub reward: f64,
    pub length: u64,
}

/// Runs one full episode under `policy` from a seeded reset.
pub fn evaluate_episode<E, P>(env: &mut E, policy: &mut P, seed: u64) -> Result<EpisodeStats, E::Error>
where
    E: Environment,
    P: FnMut(&E::O) -> E::A,
{
    let mut stats = EpisodeStats {
        reward: 0.0,
        length: 0,
    };
    let mut before = env.reset(Some(seed))?;
    loop {
        let action = policy(&before);
        let Step {
            observation,
            reward,
            done,
            ..
        } = env.step(action)?;
        stats.reward += reward;
        stats.length += 1;
        before = observation;
        if done {
            break;
        }
    }
    debug!(seed, reward = stats.reward, length = stats.length, "episode evaluated");
    Ok(stats)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationSummary {
    pub episodes: usize,
    pub mean_reward: f64,
    pub std_reward: f64,
    pub mean_length: f64,
    pub std_length: f64,
}

impl EvaluationSummary {
    pub fn from_episodes(episodes: &[EpisodeStats]) -> Self {
        let rewards: Vec<f64> = episodes.iter().map(|e| e.reward).collect();
        let lengths: Vec<f64> = episodes.iter().map(|e| e.length as f64).collect();
        let (mean_reward, std_reward) = mean_std(&rewards);
        let (mean_length, std_length) = mean_std(&lengths);
        EvaluationSummary {
            episodes: episodes.len(),
            mean_reward,
            std_reward,
            mean_length,
            std_length,
        }
    }
}

/// Population mean and standard deviation; zeros for an empty slice.
fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Evaluates `n_episodes` episodes seeded `0..n_episodes`.
pub fn evaluate<E, P>(env: &mut E, policy: &mut P, n_episodes: u64) -> Result<EvaluationSummary, E::Error>
where
    E: Environment,
    P: FnMut(&E::O) -> E::A,
{
    let episodes = (0..n_episodes)
        .map(|seed| evaluate_episode(env, policy, seed))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(EvaluationSummary::from_episodes(&episodes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::simple::{SimpleAction, SimpleEnvironmentConfig};

    #[test]
    fn test_evaluate_episode() {
        let mut env = SimpleEnvironmentConfig::new().with_max_steps(10).init();
        let stats = evaluate_episode(&mut env, &mut |_| SimpleAction::CreateChannel, 0).unwrap();
        assert_eq!(stats, EpisodeStats { reward: 20.0, length: 10 });
    }

    #[test]
    fn test_summary() {
        let summary = EvaluationSummary::from_episodes(&[
            EpisodeStats { reward: 1.0, length: 4 },
            EpisodeStats { reward: 3.0, length: 4 },
        ]);
        assert_eq!(summary.episodes, 2);
        assert_eq!(summary.mean_reward, 2.0);
        assert_eq!(summary.std_reward, 1.0);
        assert_eq!(summary.mean_length, 4.0);
        assert_eq!(summary.std_length, 0.0);

        let empty = EvaluationSummary::from_episodes(&[]);
        assert_eq!(empty.mean_reward, 0.0);
    }

    #[test]
    fn test_evaluate_alternating_policy() {
        let mut env = SimpleEnvironmentConfig::new().with_max_steps(4).init();
        let mut flip = false;
        let summary = evaluate(
            &mut env,
            &mut |_| {
                flip = !flip;
                if flip {
                    SimpleAction::SendMessage
                } else {
                    SimpleAction::Idle
                }
            },
            3,
        )
        .unwrap();
        assert_eq!(summary.episodes, 3);
        assert!((summary.mean_reward - 1.8).abs() < 1e-9);
        assert!(summary.std_reward < 1e-9);
    }
}
