use crate::environment::{Environment, Step};

#[derive(Debug, Clone)]
pub struct Transition<O, A> {
    pub before: O,
    pub action: A,
    pub after: O,
    pub reward: f64,
    pub done: bool,
}

/// Rolls `policy` through `env` for `n_steps`, resetting whenever an
/// episode ends. Starts from `observation` if given, otherwise resets first.
pub fn collect_multiple<E, P>(
    env: &mut E,
    observation: Option<E::O>,
    policy: &mut P,
    n_steps: usize,
) -> Result<Vec<Transition<E::O, E::A>>, E::Error>
where
    E: Environment,
    P: FnMut(&E::O) -> E::A,
{
    let mut before = match observation {
        Some(observation) => observation,
        None => env.reset(None)?,
    };
    let mut result = Vec::with_capacity(n_steps);
    for _ in 0..n_steps {
        let action = policy(&before);
        let Step {
            observation: after,
            reward,
            done,
            ..
        } = env.step(action.clone())?;
        let next = if done { env.reset(None)? } else { after.clone() };
        result.push(Transition {
            before,
            action,
            after,
            reward,
            done,
        });
        before = next;
    }
    Ok(result)
}

/// Single step version of [`collect_multiple`]. The returned observation is
/// the one to continue from, which differs from `after` when the episode
/// ended.
pub fn collect_single<E, P>(
    env: &mut E,
    observation: Option<E::O>,
    policy: &mut P,
) -> Result<(Transition<E::O, E::A>, E::O), E::Error>
where
    E: Environment,
    P: FnMut(&E::O) -> E::A,
{
    let before = match observation {
        Some(observation) => observation,
        None => env.reset(None)?,
    };
    let action = policy(&before);
    let step = env.step(action.clone())?;
    let next = if step.done {
        env.reset(None)?
    } else {
        step.observation.clone()
    };
    let transition = Transition {
        before,
        action,
        after: step.observation,
        reward: step.reward,
        done: step.done,
    };
    Ok((transition, next))
}
