use rand::Rng;

pub type Reward = f64;
pub type Done = bool;

/// Result of a single environment transition.
#[derive(Debug, Clone)]
pub struct Step<O, I> {
    pub observation: O,
    pub reward: Reward,
    pub done: Done,
    pub info: I,
}

pub trait Environment {
    type A: Clone;
    type O: Clone;
    type Info;
    type Error: std::error::Error + Send + Sync + 'static;
    type ActionSpace: Space<Element = Self::A>;

    fn action_space(&self) -> &Self::ActionSpace;

    fn reset(&mut self, seed: Option<u64>) -> Result<Self::O, Self::Error>;

    fn step(&mut self, action: Self::A) -> Result<Step<Self::O, Self::Info>, Self::Error>;

    fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub trait Space {
    type Element: Clone;

    fn sample<R: Rng>(&self, rng: &mut R) -> Self::Element;

    fn contains(&self, element: &Self::Element) -> bool;
}

/// Actions that can be enumerated by index, as value-based agents require.
pub trait DiscreteAction: Sized {
    fn count() -> usize;

    fn from_index(index: usize) -> Self;

    fn index(&self) -> usize;
}

/// Observations flattened into network input.
pub trait Features {
    fn features(&self) -> Vec<f32>;
}

impl Features for Vec<f32> {
    fn features(&self) -> Vec<f32> {
        self.clone()
    }
}

pub mod chat;
pub mod simple;
pub mod spaces;
