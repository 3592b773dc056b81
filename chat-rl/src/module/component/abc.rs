use burn::{prelude::Backend, tensor::Tensor};

/// Action-value estimates for a batch of observation/action pairs.
pub trait Critic<B: Backend> {
    type OBatch;
    type ABatch;

    fn q_batch(&self, observations: &Self::OBatch, actions: &Self::ABatch) -> Tensor<B, 1>;
}

pub trait Actor {
    type A; // Action
    type O; // Observation

    fn a(&self, observation: &Self::O) -> Self::A;
}

/// State-value estimates for a batch of observations.
pub trait Value<B: Backend> {
    type OBatch;

    fn v_batch(&self, observations: &Self::OBatch) -> Tensor<B, 1>;
}
