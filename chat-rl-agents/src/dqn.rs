use std::marker::PhantomData;
use std::path::Path;

use burn::{
    module::AutodiffModule,
    nn::loss::Reduction,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    record::{CompactRecorder, RecorderError},
    tensor::backend::AutodiffBackend,
};
use chat_rl::{
    data::util::Transition,
    environment::{DiscreteAction, Features},
    module::{
        component::{Actor, Critic, Value},
        nn::{
            multi_layer_perceptron::{ModelError, MultiLayerPerceptron, MultiLayerPerceptronConfig},
            target_model::WithTarget,
        },
    },
    objective::dqn::{DeepQNetworkLoss, DeepQNetworkLossConfig, DiscountFactorError},
};
use thiserror::Error;
use tracing::debug;

use crate::off_policy::OffPolicyAgent;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Loss(#[from] DiscountFactorError),
}

/// Maps flattened observation features to one value per discrete action.
#[derive(Module, Debug)]
pub struct QNetwork<B: Backend> {
    mlp: MultiLayerPerceptron<B>,
}

impl<B: Backend> QNetwork<B> {
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        self.mlp.forward(features)
    }
}

impl<B: Backend> Critic<B> for QNetwork<B> {
    type OBatch = Tensor<B, 2>;
    type ABatch = Tensor<B, 2, Int>;

    fn q_batch(&self, observations: &Self::OBatch, actions: &Self::ABatch) -> Tensor<B, 1> {
        self.forward(observations.clone())
            .gather(1, actions.clone())
            .squeeze(1)
    }
}

impl<B: Backend> Value<B> for QNetwork<B> {
    type OBatch = Tensor<B, 2>;

    fn v_batch(&self, observations: &Self::OBatch) -> Tensor<B, 1> {
        self.forward(observations.clone()).max_dim(1).squeeze(1)
    }
}

#[derive(Config, Debug)]
pub struct DeepQNetworkAgentConfig {
    #[config(default = "vec![128, 64]")]
    pub hidden_sizes: Vec<usize>,
    #[config(default = 0.003)]
    pub learning_rate: f64,
    #[config(default = 0.99)]
    pub discount_factor: f64,
    /// Number of updates between target network syncs.
    #[config(default = 100)]
    pub target_update_interval: u64,
    #[config(default = 1.0)]
    pub tau: f64,
}

impl DeepQNetworkAgentConfig {
    pub fn init_network<B: Backend>(
        &self,
        n_features: usize,
        n_actions: usize,
        device: &B::Device,
    ) -> Result<QNetwork<B>, ModelError> {
        let mut sizes = Vec::with_capacity(self.hidden_sizes.len() + 2);
        sizes.push(n_features);
        sizes.extend_from_slice(&self.hidden_sizes);
        sizes.push(n_actions);
        let mlp = MultiLayerPerceptronConfig::new(sizes).init(device)?;
        Ok(QNetwork { mlp })
    }

    pub fn init<B, O, A, Opt>(
        &self,
        n_features: usize,
        optim: Opt,
        device: &B::Device,
    ) -> Result<DeepQNetworkAgent<B, O, A, Opt>, AgentError>
    where
        B: AutodiffBackend,
        A: DiscreteAction,
        Opt: Optimizer<QNetwork<B>, B>,
    {
        let network = self.init_network(n_features, A::count(), device)?;
        let loss = DeepQNetworkLossConfig::new()
            .with_discount_factor(self.discount_factor)
            .init()?;
        Ok(DeepQNetworkAgent {
            cfg: self.clone(),
            dqn_model: WithTarget::init(network),
            update_counter: 0,
            loss,
            optim,
            device: device.clone(),
            _phantom: PhantomData,
        })
    }
}

pub struct DeepQNetworkAgent<B, O, A, Opt>
where
    B: AutodiffBackend,
    Opt: Optimizer<QNetwork<B>, B>,
{
    cfg: DeepQNetworkAgentConfig,
    dqn_model: WithTarget<B, QNetwork<B>>,
    update_counter: u64,
    loss: DeepQNetworkLoss,
    optim: Opt,
    device: B::Device,
    _phantom: PhantomData<(O, A)>,
}

impl<B, O, A, Opt> DeepQNetworkAgent<B, O, A, Opt>
where
    B: AutodiffBackend,
    O: Features,
    A: DiscreteAction,
    Opt: Optimizer<QNetwork<B>, B>,
{
    pub fn config(&self) -> &DeepQNetworkAgentConfig {
        &self.cfg
    }

    pub fn network(&self) -> &WithTarget<B, QNetwork<B>> {
        &self.dqn_model
    }

    pub fn updates(&self) -> u64 {
        self.update_counter
    }

    /// Q-values of the online network, one row per observation.
    pub fn q_values(&self, observations: &[&O]) -> Tensor<B::InnerBackend, 2> {
        let features = features_tensor::<B::InnerBackend, O>(observations, &self.device);
        self.dqn_model.model.valid().forward(features)
    }

    /// Writes the online network weights next to `path`.
    pub fn save(&self, path: &Path) -> Result<(), RecorderError> {
        self.dqn_model
            .model
            .clone()
            .save_file(path.to_path_buf(), &CompactRecorder::new())
    }

    pub fn load(mut self, path: &Path) -> Result<Self, RecorderError> {
        let model = self.dqn_model.model.clone().load_file(
            path.to_path_buf(),
            &CompactRecorder::new(),
            &self.device,
        )?;
        self.dqn_model = WithTarget::init(model);
        Ok(self)
    }
}

// Rows of flattened features; observations are expected to share a length.
fn features_tensor<B: Backend, O: Features>(observations: &[&O], device: &B::Device) -> Tensor<B, 2> {
    let n = observations.len();
    let rows: Vec<f32> = observations.iter().flat_map(|o| o.features()).collect();
    let dim = if n == 0 { 0 } else { rows.len() / n };
    Tensor::from_data(TensorData::new(rows, [n, dim]), device)
}

impl<B, O, A, Opt> Actor for DeepQNetworkAgent<B, O, A, Opt>
where
    B: AutodiffBackend,
    O: Features,
    A: DiscreteAction,
    Opt: Optimizer<QNetwork<B>, B>,
{
    type O = O;
    type A = A;

    /// Greedy action with respect to the online network.
    fn a(&self, observation: &O) -> A {
        let index = self
            .q_values(&[observation])
            .argmax(1)
            .into_scalar()
            .elem::<i64>();
        A::from_index(index.max(0) as usize)
    }
}

impl<B, O, A, Opt> OffPolicyAgent<B, Vec<Transition<O, A>>> for DeepQNetworkAgent<B, O, A, Opt>
where
    B: AutodiffBackend,
    O: Features,
    A: DiscreteAction,
    Opt: Optimizer<QNetwork<B>, B>,
{
    fn update(mut self, batch: Vec<Transition<O, A>>) -> Self {
        if batch.is_empty() {
            return self;
        }
        self.update_counter += 1;

        // Transform data from batch
        let n = batch.len();
        let before: Vec<&O> = batch.iter().map(|t| &t.before).collect();
        let after: Vec<&O> = batch.iter().map(|t| &t.after).collect();
        let before = features_tensor::<B, O>(&before, &self.device);
        let after = features_tensor::<B, O>(&after, &self.device);
        let action = Tensor::<B, 2, Int>::from_data(
            TensorData::new(
                batch.iter().map(|t| t.action.index() as i64).collect::<Vec<_>>(),
                [n, 1],
            ),
            &self.device,
        );
        let reward = Tensor::<B, 1>::from_data(
            TensorData::new(
                batch.iter().map(|t| t.reward as f32).collect::<Vec<_>>(),
                [n],
            ),
            &self.device,
        );
        let done = Tensor::<B, 1, Bool>::from_bool(
            TensorData::new(batch.iter().map(|t| t.done).collect::<Vec<_>>(), [n]),
            &self.device,
        );

        // Update model
        let loss = self.loss.forward(
            &self.dqn_model,
            &before,
            &action,
            &after,
            reward,
            done,
            Reduction::Mean,
        );
        debug!(
            update = self.update_counter,
            loss = loss.clone().into_scalar().elem::<f64>(),
            "dqn update"
        );

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.dqn_model.model);
        self.dqn_model.model = self
            .optim
            .step(self.cfg.learning_rate, self.dqn_model.model, grads);

        // Update target network
        if self.update_counter % self.cfg.target_update_interval.max(1) == 0 {
            self.dqn_model = self.dqn_model.update_target_model(self.cfg.tau);
        }

        self
    }

    fn save(&self, path: &Path) -> Result<(), RecorderError> {
        DeepQNetworkAgent::save(self, path)
    }
}
