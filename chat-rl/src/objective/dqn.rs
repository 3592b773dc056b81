use burn::{
    config::Config,
    module::Module,
    nn::loss::Reduction,
    prelude::Backend,
    tensor::{Bool, Tensor},
};
use thiserror::Error;

use super::temporal_difference::temporal_difference;
use crate::module::{
    component::{Critic, Value},
    nn::target_model::WithTarget,
};

#[derive(Debug, Error, PartialEq)]
#[error("the discount factor should be in the interval [0,1], got {0}")]
pub struct DiscountFactorError(pub f64);

#[derive(Config, Debug)]
pub struct DeepQNetworkLossConfig {
    #[config(default = 0.99)]
    pub discount_factor: f64,
}

impl DeepQNetworkLossConfig {
    pub fn init(&self) -> Result<DeepQNetworkLoss, DiscountFactorError> {
        if !(0.0..=1.0).contains(&self.discount_factor) {
            return Err(DiscountFactorError(self.discount_factor));
        }
        Ok(DeepQNetworkLoss {
            discount_factor: self.discount_factor,
        })
    }
}

/// Squared one-step TD error, bootstrapped from the target network.
#[derive(Clone, Debug)]
pub struct DeepQNetworkLoss {
    discount_factor: f64,
}

impl DeepQNetworkLoss {
    pub fn discount_factor(&self) -> f64 {
        self.discount_factor
    }

    #[allow(clippy::too_many_arguments)]
    pub fn forward<B, M>(
        &self,
        model: &WithTarget<B, M>,
        before: &<M as Critic<B>>::OBatch,
        action: &<M as Critic<B>>::ABatch,
        after: &<M as Value<B>>::OBatch,
        reward: Tensor<B, 1>,
        done: Tensor<B, 1, Bool>,
        reduction: Reduction,
    ) -> Tensor<B, 1>
    where
        B: Backend,
        M: Module<B> + Critic<B> + Value<B>,
    {
        let q = model.model.q_batch(before, action);
        let v_after = model.target.v_batch(after).detach();
        let td = temporal_difference(reward, q, v_after, done, self.discount_factor);
        let squared = td.powf_scalar(2.0);
        match reduction {
            Reduction::Sum => squared.sum(),
            Reduction::Mean | Reduction::Auto => squared.mean(),
        }
    }
}
