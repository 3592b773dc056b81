use burn::module::Module;
use burn::nn::{LeakyRelu, LeakyReluConfig, Linear, LinearConfig};
use burn::prelude::*;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("expected layer sizes (input, hidden.., output), got {0:?}")]
    TooFewLayers(Vec<usize>),
    #[error("layer {index} has size zero")]
    EmptyLayer { index: usize },
}

#[derive(Config, Debug)]
pub struct MultiLayerPerceptronConfig {
    /// Input size, hidden sizes, then output size.
    pub sizes: Vec<usize>,
}

#[derive(Module, Debug)]
pub struct MultiLayerPerceptron<B: Backend> {
    linear_layers: Vec<Linear<B>>,
    activation: LeakyRelu,
}

impl MultiLayerPerceptronConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.sizes.len() < 2 {
            return Err(ModelError::TooFewLayers(self.sizes.clone()));
        }
        match self.sizes.iter().position(|size| *size == 0) {
            Some(index) => Err(ModelError::EmptyLayer { index }),
            None => Ok(()),
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<MultiLayerPerceptron<B>, ModelError> {
        self.validate()?;
        let linear_layers = self
            .sizes
            .windows(2)
            .map(|pair| LinearConfig::new(pair[0], pair[1]).init(device))
            .collect();
        Ok(MultiLayerPerceptron {
            linear_layers,
            activation: LeakyReluConfig::new().init(),
        })
    }
}

impl<B: Backend> MultiLayerPerceptron<B> {
    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        let mut x = input;

        match self.linear_layers.split_last() {
            Some((output, hidden)) => {
                for layer in hidden {
                    x = layer.forward(x);
                    x = self.activation.forward(x);
                }
                output.forward(x)
            }
            None => x,
        }
    }
}
