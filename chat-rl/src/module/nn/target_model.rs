use burn::{
    module::{ModuleMapper, ModuleVisitor, ParamId},
    prelude::*,
};
use std::{any::Any, collections::HashMap, marker::PhantomData};

/// An online model paired with a slowly tracking target copy.
#[derive(Module, Debug)]
pub struct WithTarget<B: Backend, T: Module<B>> {
    pub model: T,
    pub target: T,
    backend: PhantomData<B>,
}

struct SoftUpdater<B: Backend> {
    model_tensor_map: HashMap<ParamId, Box<dyn Any + Send>>, // Online parameters by id
    tau: f64,
    backend: PhantomData<B>,
}

impl<B: Backend> ModuleVisitor<B> for SoftUpdater<B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, tensor: &Tensor<B, D>) {
        self.model_tensor_map
            .insert(id, Box::new(tensor.clone().detach()));
    }
}

impl<B: Backend> ModuleMapper<B> for SoftUpdater<B> {
    fn map_float<const D: usize>(&mut self, id: ParamId, tensor: Tensor<B, D>) -> Tensor<B, D> {
        let model_tensor = self
            .model_tensor_map
            .remove(&id)
            .and_then(|item| item.downcast::<Tensor<B, D>>().ok());
        match model_tensor {
            Some(model_tensor) => tensor * (1.0 - self.tau) + *model_tensor * self.tau,
            // Parameters without an online counterpart are left untouched.
            None => tensor,
        }
    }
}

impl<B: Backend, T: Module<B>> WithTarget<B, T> {
    pub fn init(model: T) -> Self {
        let target = model.clone();
        WithTarget {
            model,
            target,
            backend: PhantomData,
        }
    }

    /// Polyak update `target = (1 - tau) * target + tau * model`; `tau = 1`
    /// copies the online weights.
    pub fn update_target_model(self, tau: f64) -> Self {
        let mut updater: SoftUpdater<B> = SoftUpdater {
            model_tensor_map: HashMap::new(),
            tau,
            backend: PhantomData,
        };
        self.model.visit(&mut updater);
        let target = self.target.map(&mut updater);
        WithTarget {
            model: self.model,
            target,
            backend: PhantomData,
        }
    }
}
