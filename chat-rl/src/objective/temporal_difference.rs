use burn::{
    prelude::Backend,
    tensor::{Bool, Tensor},
};

/// One-step TD error `Q(s, a) - (r + gamma * V(s') * (1 - done))`.
pub fn temporal_difference<B: Backend>(
    reward: Tensor<B, 1>,
    pred_value_given_action_before: Tensor<B, 1>,
    pred_value_after: Tensor<B, 1>,
    done: Tensor<B, 1, Bool>,
    discount_factor: f64,
) -> Tensor<B, 1> {
    let not_done = done.bool_not().float();
    let trajectory_value_before = reward + not_done * pred_value_after * discount_factor;
    pred_value_given_action_before - trajectory_value_before
}

#[cfg(test)]
mod tests {
    use burn::{backend::NdArray, tensor::TensorData};

    use super::*;

    #[test]
    fn test_terminal_states_drop_bootstrap() {
        let device = &Default::default();
        let reward = Tensor::<NdArray, 1>::from_floats([1.0, 1.0], device);
        let q = Tensor::<NdArray, 1>::from_floats([3.0, 3.0], device);
        let v_after = Tensor::<NdArray, 1>::from_floats([4.0, 4.0], device);
        let done = Tensor::<NdArray, 1, Bool>::from_bool(TensorData::from([false, true]), device);
        let td = temporal_difference(reward, q, v_after, done, 0.5);
        let td: Vec<f32> = td.into_data().to_vec().unwrap();
        assert_eq!(td, vec![0.0, 2.0]);
    }
}
