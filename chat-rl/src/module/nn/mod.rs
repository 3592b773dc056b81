pub mod multi_layer_perceptron;
pub mod target_model;
