pub mod dqn;
pub mod temporal_difference;
