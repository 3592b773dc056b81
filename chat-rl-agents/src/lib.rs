pub mod cli;
pub mod dqn;
pub mod off_policy;
pub mod random;
