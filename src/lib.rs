pub mod arms;
pub mod config;
pub mod errors;
pub mod evaluator;
pub mod multiplayer;
pub mod policies;
pub mod rng;
