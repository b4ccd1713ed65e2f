//! Recurrent actor-critic network.
mod base;
mod config;
pub use base::LstmActorCritic;
pub use config::LstmActorCriticConfig;
