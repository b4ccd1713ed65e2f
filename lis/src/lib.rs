//! Learning core of a remote-controlled reinforcement learning agent fleet.
//!
//! A fixed pool of recurrent actor-critic agents serves many concurrently running
//! simulated environments ("sessions") and learns from them with asynchronous advantage
//! actor-critic (A3C). The repository consists of the following crates:
//!
//! * [`lis_core`] defines the value types of the algorithm, the rollout buffer, the
//!   n-step return estimator and the interface of policy/value models.
//! * [`lis_candle_agent`] implements that interface with an LSTM actor-critic network
//!   on [candle](https://crates.io/crates/candle-core), together with the shared global
//!   model and parameter synchronization.
//! * [`lis_a3c`] has the per-session learner, the agent pool and the request boundary.
//!
//! This crate wires them together with [`build_service`].
mod service;
pub use lis_a3c;
pub use lis_candle_agent;
pub use lis_core;
pub use service::{build_service, A3cService, ServiceConfig};
