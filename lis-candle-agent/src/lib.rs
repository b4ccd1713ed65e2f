//! Recurrent actor-critic model implemented with [candle](https://crates.io/crates/candle-core).
//!
//! A single [`GlobalModel`] holds the parameters shared by all agents. Every agent owns an
//! [`A3cModel`], a local copy of the network used for inference and gradient computation.
//! Gradients of the local copy are clipped and applied to the global parameters, after
//! which the agent refreshes its local copy with [`ParameterSync`].
mod actor_critic;
mod global;
mod model;
pub mod opt;
mod sync;
pub mod util;
pub use actor_critic::{LstmActorCritic, LstmActorCriticConfig};
pub use global::GlobalModel;
pub use model::A3cModel;
pub use sync::ParameterSync;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support serialization.
pub enum Device {
    /// The main CPU device.
    Cpu,

    /// The main GPU device.
    Cuda(usize),
}

impl Default for Device {
    fn default() -> Self {
        Self::Cpu
    }
}

impl Device {
    /// Creates the candle device.
    pub fn build(&self) -> Result<candle_core::Device> {
        Ok(match self {
            Self::Cpu => candle_core::Device::Cpu,
            Self::Cuda(n) => candle_core::Device::new_cuda(*n)?,
        })
    }
}
