//! Configuration of [`LstmActorCritic`](super::LstmActorCritic).
use crate::{opt::OptimizerConfig, Device};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`LstmActorCritic`](super::LstmActorCritic) and of its training.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct LstmActorCriticConfig {
    /// Dimension of observations.
    pub obs_dim: usize,

    /// Dimension of the encoder output and of the LSTM state.
    pub hidden_dim: usize,

    /// Number of discrete actions.
    pub n_actions: usize,

    /// Weight of the value loss.
    pub value_coef: f64,

    /// Weight of the entropy bonus.
    pub entropy_coef: f64,

    /// Threshold of the global norm of gradients.
    pub max_grad_norm: f64,

    /// Floor of action probabilities inside logarithms.
    pub prob_epsilon: f32,

    /// Optimizer applying gradients to the global model.
    pub opt_config: OptimizerConfig,

    /// Device.
    pub device: Device,
}

impl Default for LstmActorCriticConfig {
    fn default() -> Self {
        Self {
            obs_dim: 10240,
            hidden_dim: 256,
            n_actions: 3,
            value_coef: 0.5,
            entropy_coef: 0.01,
            max_grad_norm: 40.0,
            prob_epsilon: 1e-20,
            opt_config: OptimizerConfig::default(),
            device: Device::Cpu,
        }
    }
}

impl LstmActorCriticConfig {
    /// Sets the dimension of observations.
    pub fn obs_dim(mut self, v: usize) -> Self {
        self.obs_dim = v;
        self
    }

    /// Sets the dimension of the hidden layer and the LSTM state.
    pub fn hidden_dim(mut self, v: usize) -> Self {
        self.hidden_dim = v;
        self
    }

    /// Sets the number of actions.
    pub fn n_actions(mut self, v: usize) -> Self {
        self.n_actions = v;
        self
    }

    /// Sets the weight of the entropy bonus.
    pub fn entropy_coef(mut self, v: f64) -> Self {
        self.entropy_coef = v;
        self
    }

    /// Sets the threshold of the global gradient norm.
    pub fn max_grad_norm(mut self, v: f64) -> Self {
        self.max_grad_norm = v;
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Sets the device.
    pub fn device(mut self, v: Device) -> Self {
        self.device = v;
        self
    }

    /// Constructs [`LstmActorCriticConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`LstmActorCriticConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
