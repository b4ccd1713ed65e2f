use anyhow::Result;
use lis_core::{DEFAULT_GAMMA, DEFAULT_ROLLOUT_LEN};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`AgentCore`](super::AgentCore).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct AgentCoreConfig {
    /// Number of transitions in a rollout segment, `N` of n-step returns.
    pub rollout_len: usize,

    /// Discount factor.
    pub gamma: f32,

    /// Seed of action sampling. Each agent adds its id to it.
    pub seed: u64,
}

impl Default for AgentCoreConfig {
    fn default() -> Self {
        Self {
            rollout_len: DEFAULT_ROLLOUT_LEN,
            gamma: DEFAULT_GAMMA,
            seed: 42,
        }
    }
}

impl AgentCoreConfig {
    /// Sets the length of rollout segments.
    pub fn rollout_len(mut self, v: usize) -> Self {
        self.rollout_len = v;
        self
    }

    /// Sets the discount factor.
    pub fn gamma(mut self, v: f32) -> Self {
        self.gamma = v;
        self
    }

    /// Sets the seed of action sampling.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Constructs [`AgentCoreConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`AgentCoreConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
