use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`AgentPool`](super::AgentPool).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AgentPoolConfig {
    /// Number of agents created at warm-up.
    ///
    /// This is the maximum number of sessions served by the pool.
    pub n_workers: usize,
}

impl Default for AgentPoolConfig {
    fn default() -> Self {
        Self { n_workers: 4 }
    }
}

impl AgentPoolConfig {
    /// Creates a configuration with `n_workers` agents.
    pub fn new(n_workers: usize) -> Self {
        Self { n_workers }
    }

    /// Constructs [`AgentPoolConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`AgentPoolConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
