use anyhow::Result;
use lis_a3c::{AgentCoreConfig, AgentPool, AgentPoolConfig, SessionService};
use lis_candle_agent::{A3cModel, GlobalModel, LstmActorCriticConfig};
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
    sync::Arc,
};

/// Session service whose agents run [`A3cModel`]s.
pub type A3cService = SessionService<A3cModel>;

/// Configuration of a whole service.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ServiceConfig {
    /// Agent pool.
    pub pool: AgentPoolConfig,

    /// Learner of each agent.
    pub agent: AgentCoreConfig,

    /// Network and its optimizer.
    pub model: LstmActorCriticConfig,
}

impl ServiceConfig {
    /// Sets the configuration of the agent pool.
    pub fn pool(mut self, v: AgentPoolConfig) -> Self {
        self.pool = v;
        self
    }

    /// Sets the configuration of agents.
    pub fn agent(mut self, v: AgentCoreConfig) -> Self {
        self.agent = v;
        self
    }

    /// Sets the configuration of the model.
    pub fn model(mut self, v: LstmActorCriticConfig) -> Self {
        self.model = v;
        self
    }

    /// Constructs [`ServiceConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ServiceConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Builds the global model and a warmed-up service whose agents share it.
///
/// The global model is returned for checkpointing with
/// [`GlobalModel::save`] and [`GlobalModel::load`].
pub fn build_service(config: &ServiceConfig) -> Result<(A3cService, Arc<GlobalModel>)> {
    let global = GlobalModel::build(config.model.clone())?;
    let pool = AgentPool::build(&config.pool, &config.agent, |_| {
        A3cModel::build(global.clone())
    })?;
    info!("Service is ready with {} agents", pool.len());

    Ok((SessionService::new(pool), global))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lis_candle_agent::opt::OptimizerConfig;
    use tempdir::TempDir;

    #[test]
    fn test_serde_service_config() -> Result<()> {
        let config = ServiceConfig::default()
            .pool(AgentPoolConfig::new(8))
            .agent(AgentCoreConfig::default().rollout_len(10))
            .model(
                LstmActorCriticConfig::default()
                    .obs_dim(32)
                    .opt_config(OptimizerConfig::default().learning_rate(1e-3)),
            );
        let dir = TempDir::new("service_config")?;
        let path = dir.path().join("service.yaml");

        config.save(&path)?;
        assert_eq!(ServiceConfig::load(&path)?, config);
        Ok(())
    }
}
