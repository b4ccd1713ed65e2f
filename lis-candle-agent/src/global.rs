//! Parameters shared by all agents.
use crate::{util::named_vars, LstmActorCritic, LstmActorCriticConfig};
use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Var};
use candle_nn::{VarBuilder, VarMap};
use log::info;
use std::{
    path::Path,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

/// The global model of asynchronous actor-critic.
///
/// Agents read and write the variables of this model without any lock serializing them:
/// a writer may interleave with a reader or with another writer at the granularity of a
/// single variable. The version counter only counts applied updates, it does not guard
/// the variables.
pub struct GlobalModel {
    config: LstmActorCriticConfig,
    device: Device,
    varmap: VarMap,
    vars: Vec<(String, Var)>,
    version: AtomicU64,
}

impl GlobalModel {
    /// Builds a randomly initialized global model.
    pub fn build(config: LstmActorCriticConfig) -> Result<Arc<Self>> {
        let device = config.device.build()?;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let _ = LstmActorCritic::build(vb, &config)?;
        let vars = named_vars(&varmap)?;
        info!(
            "Built global model with {} variables ({} parameters)",
            vars.len(),
            vars.iter().map(|(_, v)| v.elem_count()).sum::<usize>()
        );

        Ok(Arc::new(Self {
            config,
            device,
            varmap,
            vars,
            version: AtomicU64::new(0),
        }))
    }

    /// Configuration of the network.
    pub fn config(&self) -> &LstmActorCriticConfig {
        &self.config
    }

    /// Device on which the variables live.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Variables with their names, sorted by name.
    pub fn vars(&self) -> &[(String, Var)] {
        &self.vars
    }

    /// Number of updates applied so far.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Counts an update applied by an agent and returns the new version.
    pub fn record_update(&self) -> u64 {
        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Saves the variables in safetensors format.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.varmap.save(path)?;
        info!("Saved global model to {:?}", path);
        Ok(())
    }

    /// Overwrites the variables with those in a safetensors file.
    ///
    /// Counts as an update, so agents see a new version on their next pull.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut tensors = candle_core::safetensors::load(path, &self.device)?;
        for (name, var) in self.vars.iter() {
            let t = tensors
                .remove(name)
                .ok_or_else(|| anyhow!("variable {} not found in {:?}", name, path))?;
            var.set(&t)?;
        }
        self.record_update();
        info!("Loaded global model from {:?}", path);
        Ok(())
    }
}
