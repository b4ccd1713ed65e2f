//! Copy of global parameters into a local model.
use crate::{util::copy_vars, GlobalModel};
use anyhow::Result;
use candle_core::Var;
use log::trace;
use std::sync::Arc;

/// Pulls the parameters of the [`GlobalModel`] into local variables.
///
/// The copy is one-directional and per variable. Updates applied by other agents
/// while the copy is running may be partially visible in the result.
#[derive(Clone)]
pub struct ParameterSync {
    global: Arc<GlobalModel>,
}

impl ParameterSync {
    /// Creates a synchronizer reading from `global`.
    pub fn new(global: Arc<GlobalModel>) -> Self {
        Self { global }
    }

    /// The global model.
    pub fn global(&self) -> &Arc<GlobalModel> {
        &self.global
    }

    /// Overwrites `local` with the global parameters.
    ///
    /// `local` must have the names of the global variables in the same order.
    /// Returns the global version observed before the copy.
    pub fn pull(&self, local: &[(String, Var)]) -> Result<u64> {
        let version = self.global.version();
        copy_vars(local, self.global.vars())?;
        trace!("Pulled global parameters (version {})", version);
        Ok(version)
    }
}
