//! Optimizers.
use anyhow::Result;
use candle_core::{backprop::GradStore, Var};
use candle_nn::Optimizer as _;
use candle_optimisers::{
    adam::{Adam, ParamsAdam},
    rmsprop::{ParamsRMSprop, RMSprop},
};
use serde::{Deserialize, Serialize};

/// Configuration of the optimizer applying gradients to the global model.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum OptimizerConfig {
    /// RMSProp optimizer.
    RmsProp {
        /// Learning rate.
        lr: f64,
        /// Decay of the moving average of squared gradients.
        #[serde(default = "default_alpha")]
        alpha: f64,
        /// Term added to the denominator.
        #[serde(default = "default_eps")]
        eps: f64,
    },

    /// Adam optimizer.
    Adam {
        /// Learning rate.
        lr: f64,
    },
}

fn default_alpha() -> f64 {
    0.99
}

fn default_eps() -> f64 {
    0.1
}

impl OptimizerConfig {
    /// Constructs the optimizer over the given variables.
    pub fn build(&self, vars: Vec<Var>) -> Result<Optimizer> {
        match &self {
            OptimizerConfig::RmsProp { lr, alpha, eps } => {
                let params = ParamsRMSprop {
                    lr: *lr,
                    alpha: *alpha,
                    eps: *eps,
                    ..ParamsRMSprop::default()
                };
                let opt = RMSprop::new(vars, params)?;
                Ok(Optimizer::RmsProp(opt))
            }
            OptimizerConfig::Adam { lr } => {
                let params = ParamsAdam {
                    lr: *lr,
                    ..ParamsAdam::default()
                };
                let opt = Adam::new(vars, params)?;
                Ok(Optimizer::Adam(opt))
            }
        }
    }

    /// Override learning rate.
    pub fn learning_rate(self, lr: f64) -> Self {
        match self {
            Self::RmsProp { alpha, eps, .. } => Self::RmsProp { lr, alpha, eps },
            Self::Adam { .. } => Self::Adam { lr },
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::RmsProp {
            lr: 7e-4,
            alpha: default_alpha(),
            eps: default_eps(),
        }
    }
}

/// Optimizers.
///
/// This is a thin wrapper of optimizers in [`candle_optimisers`].
pub enum Optimizer {
    /// RMSProp optimizer.
    RmsProp(RMSprop),

    /// Adam optimizer.
    Adam(Adam),
}

impl Optimizer {
    /// Applies gradients to the variables of the optimizer.
    ///
    /// Variables without a gradient in `grads` are left unchanged.
    pub fn step(&mut self, grads: &GradStore) -> Result<()> {
        match self {
            Self::RmsProp(opt) => Ok(opt.step(grads)?),
            Self::Adam(opt) => Ok(opt.step(grads)?),
        }
    }
}
