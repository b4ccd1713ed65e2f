//! Policy/value model interface.
use super::{ActionDistribution, Observation, RecurrentState};
use crate::record::Record;
use anyhow::{ensure, Result};

/// Output of a single inference step.
#[derive(Clone, Debug)]
pub struct Inference {
    /// Distribution over actions.
    pub distribution: ActionDistribution,

    /// Value estimate of the observation.
    pub value: f32,

    /// Recurrent state to be fed with the next observation.
    pub next_state: RecurrentState,
}

/// Inputs of a gradient update, built from one rollout segment.
#[derive(Clone, Debug)]
pub struct TrainBatch {
    /// Observations, in time order.
    pub observations: Vec<Observation>,

    /// Recurrent state fed with the first observation of the segment.
    pub initial_state: RecurrentState,

    /// Actions taken.
    pub actions: Vec<usize>,

    /// Discounted returns.
    pub returns: Vec<f32>,

    /// Advantages, i.e., returns minus value estimates.
    pub advantages: Vec<f32>,
}

impl TrainBatch {
    /// Number of steps in the batch.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Returns `true` if the batch has no step.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Checks that all per-step vectors have the same, non-zero length.
    ///
    /// A failure here is a contract violation of the caller.
    pub fn validate(&self) -> Result<()> {
        let n = self.observations.len();
        ensure!(n > 0, "empty train batch");
        ensure!(
            self.actions.len() == n && self.returns.len() == n && self.advantages.len() == n,
            "mismatched train batch: obs={}, actions={}, returns={}, advantages={}",
            n,
            self.actions.len(),
            self.returns.len(),
            self.advantages.len()
        );
        Ok(())
    }
}

/// A recurrent policy/value function approximator.
///
/// Implementations are used under the relaxed consistency contract of asynchronous
/// actor-critic: many agents infer and update concurrently against one shared set of
/// global parameters without mutual exclusion. An implementation must not take a lock
/// that serializes updates of different agents.
pub trait PolicyValueModel {
    /// Zero recurrent state of the model.
    fn initial_state(&self) -> RecurrentState;

    /// Computes the action distribution, the value estimate and the next recurrent state.
    fn infer(&self, obs: &Observation, state: &RecurrentState) -> Result<Inference>;

    /// Computes gradients on `batch` and applies them to the shared global parameters.
    ///
    /// The returned record has at least the scalar `loss`. If the loss or the gradients
    /// are not finite, the update must not be applied and
    /// [`LisError::NumericInstability`](crate::error::LisError::NumericInstability) is returned.
    fn update(&mut self, batch: &TrainBatch) -> Result<Record>;
}

/// Synchronizes local parameters of a model with the shared global model.
pub trait SyncModel {
    /// Copies every global parameter into the local model.
    ///
    /// The copy is one-directional and not atomic with respect to concurrent updates
    /// of the global model. Returns the number of updates applied to the global model
    /// observed when the copy started.
    fn pull(&mut self) -> Result<u64>;
}
