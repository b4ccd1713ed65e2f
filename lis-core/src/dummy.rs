//! This module is used for tests.
//!
//! [`DummyModel`] is a scripted [`PolicyValueModel`]: its value estimate is the sum of the
//! observation features, its recurrent state counts inference steps, and every update and
//! pull is logged in a [`DummyLog`] shared with the test.
use crate::{
    error::LisError,
    record::{Record, RecordValue},
    ActionDistribution, Inference, Observation, PolicyValueModel, RecurrentState, SyncModel,
    TrainBatch,
};
use anyhow::Result;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex,
};

/// Calls observed by a [`DummyModel`].
#[derive(Clone, Default)]
pub struct DummyLog {
    updates: Arc<Mutex<Vec<TrainBatch>>>,
    pulls: Arc<AtomicU64>,
    fail_updates: Arc<AtomicBool>,
}

impl DummyLog {
    /// Batches passed to [`PolicyValueModel::update`], in call order.
    pub fn updates(&self) -> Vec<TrainBatch> {
        self.updates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of update calls.
    pub fn n_updates(&self) -> usize {
        self.updates.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Number of [`SyncModel::pull`] calls.
    pub fn n_pulls(&self) -> u64 {
        self.pulls.load(Ordering::SeqCst)
    }

    /// Makes subsequent updates fail with [`LisError::NumericInstability`].
    pub fn set_fail_updates(&self, v: bool) {
        self.fail_updates.store(v, Ordering::SeqCst);
    }
}

/// Scripted policy/value model.
pub struct DummyModel {
    probs: Vec<f32>,
    state_dim: usize,
    log: DummyLog,
}

impl DummyModel {
    /// Uniform policy over `n_actions` with a recurrent state of `state_dim`.
    pub fn new(n_actions: usize, state_dim: usize) -> Self {
        Self {
            probs: vec![1.0 / n_actions as f32; n_actions],
            state_dim,
            log: DummyLog::default(),
        }
    }

    /// Sets the action probabilities returned by every inference.
    pub fn probs(mut self, probs: Vec<f32>) -> Self {
        self.probs = probs;
        self
    }

    /// Shares the call log with another model, e.g., to count updates over a pool.
    pub fn with_log(mut self, log: DummyLog) -> Self {
        self.log = log;
        self
    }

    /// Returns a handle to the call log.
    pub fn log(&self) -> DummyLog {
        self.log.clone()
    }
}

impl PolicyValueModel for DummyModel {
    fn initial_state(&self) -> RecurrentState {
        RecurrentState::zeros(self.state_dim)
    }

    fn infer(&self, obs: &Observation, state: &RecurrentState) -> Result<Inference> {
        let next = |xs: &[f32]| xs.iter().map(|x| x + 1.0).collect::<Vec<_>>();
        Ok(Inference {
            distribution: ActionDistribution::new(self.probs.clone())?,
            value: obs.as_slice().iter().sum(),
            next_state: RecurrentState::new(next(state.h()), next(state.c())),
        })
    }

    fn update(&mut self, batch: &TrainBatch) -> Result<Record> {
        batch.validate()?;
        if self.log.fail_updates.load(Ordering::SeqCst) {
            return Err(LisError::NumericInstability("scripted failure".into()))?;
        }
        let loss = batch.advantages.iter().map(|a| a * a).sum::<f32>() / batch.len() as f32;
        self.log
            .updates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(batch.clone());

        Ok(Record::from_slice(&[
            ("loss", RecordValue::Scalar(loss)),
            ("grad_norm", RecordValue::Scalar(0.0)),
        ]))
    }
}

impl SyncModel for DummyModel {
    fn pull(&mut self) -> Result<u64> {
        Ok(self.log.pulls.fetch_add(1, Ordering::SeqCst))
    }
}
