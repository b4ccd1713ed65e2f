#![warn(missing_docs)]
//! Core types and traits of the lis agent fleet.
//!
//! The crate defines the data handled by an on-policy recurrent actor-critic
//! agent and the seams to the components around it:
//!
//! * [`Observation`], [`RecurrentState`] and [`ActionDistribution`] are the values
//!   flowing through a single inference call of a [`PolicyValueModel`].
//! * [`Transition`]s are collected in a bounded [`RolloutBuffer`] and turned into
//!   a [`TrainBatch`] with [`compute_returns`].
//! * [`SyncModel`] refreshes local parameters of a model from a shared global model.
//! * [`record::Record`] carries scalar information out of training steps.
pub mod error;
pub mod record;

mod base;
pub use base::{
    ActionDistribution, ExperienceBufferBase, Inference, Observation, PolicyValueModel,
    RecurrentState, SyncModel, TrainBatch,
};

mod rollout;
pub use rollout::{
    compute_returns, PendingTransition, RolloutBuffer, RolloutSegment, Transition,
    DEFAULT_GAMMA, DEFAULT_ROLLOUT_LEN,
};

pub mod dummy;
