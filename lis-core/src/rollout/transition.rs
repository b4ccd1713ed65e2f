use super::compute_returns;
use crate::{Observation, RecurrentState, TrainBatch};
use anyhow::{ensure, Result};

/// One step of experience.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    /// Observation the action was chosen on.
    pub observation: Observation,

    /// Action taken.
    pub action: usize,

    /// Reward received for the action.
    pub reward: f32,

    /// Value estimate of the observation at the time of acting.
    pub value: f32,

    /// Recurrent state fed to the model together with `observation`.
    pub recurrent_state: RecurrentState,
}

/// The last inference of an agent, waiting for its reward.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingTransition {
    /// Observation the action was chosen on.
    pub observation: Observation,

    /// Action taken.
    pub action: usize,

    /// Value estimate of the observation.
    pub value: f32,

    /// Recurrent state fed to the model together with `observation`.
    pub recurrent_state: RecurrentState,
}

impl PendingTransition {
    /// Completes the transition with the reward received for its action.
    pub fn complete(self, reward: f32) -> Transition {
        Transition {
            observation: self.observation,
            action: self.action,
            reward,
            value: self.value,
            recurrent_state: self.recurrent_state,
        }
    }
}

/// An ordered sequence of transitions drained from a [`RolloutBuffer`](super::RolloutBuffer).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RolloutSegment {
    transitions: Vec<Transition>,
}

impl RolloutSegment {
    /// Wraps transitions in time order.
    pub fn new(transitions: Vec<Transition>) -> Self {
        Self { transitions }
    }

    /// Number of transitions.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Returns `true` if the segment has no transition.
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Transitions in time order.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Rewards in time order.
    pub fn rewards(&self) -> Vec<f32> {
        self.transitions.iter().map(|t| t.reward).collect()
    }

    /// Value estimates in time order.
    pub fn values(&self) -> Vec<f32> {
        self.transitions.iter().map(|t| t.value).collect()
    }

    /// Recurrent state at the start of the segment.
    pub fn initial_state(&self) -> Option<&RecurrentState> {
        self.transitions.first().map(|t| &t.recurrent_state)
    }

    /// Builds the inputs of a gradient update.
    ///
    /// `bootstrap_value` stands for the return after the last transition: the value
    /// estimate of the next observation for a truncated segment, zero for a terminal one.
    pub fn into_train_batch(self, bootstrap_value: f32, gamma: f32) -> Result<TrainBatch> {
        ensure!(!self.is_empty(), "cannot train on an empty rollout segment");
        let (returns, advantages) = compute_returns(&self, bootstrap_value, gamma);
        let initial_state = self.transitions[0].recurrent_state.clone();
        let (observations, actions): (Vec<_>, Vec<_>) = self
            .transitions
            .into_iter()
            .map(|t| (t.observation, t.action))
            .unzip();

        Ok(TrainBatch {
            observations,
            initial_state,
            actions,
            returns,
            advantages,
        })
    }
}
