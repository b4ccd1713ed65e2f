//! Rollouts of on-policy experience.
//!
//! The reward of the action taken at step `t` is only known at step `t + 1`, so an agent
//! keeps the last inference in a [`PendingTransition`] and turns it into a [`Transition`]
//! once the reward arrives. Transitions are appended to a [`RolloutBuffer`] holding at
//! most `N` of them; a full buffer is drained into a [`RolloutSegment`], from which
//! [`compute_returns`] derives the discounted returns and advantages used for training.
mod buffer;
mod returns;
mod transition;
pub use buffer::RolloutBuffer;
pub use returns::compute_returns;
pub use transition::{PendingTransition, RolloutSegment, Transition};

/// Default maximum length of a rollout segment.
pub const DEFAULT_ROLLOUT_LEN: usize = 20;

/// Default discount factor.
pub const DEFAULT_GAMMA: f32 = 0.99;
