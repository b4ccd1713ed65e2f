use super::{RolloutSegment, Transition};
use crate::{error::LisError, ExperienceBufferBase};
use anyhow::Result;

/// A bounded, append-only sequence of transitions.
///
/// The buffer never holds more than `capacity` transitions. Appending to a full
/// buffer fails with [`LisError::CapacityExceeded`]; the owner is expected to
/// [`drain`](RolloutBuffer::drain) it for training first.
#[derive(Debug)]
pub struct RolloutBuffer {
    capacity: usize,
    transitions: Vec<Transition>,
}

impl RolloutBuffer {
    /// Creates an empty buffer.
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "rollout buffer capacity must be positive");
        Self {
            capacity,
            transitions: Vec::with_capacity(capacity),
        }
    }

    /// Appends a transition.
    pub fn append(&mut self, tr: Transition) -> Result<()> {
        if self.transitions.len() >= self.capacity {
            return Err(LisError::CapacityExceeded {
                capacity: self.capacity,
            })?;
        }
        self.transitions.push(tr);
        Ok(())
    }

    /// Takes all transitions out of the buffer, leaving it empty.
    pub fn drain(&mut self) -> RolloutSegment {
        let transitions =
            std::mem::replace(&mut self.transitions, Vec::with_capacity(self.capacity));
        RolloutSegment::new(transitions)
    }

    /// Discards all transitions.
    pub fn clear(&mut self) {
        self.transitions.clear();
    }

    /// Maximum number of transitions.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` if no more transition can be appended.
    pub fn is_full(&self) -> bool {
        self.transitions.len() == self.capacity
    }
}

impl ExperienceBufferBase for RolloutBuffer {
    type Item = Transition;

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        self.append(tr)
    }

    fn len(&self) -> usize {
        self.transitions.len()
    }
}
