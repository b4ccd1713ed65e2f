//! Observation and recurrent state.
use serde::{Deserialize, Serialize};

/// A fixed-length numeric observation, as produced by the observation decoder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation(Vec<f32>);

impl Observation {
    /// Wraps a feature vector.
    pub fn new(features: Vec<f32>) -> Self {
        Self(features)
    }

    /// Returns the features.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Returns the length of the feature vector.
    pub fn dim(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<f32>> for Observation {
    fn from(features: Vec<f32>) -> Self {
        Self(features)
    }
}

/// Hidden and cell vectors of a recurrent policy, carried across the steps of an episode.
///
/// The two vectors always have the same length. The state is treated as one value:
/// it is replaced as a whole after every inference and reset with [`RecurrentState::zeros`]
/// at episode boundaries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecurrentState {
    h: Vec<f32>,
    c: Vec<f32>,
}

impl RecurrentState {
    /// The all-zero state of the given dimension.
    pub fn zeros(dim: usize) -> Self {
        Self {
            h: vec![0.0; dim],
            c: vec![0.0; dim],
        }
    }

    /// Builds a state from hidden and cell vectors.
    ///
    /// Panics if the two vectors differ in length.
    pub fn new(h: Vec<f32>, c: Vec<f32>) -> Self {
        assert_eq!(h.len(), c.len(), "hidden and cell vectors must have the same length");
        Self { h, c }
    }

    /// Hidden vector.
    pub fn h(&self) -> &[f32] {
        &self.h
    }

    /// Cell vector.
    pub fn c(&self) -> &[f32] {
        &self.c
    }

    /// Length of each of the two vectors.
    pub fn dim(&self) -> usize {
        self.h.len()
    }

    /// Returns `true` if every element is zero.
    pub fn is_zero(&self) -> bool {
        self.h.iter().chain(self.c.iter()).all(|&x| x == 0.0)
    }
}
