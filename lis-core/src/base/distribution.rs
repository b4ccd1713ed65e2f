//! Categorical action distribution.
use crate::error::LisError;
use anyhow::Result;
use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng,
};

/// Tolerance on the total probability mass.
const SUM_TOLERANCE: f32 = 1e-3;

/// Categorical distribution over discrete actions.
///
/// Probabilities are validated on construction and renormalised to sum to one.
#[derive(Clone, Debug)]
pub struct ActionDistribution {
    probs: Vec<f32>,
    index: WeightedIndex<f32>,
}

impl ActionDistribution {
    /// Builds a distribution from action probabilities.
    ///
    /// Fails with [`LisError::InvalidDistribution`] if `probs` is empty, contains
    /// non-finite or negative values, or does not sum to one within a small tolerance.
    pub fn new(probs: Vec<f32>) -> Result<Self> {
        if probs.is_empty() {
            return Err(LisError::InvalidDistribution("no actions".into()))?;
        }
        if probs.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(LisError::InvalidDistribution(format!("{:?}", probs)))?;
        }
        let sum: f32 = probs.iter().sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(LisError::InvalidDistribution(format!(
                "probabilities sum to {}",
                sum
            )))?;
        }
        let probs: Vec<f32> = probs.into_iter().map(|p| p / sum).collect();
        let index = WeightedIndex::new(&probs)
            .map_err(|e| LisError::InvalidDistribution(e.to_string()))?;

        Ok(Self { probs, index })
    }

    /// Probabilities of the actions.
    pub fn probs(&self) -> &[f32] {
        &self.probs
    }

    /// Number of actions.
    pub fn n_actions(&self) -> usize {
        self.probs.len()
    }

    /// Samples an action index.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.index.sample(rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn test_rejects_invalid_probs() {
        assert!(ActionDistribution::new(vec![]).is_err());
        assert!(ActionDistribution::new(vec![0.5, f32::NAN, 0.5]).is_err());
        assert!(ActionDistribution::new(vec![1.5, -0.5]).is_err());
        assert!(ActionDistribution::new(vec![0.2, 0.2]).is_err());
        assert!(ActionDistribution::new(vec![0.2, 0.3, 0.5]).is_ok());
    }

    #[test]
    fn test_sample_never_picks_zero_prob() {
        let dist = ActionDistribution::new(vec![0.0, 1.0, 0.0]).unwrap();
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(dist.sample(&mut rng), 1);
        }
    }

    #[test]
    fn test_renormalises_probs() {
        let dist = ActionDistribution::new(vec![0.2, 0.2, 0.6005]).unwrap();
        let sum: f32 = dist.probs().iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert_eq!(dist.n_actions(), 3);
    }
}
