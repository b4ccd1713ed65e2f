use super::LstmActorCriticConfig;
use anyhow::{ensure, Result};
use candle_core::{Tensor, D};
use candle_nn::{
    linear,
    rnn::{lstm, LSTMConfig, LSTMState, LSTM, RNN},
    Linear, Module, VarBuilder,
};

/// Actor-critic network with an LSTM core.
///
/// `obs -> Linear -> ReLU -> LSTM -> (policy logits, value)`.
pub struct LstmActorCritic {
    encoder: Linear,
    lstm: LSTM,
    policy: Linear,
    value: Linear,
    obs_dim: usize,
}

impl LstmActorCritic {
    /// Builds the network, creating its variables through `vb`.
    pub fn build(vb: VarBuilder, config: &LstmActorCriticConfig) -> Result<Self> {
        let encoder = linear(config.obs_dim, config.hidden_dim, vb.pp("encoder"))?;
        let lstm = lstm(
            config.hidden_dim,
            config.hidden_dim,
            LSTMConfig::default(),
            vb.pp("lstm"),
        )?;
        let policy = linear(config.hidden_dim, config.n_actions, vb.pp("policy"))?;
        let value = linear(config.hidden_dim, 1, vb.pp("value"))?;

        Ok(Self {
            encoder,
            lstm,
            policy,
            value,
            obs_dim: config.obs_dim,
        })
    }

    /// Runs the network over a sequence of observations.
    ///
    /// `obs` has shape `[seq_len, obs_dim]` and is processed as a single episode fragment
    /// starting from `state`. Returns action probabilities `[seq_len, n_actions]`,
    /// values `[seq_len]` and the LSTM state after the last step.
    pub fn forward(&self, obs: &Tensor, state: LSTMState) -> Result<(Tensor, Tensor, LSTMState)> {
        let (seq_len, obs_dim) = obs.dims2()?;
        ensure!(
            obs_dim == self.obs_dim,
            "observation dimension {} does not match the model ({})",
            obs_dim,
            self.obs_dim
        );

        let xs = self.encoder.forward(obs)?.relu()?;
        let mut state = state;
        let mut hs = Vec::with_capacity(seq_len);
        for t in 0..seq_len {
            state = self.lstm.step(&xs.narrow(0, t, 1)?, &state)?;
            hs.push(state.h().clone());
        }
        let hs = Tensor::cat(&hs, 0)?;

        let probs = candle_nn::ops::softmax(&self.policy.forward(&hs)?, D::Minus1)?;
        let values = self.value.forward(&hs)?.squeeze(1)?;

        Ok((probs, values, state))
    }
}
