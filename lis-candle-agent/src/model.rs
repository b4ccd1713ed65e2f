//! Local actor-critic model of an agent.
use crate::{
    opt::Optimizer,
    util::{clip_grad_norm, from_lstm_state, named_vars, to_lstm_state},
    GlobalModel, LstmActorCritic, LstmActorCriticConfig, ParameterSync,
};
use anyhow::{ensure, Result};
use candle_core::{DType, Device, Tensor, Var};
use candle_nn::{VarBuilder, VarMap};
use lis_core::{
    error::LisError,
    record::{Record, RecordValue},
    ActionDistribution, Inference, Observation, PolicyValueModel, RecurrentState, SyncModel,
    TrainBatch,
};
use log::trace;
use std::sync::Arc;

/// Local copy of the [`GlobalModel`] owned by a single agent.
///
/// Inference and gradient computation run on the local variables. Gradients are applied
/// to the global variables by an optimizer owned by this model, so optimizer statistics
/// are per agent while parameters are shared.
pub struct A3cModel {
    config: LstmActorCriticConfig,
    device: Device,
    net: LstmActorCritic,
    local_vars: Vec<(String, Var)>,
    global_vars: Vec<Var>,
    sync: ParameterSync,
    opt: Optimizer,

    // Keeps the local variables alive.
    _varmap: VarMap,
}

impl A3cModel {
    /// Builds a local model of `global` and pulls the global parameters into it.
    pub fn build(global: Arc<GlobalModel>) -> Result<Self> {
        let config = global.config().clone();
        let device = global.device().clone();
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let net = LstmActorCritic::build(vb, &config)?;
        let local_vars = named_vars(&varmap)?;

        let global_vars = global.vars();
        ensure!(
            local_vars.len() == global_vars.len()
                && local_vars
                    .iter()
                    .zip(global_vars.iter())
                    .all(|((k1, _), (k2, _))| k1 == k2),
            "local and global models have different variables"
        );
        let global_vars: Vec<Var> = global_vars.iter().map(|(_, v)| v.clone()).collect();
        let opt = config.opt_config.build(global_vars.clone())?;
        let sync = ParameterSync::new(global);
        sync.pull(&local_vars)?;

        Ok(Self {
            config,
            device,
            net,
            local_vars,
            global_vars,
            sync,
            opt,
            _varmap: varmap,
        })
    }

    /// The global model this model synchronizes with.
    pub fn global(&self) -> &Arc<GlobalModel> {
        self.sync.global()
    }

    fn obs_tensor(&self, observations: &[Observation]) -> Result<Tensor> {
        let mut data = Vec::with_capacity(observations.len() * self.config.obs_dim);
        for obs in observations.iter() {
            ensure!(
                obs.dim() == self.config.obs_dim,
                "observation dimension {} does not match the model ({})",
                obs.dim(),
                self.config.obs_dim
            );
            data.extend_from_slice(obs.as_slice());
        }
        Ok(Tensor::from_vec(
            data,
            (observations.len(), self.config.obs_dim),
            &self.device,
        )?)
    }

    fn local_var_list(&self) -> Vec<Var> {
        self.local_vars.iter().map(|(_, v)| v.clone()).collect()
    }
}

impl PolicyValueModel for A3cModel {
    fn initial_state(&self) -> RecurrentState {
        RecurrentState::zeros(self.config.hidden_dim)
    }

    fn infer(&self, obs: &Observation, state: &RecurrentState) -> Result<Inference> {
        let obs = self.obs_tensor(std::slice::from_ref(obs))?;
        let state = to_lstm_state(state, &self.device)?;
        let (probs, values, next_state) = self.net.forward(&obs, state)?;

        let probs = probs.squeeze(0)?.to_vec1::<f32>()?;
        let value = values.squeeze(0)?.to_scalar::<f32>()?;
        Ok(Inference {
            distribution: ActionDistribution::new(probs)?,
            value,
            next_state: from_lstm_state(&next_state)?,
        })
    }

    fn update(&mut self, batch: &TrainBatch) -> Result<Record> {
        batch.validate()?;
        let n = batch.len();
        let obs = self.obs_tensor(&batch.observations)?;
        let state = to_lstm_state(&batch.initial_state, &self.device)?;
        let actions = Tensor::from_vec(
            batch.actions.iter().map(|&a| a as u32).collect::<Vec<_>>(),
            (n, 1),
            &self.device,
        )?;
        let returns = Tensor::from_slice(&batch.returns, n, &self.device)?;
        let advantages = Tensor::from_slice(&batch.advantages, n, &self.device)?;

        let (probs, values, _) = self.net.forward(&obs, state)?;
        let log_probs = probs.clamp(self.config.prob_epsilon, 1f32)?.log()?;
        let log_pi = log_probs.gather(&actions, 1)?.squeeze(1)?;

        let policy_loss = (log_pi * &advantages)?.sum_all()?.neg()?;
        let value_loss = (returns - &values)?.sqr()?.sum_all()?.affine(0.5, 0.)?;
        let entropy = (&probs * &log_probs)?.sum_all()?.neg()?;
        let loss = ((&policy_loss + value_loss.affine(self.config.value_coef, 0.)?)?
            - entropy.affine(self.config.entropy_coef, 0.)?)?;

        let loss_ = loss.to_scalar::<f32>()?;
        if !loss_.is_finite() {
            return Err(LisError::NumericInstability(format!("loss is {}", loss_)))?;
        }

        let mut grads = loss.backward()?;
        let grad_norm = clip_grad_norm(
            &mut grads,
            &self.local_var_list(),
            self.config.max_grad_norm,
        )?;

        // Gradients are keyed by tensor; re-key them to the global variables.
        for ((_, local), global) in self.local_vars.iter().zip(self.global_vars.iter()) {
            if let Some(g) = grads.remove(local.as_tensor()) {
                let _ = grads.insert(global.as_tensor(), g);
            }
        }
        self.opt.step(&grads)?;
        let version = self.sync.global().record_update();
        trace!("Applied update to global model (version {})", version);

        Ok(Record::from_slice(&[
            ("loss", RecordValue::Scalar(loss_)),
            (
                "policy_loss",
                RecordValue::Scalar(policy_loss.to_scalar::<f32>()?),
            ),
            (
                "value_loss",
                RecordValue::Scalar(value_loss.to_scalar::<f32>()?),
            ),
            ("entropy", RecordValue::Scalar(entropy.to_scalar::<f32>()?)),
            ("grad_norm", RecordValue::Scalar(grad_norm)),
        ]))
    }
}

impl SyncModel for A3cModel {
    fn pull(&mut self) -> Result<u64> {
        self.sync.pull(&self.local_vars)
    }
}
