use super::{AgentCoreConfig, AgentStat};
use anyhow::{ensure, Result};
use lis_core::{
    error::LisError,
    record::{Record, RecordValue},
    ExperienceBufferBase, Observation, PendingTransition, PolicyValueModel, RecurrentState,
    RolloutBuffer, SyncModel,
};
use log::{debug, trace, warn};
use rand::{rngs::SmallRng, SeedableRng};

/// What an [`AgentCore`] is doing.
///
/// Outside of an operation the phase is always [`AgentPhase::Idle`]; any other value
/// observed from outside means that an operation was interrupted by a panic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentPhase {
    /// Waiting for the next request.
    Idle,

    /// Scoring an observation.
    Acting,

    /// Updating the global model.
    Training,
}

/// Online n-step actor-critic learner bound to one session.
///
/// The reward of an action is only known when the next observation arrives, so the last
/// inference is kept as a [`PendingTransition`] and completed with the reward received
/// with the next call. Completed transitions go into a [`RolloutBuffer`] of
/// `rollout_len` transitions. A full buffer is trained on, bootstrapped with the value
/// estimate of the pending transition, before the next transition is appended.
pub struct AgentCore<M>
where
    M: PolicyValueModel + SyncModel,
{
    id: usize,
    config: AgentCoreConfig,
    model: M,
    buffer: RolloutBuffer,
    state: RecurrentState,
    pending: Option<PendingTransition>,
    phase: AgentPhase,
    rng: SmallRng,
    stat: AgentStat,
}

impl<M> AgentCore<M>
where
    M: PolicyValueModel + SyncModel,
{
    /// Builds an agent with id `id` around a local model.
    pub fn build(id: usize, config: AgentCoreConfig, model: M) -> Result<Self> {
        ensure!(config.rollout_len > 0, "rollout_len must be positive");
        let state = model.initial_state();
        let rng = SmallRng::seed_from_u64(config.seed.wrapping_add(id as u64));

        Ok(Self {
            id,
            buffer: RolloutBuffer::new(config.rollout_len),
            config,
            model,
            state,
            pending: None,
            phase: AgentPhase::Idle,
            rng,
            stat: AgentStat::default(),
        })
    }

    /// Id of the agent in its pool.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Current phase.
    pub fn phase(&self) -> AgentPhase {
        self.phase
    }

    /// Counters of the agent.
    pub fn stat(&self) -> &AgentStat {
        &self.stat
    }

    /// Recurrent state to be fed with the next observation.
    pub fn state(&self) -> &RecurrentState {
        &self.state
    }

    /// The last scored observation whose reward has not arrived yet.
    pub fn pending(&self) -> Option<&PendingTransition> {
        self.pending.as_ref()
    }

    /// Number of transitions waiting for training.
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// The local model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Samples an action for `obs` without recording anything for training.
    ///
    /// The recurrent state advances as in [`AgentCore::act_and_train`].
    pub fn act(&mut self, obs: &Observation) -> Result<usize> {
        self.phase = AgentPhase::Acting;
        let result = self.infer_and_sample(obs).map(|(action, _)| action);
        self.phase = AgentPhase::Idle;
        result
    }

    /// Records `reward` for the previous action, then samples an action for `obs`.
    ///
    /// If the buffer is full, it is trained on before anything else happens, using the
    /// value estimate of the previous observation as bootstrap.
    pub fn act_and_train(&mut self, obs: &Observation, reward: f32) -> Result<usize> {
        self.phase = AgentPhase::Acting;
        let result = self.act_and_train_(obs, reward);
        self.phase = AgentPhase::Idle;
        result
    }

    fn act_and_train_(&mut self, obs: &Observation, reward: f32) -> Result<usize> {
        if self.buffer.is_full() {
            let bootstrap_value = self.pending.as_ref().map_or(0.0, |p| p.value);
            self.train(bootstrap_value)?;
        }

        if let Some(pending) = self.pending.take() {
            self.buffer.append(pending.complete(reward))?;
        }

        let state = self.state.clone();
        let (action, value) = self.infer_and_sample(obs)?;
        self.pending = Some(PendingTransition {
            observation: obs.clone(),
            action,
            value,
            recurrent_state: state,
        });
        self.stat.env_steps += 1;

        Ok(action)
    }

    /// Ends the episode with the final `reward`, training on what is left.
    ///
    /// The pending transition is recorded as terminal and a training step with bootstrap
    /// value zero runs whatever the number of buffered transitions. Without a pending
    /// transition nothing is trained. The episode state is reset in both cases.
    ///
    /// Returns the record of the last training step, if any.
    pub fn stop_episode_and_train(&mut self, reward: f32) -> Result<Option<Record>> {
        let prev = self.phase;
        self.phase = AgentPhase::Training;
        let result = self.stop_episode_and_train_(reward);
        self.phase = prev;
        self.stop_episode();
        result
    }

    fn stop_episode_and_train_(&mut self, reward: f32) -> Result<Option<Record>> {
        let pending = match self.pending.take() {
            Some(pending) => pending,
            None => return Ok(None),
        };

        if self.buffer.is_full() {
            self.train(pending.value)?;
        }
        self.buffer.append(pending.complete(reward))?;
        let record = self.train(0.0)?;
        self.stat.episodes += 1;

        Ok(Some(record))
    }

    /// Resets the episode state: zero recurrent state, empty buffer, no pending transition.
    pub fn stop_episode(&mut self) {
        self.state = self.model.initial_state();
        self.buffer.clear();
        self.pending = None;
        self.phase = AgentPhase::Idle;
    }

    /// Trains on the buffered transitions and pulls the global parameters.
    ///
    /// An update rejected for NaN or infinity is skipped, and the returned record then
    /// has `skipped = 1`. The local parameters are refreshed in both cases.
    pub fn train(&mut self, bootstrap_value: f32) -> Result<Record> {
        let prev = self.phase;
        self.phase = AgentPhase::Training;
        let result = self.train_(bootstrap_value);
        self.phase = prev;
        result
    }

    fn train_(&mut self, bootstrap_value: f32) -> Result<Record> {
        let segment = self.buffer.drain();
        let n = segment.len();
        let batch = segment.into_train_batch(bootstrap_value, self.config.gamma)?;

        let mut record = match self.model.update(&batch) {
            Ok(record) => {
                self.stat.train_steps += 1;
                debug!(
                    "Agent {}: trained on {} transitions, loss = {:?}",
                    self.id,
                    n,
                    record.get_scalar("loss").ok()
                );
                record
            }
            Err(e) => match e.downcast_ref::<LisError>() {
                Some(LisError::NumericInstability(msg)) => {
                    warn!("Agent {}: skipped training step: {}", self.id, msg);
                    self.stat.skipped_train_steps += 1;
                    Record::from_scalar("skipped", 1.0)
                }
                _ => return Err(e),
            },
        };

        let version = self.model.pull()?;
        record.insert("global_version", RecordValue::Scalar(version as f32));
        Ok(record)
    }

    /// Restores a consistent state after an operation was interrupted by a panic.
    pub fn recover(&mut self) {
        if self.phase != AgentPhase::Idle {
            warn!(
                "Agent {}: interrupted while {:?}, resetting episode",
                self.id, self.phase
            );
            self.stop_episode();
        }
    }

    fn infer_and_sample(&mut self, obs: &Observation) -> Result<(usize, f32)> {
        let inference = self.model.infer(obs, &self.state)?;
        let action = inference.distribution.sample(&mut self.rng);
        trace!(
            "Agent {}: action = {}, value = {}",
            self.id,
            action,
            inference.value
        );
        self.state = inference.next_state;
        Ok((action, inference.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lis_core::dummy::{DummyLog, DummyModel};
    use test_log::test;

    const STATE_DIM: usize = 2;

    fn agent(rollout_len: usize) -> (AgentCore<DummyModel>, DummyLog) {
        let model = DummyModel::new(3, STATE_DIM);
        let log = model.log();
        let config = AgentCoreConfig::default().rollout_len(rollout_len);
        (AgentCore::build(0, config, model).unwrap(), log)
    }

    fn obs(x: f32) -> Observation {
        Observation::new(vec![x])
    }

    #[test]
    fn test_act_does_not_record() -> Result<()> {
        let (mut agent, log) = agent(3);
        let a = agent.act(&obs(1.0))?;
        assert!(a < 3);
        assert!(agent.pending().is_none());
        assert_eq!(agent.buffer_len(), 0);
        assert_eq!(agent.state().h(), &[1.0, 1.0]);
        assert_eq!(log.n_updates(), 0);
        Ok(())
    }

    #[test]
    fn test_act_and_train_delays_reward() -> Result<()> {
        let (mut agent, _) = agent(3);

        agent.act_and_train(&obs(1.0), 0.0)?;
        assert_eq!(agent.buffer_len(), 0);
        assert_eq!(agent.pending().map(|p| p.value), Some(1.0));

        agent.act_and_train(&obs(2.0), 5.0)?;
        assert_eq!(agent.buffer_len(), 1);
        assert_eq!(agent.pending().map(|p| p.value), Some(2.0));
        assert_eq!(agent.phase(), AgentPhase::Idle);
        Ok(())
    }

    #[test]
    fn test_full_buffer_is_drained_before_append() -> Result<()> {
        let (mut agent, log) = agent(3);
        let mut lens = vec![];
        for t in 0..8 {
            agent.act_and_train(&obs(t as f32), 1.0)?;
            lens.push(agent.buffer_len());
        }

        // The fourth observation fills the buffer; the fifth trains and appends.
        assert_eq!(lens, vec![0, 1, 2, 3, 1, 2, 3, 1]);
        assert_eq!(log.n_updates(), 2);
        assert_eq!(log.n_pulls(), 2);
        assert_eq!(agent.stat().train_steps, 2);
        assert_eq!(agent.stat().env_steps, 8);

        // Bootstrapped with the value of the pending observation (value = obs).
        let updates = log.updates();
        let batch = &updates[0];
        let r2 = 1.0 + 0.99 * 3.0;
        let r1 = 1.0 + 0.99 * r2;
        assert_eq!(batch.len(), 3);
        assert!((batch.returns[2] - r2).abs() < 1e-5);
        assert!((batch.returns[1] - r1).abs() < 1e-5);
        assert!((batch.advantages[1] - (r1 - 1.0)).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_segment_carries_initial_recurrent_state() -> Result<()> {
        let (mut agent, log) = agent(2);
        for t in 0..6 {
            agent.act_and_train(&obs(t as f32), 0.0)?;
        }
        let updates = log.updates();
        assert_eq!(updates.len(), 2);

        // The dummy state counts inference steps since the episode start.
        assert!(updates[0].initial_state.is_zero());
        assert_eq!(updates[1].initial_state.h(), &[2.0, 2.0]);
        Ok(())
    }

    #[test]
    fn test_stop_episode_and_train() -> Result<()> {
        let (mut agent, log) = agent(20);
        agent.act_and_train(&obs(1.0), 0.0)?;
        agent.act_and_train(&obs(2.0), 1.0)?;

        let record = agent.stop_episode_and_train(4.0)?;
        assert!(record.is_some());
        assert_eq!(log.n_updates(), 1);

        // Terminal segment: bootstrap value is zero.
        let updates = log.updates();
        let batch = &updates[0];
        assert_eq!(batch.actions.len(), 2);
        assert!((batch.returns[1] - 4.0).abs() < 1e-6);
        assert!((batch.returns[0] - (1.0 + 0.99 * 4.0)).abs() < 1e-5);

        assert!(agent.pending().is_none());
        assert_eq!(agent.buffer_len(), 0);
        assert!(agent.state().is_zero());
        assert_eq!(agent.stat().episodes, 1);
        Ok(())
    }

    #[test]
    fn test_stop_episode_and_train_with_single_step() -> Result<()> {
        let (mut agent, log) = agent(20);
        agent.act_and_train(&obs(1.0), 0.0)?;
        agent.stop_episode_and_train(2.0)?;

        assert_eq!(log.n_updates(), 1);
        assert_eq!(log.updates()[0].returns, vec![2.0]);
        Ok(())
    }

    #[test]
    fn test_stop_episode_and_train_on_empty_is_noop() -> Result<()> {
        let (mut agent, log) = agent(20);
        let record = agent.stop_episode_and_train(1.0)?;
        assert!(record.is_none());
        assert_eq!(log.n_updates(), 0);
        assert_eq!(log.n_pulls(), 0);
        Ok(())
    }

    #[test]
    fn test_stop_episode_and_train_with_full_buffer() -> Result<()> {
        let (mut agent, log) = agent(2);
        for t in 0..3 {
            agent.act_and_train(&obs(t as f32), 1.0)?;
        }
        assert_eq!(agent.buffer_len(), 2);

        agent.stop_episode_and_train(1.0)?;
        let updates = log.updates();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].len(), 2);
        assert_eq!(updates[1].len(), 1);
        assert_eq!(updates[1].returns, vec![1.0]);
        Ok(())
    }

    #[test]
    fn test_stop_episode_is_idempotent() -> Result<()> {
        let (mut agent, _) = agent(20);
        agent.act_and_train(&obs(1.0), 0.0)?;
        agent.act_and_train(&obs(2.0), 1.0)?;

        agent.stop_episode();
        let once = (
            agent.state().clone(),
            agent.buffer_len(),
            agent.pending().is_none(),
        );
        agent.stop_episode();
        let twice = (
            agent.state().clone(),
            agent.buffer_len(),
            agent.pending().is_none(),
        );

        assert_eq!(once, twice);
        assert_eq!(once, (RecurrentState::zeros(STATE_DIM), 0, true));
        Ok(())
    }

    #[test]
    fn test_numeric_instability_skips_update() -> Result<()> {
        let (mut agent, log) = agent(1);
        log.set_fail_updates(true);
        for t in 0..3 {
            agent.act_and_train(&obs(t as f32), 1.0)?;
        }

        assert_eq!(log.n_updates(), 0);
        assert_eq!(agent.stat().skipped_train_steps, 1);
        assert_eq!(agent.stat().train_steps, 0);
        assert_eq!(log.n_pulls(), 1);

        let record = agent.stop_episode_and_train(0.0)?.unwrap();
        assert_eq!(record.get_scalar("skipped")?, 1.0);
        Ok(())
    }

    #[test]
    fn test_sampling_follows_distribution() -> Result<()> {
        let model = DummyModel::new(3, STATE_DIM).probs(vec![0.0, 0.0, 1.0]);
        let mut agent = AgentCore::build(0, AgentCoreConfig::default(), model)?;
        for t in 0..10 {
            assert_eq!(agent.act_and_train(&obs(t as f32), 0.0)?, 2);
        }
        Ok(())
    }

    #[test]
    fn test_recover_resets_interrupted_agent() -> Result<()> {
        let (mut agent, _) = agent(20);
        agent.act_and_train(&obs(1.0), 0.0)?;

        agent.recover();
        assert!(agent.pending().is_some());

        agent.phase = AgentPhase::Training;
        agent.recover();
        assert!(agent.pending().is_none());
        assert_eq!(agent.phase(), AgentPhase::Idle);
        Ok(())
    }
}
