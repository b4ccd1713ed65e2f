//! Request boundary of the agent fleet.
use crate::AgentPool;
use anyhow::Result;
use lis_core::{error::LisError, Observation, PolicyValueModel, SyncModel};
use log::{info, trace, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Outcome of an episode reported by the client with `reset`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    /// Number of successful trials in the episode.
    pub success: u32,

    /// Number of failed trials in the episode.
    pub failure: u32,

    /// Elapsed time of the episode in seconds.
    pub elapsed: f32,

    /// The client has finished its task.
    pub finished: bool,
}

/// Counts of episode outcomes over all sessions.
#[derive(Debug, Default)]
pub struct EpisodeTally {
    episodes: AtomicU64,
    success: AtomicU64,
    failure: AtomicU64,
    finished: AtomicU64,
}

impl EpisodeTally {
    fn add(&self, summary: &EpisodeSummary) {
        self.episodes.fetch_add(1, Ordering::Relaxed);
        self.success
            .fetch_add(summary.success as u64, Ordering::Relaxed);
        self.failure
            .fetch_add(summary.failure as u64, Ordering::Relaxed);
        if summary.finished {
            self.finished.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of reported episodes.
    pub fn episodes(&self) -> u64 {
        self.episodes.load(Ordering::Relaxed)
    }

    /// Total number of successes.
    pub fn success(&self) -> u64 {
        self.success.load(Ordering::Relaxed)
    }

    /// Total number of failures.
    pub fn failure(&self) -> u64 {
        self.failure.load(Ordering::Relaxed)
    }

    /// Number of episodes with `finished` set.
    pub fn finished(&self) -> u64 {
        self.finished.load(Ordering::Relaxed)
    }
}

/// Entry points of the remote sessions.
///
/// Each call runs to completion on the calling thread, including a training step when
/// the rollout buffer of the agent is full. Requests that cannot be served for a
/// session, because the pool is exhausted or the session was never created, return
/// `Ok(None)` and are logged. Other errors are contract violations and are returned.
pub struct SessionService<M>
where
    M: PolicyValueModel + SyncModel,
{
    pool: AgentPool<M>,
    tally: EpisodeTally,
}

impl<M> SessionService<M>
where
    M: PolicyValueModel + SyncModel,
{
    /// Creates a service over a warmed-up pool.
    pub fn new(pool: AgentPool<M>) -> Self {
        Self {
            pool,
            tally: EpisodeTally::default(),
        }
    }

    /// The agent pool.
    pub fn pool(&self) -> &AgentPool<M> {
        &self.pool
    }

    /// Outcomes of the episodes reported so far.
    pub fn tally(&self) -> &EpisodeTally {
        &self.tally
    }

    /// First contact of a session: binds an agent if needed, then acts as [`step`](Self::step).
    pub fn create(&self, session: &str, reward: f32, obs: &Observation) -> Result<Option<usize>> {
        if dropped(self.pool.resolve_or_bind(session))?.is_none() {
            return Ok(None);
        }
        self.step(session, reward, obs)
    }

    /// Records `reward` for the previous action of the session and returns the next action.
    pub fn step(&self, session: &str, reward: f32, obs: &Observation) -> Result<Option<usize>> {
        let action = dropped(
            self.pool
                .with_session_lock(session, |agent| agent.act_and_train(obs, reward)),
        )?;
        trace!("Session {}: reward = {}, action = {:?}", session, reward, action);
        Ok(action)
    }

    /// Ends the episode of the session.
    ///
    /// If an action is waiting for its reward, the episode is closed with `reward` as
    /// terminal reward and trained on; that action is returned. Otherwise the episode
    /// state is reset without training and `None` is returned. The summary of a bound
    /// session is tallied and logged in both cases.
    pub fn reset(
        &self,
        session: &str,
        reward: f32,
        summary: &EpisodeSummary,
    ) -> Result<Option<usize>> {
        let action = dropped(self.pool.with_session_lock(session, |agent| {
            match agent.pending().map(|p| p.action) {
                Some(action) => {
                    agent.stop_episode_and_train(reward)?;
                    Ok(Some(action))
                }
                None => {
                    agent.stop_episode();
                    Ok(None)
                }
            }
        }))?;

        if action.is_some() {
            self.tally.add(summary);
            info!(
                "Session {}: episode ended, reward = {}, success = {}, failure = {}, elapsed = {}, finished = {}",
                session, reward, summary.success, summary.failure, summary.elapsed, summary.finished
            );
        }
        Ok(action.flatten())
    }

    /// Re-initializes the episode state of the session without training.
    ///
    /// Binds an agent if the session is new. Returns `false` if no agent is available.
    pub fn flush(&self, session: &str) -> Result<bool> {
        if dropped(self.pool.resolve_or_bind(session))?.is_none() {
            return Ok(false);
        }
        let flushed = dropped(self.pool.with_session_lock(session, |agent| {
            agent.stop_episode();
            Ok(())
        }))?;
        info!("Session {}: flushed", session);
        Ok(flushed.is_some())
    }
}

/// Turns session-scoped failures into `None`.
fn dropped<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) => match e.downcast_ref::<LisError>() {
            Some(LisError::PoolExhausted(_)) | Some(LisError::UnknownSession(_)) => {
                warn!("Dropped request: {}", e);
                Ok(None)
            }
            _ => Err(e),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AgentCoreConfig, AgentPoolConfig};
    use lis_core::dummy::{DummyLog, DummyModel};
    use test_log::test;

    fn service(n_workers: usize) -> (SessionService<DummyModel>, DummyLog) {
        let log = DummyLog::default();
        let pool = AgentPool::build(
            &AgentPoolConfig::new(n_workers),
            &AgentCoreConfig::default().rollout_len(3),
            |_| Ok(DummyModel::new(2, 2).with_log(log.clone())),
        )
        .unwrap();
        (SessionService::new(pool), log)
    }

    fn obs() -> Observation {
        Observation::new(vec![0.5])
    }

    #[test]
    fn test_create_and_step() -> Result<()> {
        let (service, _) = service(1);
        assert!(service.create("a", 0.0, &obs())?.is_some());
        assert!(service.step("a", 1.0, &obs())?.is_some());

        let buffer_len = service
            .pool()
            .with_session_lock("a", |agent| Ok(agent.buffer_len()))?;
        assert_eq!(buffer_len, 1);
        Ok(())
    }

    #[test]
    fn test_exhausted_pool_drops_request() -> Result<()> {
        let (service, _) = service(1);
        assert!(service.create("a", 0.0, &obs())?.is_some());
        assert!(service.create("b", 0.0, &obs())?.is_none());
        assert!(!service.flush("b")?);
        Ok(())
    }

    #[test]
    fn test_unknown_session_is_noop() -> Result<()> {
        let (service, log) = service(1);
        assert!(service.step("x", 0.0, &obs())?.is_none());
        assert!(service
            .reset("x", 0.0, &EpisodeSummary::default())?
            .is_none());
        assert_eq!(service.pool().n_available(), 1);
        assert_eq!(log.n_updates(), 0);
        assert_eq!(service.tally().episodes(), 0);
        Ok(())
    }

    #[test]
    fn test_reset_trains_pending_transition() -> Result<()> {
        let (service, log) = service(1);
        let action = service.create("a", 0.0, &obs())?;
        let summary = EpisodeSummary {
            success: 1,
            failure: 0,
            elapsed: 3.5,
            finished: true,
        };

        assert_eq!(service.reset("a", 1.0, &summary)?, action);
        assert_eq!(log.n_updates(), 1);
        assert_eq!(service.tally().episodes(), 1);
        assert_eq!(service.tally().success(), 1);
        assert_eq!(service.tally().finished(), 1);

        // Nothing pending after the reset: the second one does not train.
        assert_eq!(service.reset("a", 1.0, &summary)?, None);
        assert_eq!(log.n_updates(), 1);
        assert_eq!(service.tally().episodes(), 2);
        assert_eq!(service.tally().success(), 2);
        Ok(())
    }

    #[test]
    fn test_reset_after_flush_tallies_summary() -> Result<()> {
        let (service, log) = service(1);
        service.create("a", 0.0, &obs())?;
        assert!(service.flush("a")?);

        let summary = EpisodeSummary {
            success: 0,
            failure: 1,
            elapsed: 2.0,
            finished: true,
        };
        assert_eq!(service.reset("a", 0.0, &summary)?, None);
        assert_eq!(log.n_updates(), 0);
        assert_eq!(service.tally().episodes(), 1);
        assert_eq!(service.tally().failure(), 1);
        assert_eq!(service.tally().finished(), 1);
        Ok(())
    }

    #[test]
    fn test_flush_resets_without_training() -> Result<()> {
        let (service, log) = service(1);
        assert!(service.flush("a")?);
        service.create("a", 0.0, &obs())?;
        service.step("a", 1.0, &obs())?;

        assert!(service.flush("a")?);
        let (pending, buffer_len) = service
            .pool()
            .with_session_lock("a", |agent| Ok((agent.pending().is_some(), agent.buffer_len())))?;
        assert!(!pending);
        assert_eq!(buffer_len, 0);
        assert_eq!(log.n_updates(), 0);
        Ok(())
    }

    #[test]
    fn test_training_every_rollout_len_steps() -> Result<()> {
        let (service, log) = service(1);
        service.create("a", 0.0, &obs())?;
        for _ in 0..7 {
            service.step("a", 1.0, &obs())?;
        }
        // 8 observations, buffer of 3: trained when the 5th and 8th arrive.
        assert_eq!(log.n_updates(), 2);
        assert!(log.updates().iter().all(|b| b.len() == 3));
        Ok(())
    }
}
