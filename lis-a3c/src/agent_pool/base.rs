use super::AgentPoolConfig;
use crate::{AgentCore, AgentCoreConfig, AgentStat};
use anyhow::Result;
use lis_core::{error::LisError, PolicyValueModel, SyncModel};
use log::{info, warn};
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, RwLock},
};

/// Shared handle of an agent in an [`AgentPool`].
///
/// The mutex of the agent is the lock of the session bound to it: a session owns its
/// agent exclusively and for the lifetime of the pool.
pub struct AgentHandle<M>
where
    M: PolicyValueModel + SyncModel,
{
    id: usize,
    agent: Arc<Mutex<AgentCore<M>>>,
}

impl<M> Clone for AgentHandle<M>
where
    M: PolicyValueModel + SyncModel,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            agent: self.agent.clone(),
        }
    }
}

impl<M> AgentHandle<M>
where
    M: PolicyValueModel + SyncModel,
{
    /// Index of the agent in the pool.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns `true` if both handles refer to the same agent.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.agent, &other.agent)
    }

    /// Locks the agent.
    ///
    /// If a previous holder panicked, the lock is recovered and an agent left in the
    /// middle of an operation has its episode reset.
    pub fn lock(&self) -> MutexGuard<'_, AgentCore<M>> {
        match self.agent.lock() {
            Ok(guard) => guard,
            Err(e) => {
                warn!("Lock of agent {} was poisoned", self.id);
                let mut guard = e.into_inner();
                guard.recover();
                self.agent.clear_poison();
                guard
            }
        }
    }
}

/// Free agents and session bindings, guarded together so that a first bind is atomic.
struct Bindings {
    available: VecDeque<usize>,
    sessions: HashMap<String, usize>,
}

/// Fixed pool of agents bound to sessions on first contact.
///
/// Agents are created once at warm-up and never destroyed. A bound agent is never
/// returned to the pool, so the number of agents bounds the number of sessions.
pub struct AgentPool<M>
where
    M: PolicyValueModel + SyncModel,
{
    agents: Vec<AgentHandle<M>>,
    bindings: RwLock<Bindings>,
}

impl<M> AgentPool<M>
where
    M: PolicyValueModel + SyncModel,
{
    /// Creates `config.n_workers` agents, building the model of agent `i` with `build_model(i)`.
    pub fn build<F>(
        config: &AgentPoolConfig,
        agent_config: &AgentCoreConfig,
        mut build_model: F,
    ) -> Result<Self>
    where
        F: FnMut(usize) -> Result<M>,
    {
        let agents = (0..config.n_workers)
            .map(|id| {
                let agent = AgentCore::build(id, agent_config.clone(), build_model(id)?)?;
                Ok(AgentHandle {
                    id,
                    agent: Arc::new(Mutex::new(agent)),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        info!("Created {} agents", agents.len());

        Ok(Self {
            bindings: RwLock::new(Bindings {
                available: (0..agents.len()).collect(),
                sessions: HashMap::new(),
            }),
            agents,
        })
    }

    /// Returns the agent bound to `session`, binding a free one if the session is new.
    ///
    /// Free agents are taken in creation order. Fails with [`LisError::PoolExhausted`]
    /// if the session is new and no agent is left.
    pub fn resolve_or_bind(&self, session: &str) -> Result<AgentHandle<M>> {
        if let Ok(handle) = self.resolve(session) {
            return Ok(handle);
        }

        let mut bindings = self.bindings.write().unwrap_or_else(|e| e.into_inner());

        // Another thread may have bound the session since the read above.
        if let Some(&id) = bindings.sessions.get(session) {
            return Ok(self.agents[id].clone());
        }

        match bindings.available.pop_front() {
            Some(id) => {
                bindings.sessions.insert(session.to_string(), id);
                info!(
                    "Bound session {} to agent {} ({} agents left)",
                    session,
                    id,
                    bindings.available.len()
                );
                Ok(self.agents[id].clone())
            }
            None => Err(LisError::PoolExhausted(session.to_string()))?,
        }
    }

    /// Returns the agent bound to `session`.
    ///
    /// Fails with [`LisError::UnknownSession`] if the session has never been bound.
    pub fn resolve(&self, session: &str) -> Result<AgentHandle<M>> {
        let bindings = self.bindings.read().unwrap_or_else(|e| e.into_inner());
        match bindings.sessions.get(session) {
            Some(&id) => Ok(self.agents[id].clone()),
            None => Err(LisError::UnknownSession(session.to_string()))?,
        }
    }

    /// Runs `body` on the agent of `session` while holding the session lock.
    ///
    /// The lock is released on every exit of `body`, including errors and panics.
    /// Sessions never contend with each other. Fails with [`LisError::UnknownSession`]
    /// if the session is not bound.
    pub fn with_session_lock<T, F>(&self, session: &str, body: F) -> Result<T>
    where
        F: FnOnce(&mut AgentCore<M>) -> Result<T>,
    {
        let handle = self.resolve(session)?;
        let mut agent = handle.lock();
        body(&mut agent)
    }

    /// Number of agents in the pool, bound or not.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Returns `true` if the pool has no agent.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Number of agents not bound to any session.
    pub fn n_available(&self) -> usize {
        let bindings = self.bindings.read().unwrap_or_else(|e| e.into_inner());
        bindings.available.len()
    }

    /// Number of bound sessions.
    pub fn n_sessions(&self) -> usize {
        let bindings = self.bindings.read().unwrap_or_else(|e| e.into_inner());
        bindings.sessions.len()
    }

    /// Counters of all agents, in creation order.
    ///
    /// Waits for running operations of each agent.
    pub fn stats(&self) -> Vec<AgentStat> {
        self.agents.iter().map(|h| h.lock().stat().clone()).collect()
    }
}
