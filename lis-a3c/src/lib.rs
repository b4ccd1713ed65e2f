//! Asynchronous advantage actor-critic agents serving remote sessions.
//!
//! * [`AgentCore`] runs online n-step actor-critic learning for one episode-playing client.
//!   It records transitions with a one-step delay, trains every `rollout_len` steps or at
//!   the end of an episode, and pulls the global parameters after each update.
//! * [`AgentPool`] holds a fixed number of agents created at warm-up. A session is bound
//!   to an agent on first contact and stays bound for the lifetime of the pool.
//! * [`SessionService`] is the request boundary: `create`, `step`, `reset` and `flush`.
//!
//! Operations on one session are serialized by the lock of its agent. Operations on
//! different sessions run in parallel, including updates of the shared global model.
mod agent_core;
mod agent_pool;
mod service;
pub use agent_core::{agent_stats_fmt, AgentCore, AgentCoreConfig, AgentPhase, AgentStat};
pub use agent_pool::{AgentHandle, AgentPool, AgentPoolConfig};
pub use service::{EpisodeSummary, EpisodeTally, SessionService};
