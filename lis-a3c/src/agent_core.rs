//! Online learning core of a single agent.
mod base;
mod config;
mod stat;
pub use base::{AgentCore, AgentPhase};
pub use config::AgentCoreConfig;
pub use stat::{agent_stats_fmt, AgentStat};
