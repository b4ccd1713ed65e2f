//! Fixed pool of agents and the session binding table.
mod base;
mod config;
pub use base::{AgentHandle, AgentPool};
pub use config::AgentPoolConfig;
