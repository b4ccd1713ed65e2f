/// Counters of an [`AgentCore`](crate::AgentCore).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AgentStat {
    /// The number of observations scored with training enabled.
    pub env_steps: usize,

    /// The number of updates applied to the global model.
    pub train_steps: usize,

    /// The number of updates skipped because of NaN or infinity.
    pub skipped_train_steps: usize,

    /// The number of finished episodes.
    pub episodes: usize,
}

/// Returns a formatted string of the set of [`AgentStat`] for reporting.
pub fn agent_stats_fmt(stats: &[AgentStat]) -> String {
    let mut s = "agent id, env steps, train steps, skipped, episodes\n".to_string();
    for (i, stat) in stats.iter().enumerate() {
        s += format!(
            "{}, {}, {}, {}, {}\n",
            i, stat.env_steps, stat.train_steps, stat.skipped_train_steps, stat.episodes
        )
        .as_str();
    }
    s
}
