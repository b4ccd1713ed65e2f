use super::RolloutSegment;

/// Computes n-step discounted returns and advantages of a segment.
///
/// Returns are accumulated backwards from `bootstrap_value`:
/// `returns[L-1] = reward[L-1] + gamma * bootstrap_value` and
/// `returns[i] = reward[i] + gamma * returns[i+1]`.
/// Advantages are `returns[i] - value[i]`.
pub fn compute_returns(
    segment: &RolloutSegment,
    bootstrap_value: f32,
    gamma: f32,
) -> (Vec<f32>, Vec<f32>) {
    let mut returns = vec![0.0; segment.len()];
    let mut acc = bootstrap_value;
    for (i, tr) in segment.transitions().iter().enumerate().rev() {
        acc = tr.reward + gamma * acc;
        returns[i] = acc;
    }
    let advantages = returns
        .iter()
        .zip(segment.transitions())
        .map(|(r, tr)| r - tr.value)
        .collect();

    (returns, advantages)
}
