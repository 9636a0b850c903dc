//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Exponential delay for a zero-based attempt index, capped at `max`.
///
/// `delay = min(max, base * exponential_base ^ attempt_index)`
pub fn calculate_backoff(attempt_index: u32, base: Duration, max: Duration, exponential_base: f64) -> Duration {
    let exponent = i32::try_from(attempt_index).unwrap_or(i32::MAX);
    let factor = exponential_base.max(1.0).powi(exponent);
    let delay_ms = base.as_millis() as f64 * factor;
    let max_ms = max.as_millis() as f64;

    if !delay_ms.is_finite() || delay_ms >= max_ms {
        return max;
    }
    Duration::from_millis(delay_ms as u64)
}

/// Scale `delay` by a uniform random factor in `[0.5, 1.0]`.
pub fn apply_jitter(delay: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(0.5..=1.0);
    delay.mul_f64(factor)
}
