//! Latency-only performance signal

use super::types::PerformanceScore;

/// Each full window of this many milliseconds costs one point
pub const LATENCY_WINDOW_MS: u64 = 5_000;

/// `clamp(10 - floor(ms / 5000), 1, 10)`
pub fn estimate(time_spent_ms: u64) -> PerformanceScore {
    let penalty = (time_spent_ms / LATENCY_WINDOW_MS).min(i64::MAX as u64) as i64;
    PerformanceScore::clamped(10 - penalty)
}
