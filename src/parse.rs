//! Parsing utilities for human-readable configuration values

use std::time::Duration;

/// Parse duration string (e.g., "30s", "15m", "1h", "7d", "500ms")
///
/// Returns `None` if the value cannot be parsed, so callers can fall
/// back to their own policy default.
///
/// # Supported formats
/// - `"7d"` - days
/// - `"1h"` - hours
/// - `"15m"` - minutes
/// - `"30s"` or `"30"` - seconds
/// - `"500ms"` - milliseconds
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim().to_lowercase();
    let (num_str, multiplier) = if s.ends_with("ms") {
        (&s[..s.len()-2], 1)
    } else if s.ends_with('s') {
        (&s[..s.len()-1], 1000)
    } else if s.ends_with('m') {
        (&s[..s.len()-1], 60 * 1000)
    } else if s.ends_with('h') {
        (&s[..s.len()-1], 60 * 60 * 1000)
    } else if s.ends_with('d') {
        (&s[..s.len()-1], 24 * 60 * 60 * 1000)
    } else {
        (s.as_str(), 1000)
    };

    num_str.trim().parse::<u64>()
        .ok()
        .map(|n| Duration::from_millis(n * multiplier))
}
