//! Staleness rule shared by movie records and list snapshots.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Default time-to-live for cached records and snapshots.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Whether something refreshed at `last_refreshed` is still usable at `now`.
///
/// Never-refreshed entries are always stale. A timestamp ahead of `now`
/// (clock skew between writers) counts as fresh.
pub fn is_fresh(last_refreshed: Option<DateTime<Utc>>, now: DateTime<Utc>, ttl: Duration) -> bool {
    let Some(last) = last_refreshed else {
        return false;
    };

    match (now - last).to_std() {
        Ok(age) => age < ttl,
        // Negative age
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn never_refreshed_is_stale() {
        assert!(!is_fresh(None, Utc::now(), DEFAULT_TTL));
    }

    #[test]
    fn within_ttl_is_fresh() {
        let now = Utc::now();
        let refreshed = now - TimeDelta::hours(23);
        assert!(is_fresh(Some(refreshed), now, DEFAULT_TTL));
    }

    #[test]
    fn at_or_past_ttl_is_stale() {
        let now = Utc::now();
        assert!(!is_fresh(Some(now - TimeDelta::hours(24)), now, DEFAULT_TTL));
        assert!(!is_fresh(Some(now - TimeDelta::days(3)), now, DEFAULT_TTL));
    }

    #[test]
    fn future_timestamp_is_fresh() {
        let now = Utc::now();
        assert!(is_fresh(Some(now + TimeDelta::minutes(5)), now, DEFAULT_TTL));
    }

    #[test]
    fn zero_ttl_is_always_stale() {
        let now = Utc::now();
        assert!(!is_fresh(Some(now), now, Duration::ZERO));
    }
}
