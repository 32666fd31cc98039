use bth_common::time::is_stale;

/// Returns whether a message timestamped `timestamp_ms` is still fresh
/// relative to `now_ms`, given a `max_age_ms` tolerance.
pub fn is_fresh(timestamp_ms: i64, max_age_ms: i64, now_ms: i64) -> bool {
    !is_stale(timestamp_ms, max_age_ms, now_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_window_is_fresh() {
        assert!(is_fresh(1_000, 500, 1_200));
    }

    #[test]
    fn outside_window_is_not_fresh() {
        assert!(!is_fresh(1_000, 100, 2_000));
    }

    #[test]
    fn future_timestamp_is_not_fresh() {
        assert!(!is_fresh(2_000, 500, 1_000));
    }
}
