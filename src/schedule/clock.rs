use chrono::NaiveDateTime;
use std::time::Duration;

/// The next local midnight strictly after `now`.
pub fn next_midnight(now: NaiveDateTime) -> NaiveDateTime {
    now.date()
        .succ_opt()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .unwrap_or(now)
}

/// How long to sleep from `now` to reach `target`, saturating at zero when
/// the target already passed.
pub fn span_until(now: NaiveDateTime, target: NaiveDateTime) -> Duration {
    (target - now).to_std().unwrap_or(Duration::ZERO)
}
