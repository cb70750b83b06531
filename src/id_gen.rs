//! Event and alert identifier generation.
//!
//! IDs are `EVT-<YYYYMMDD>-<8hex>` / `ALERT-<YYYYMMDD>-<8hex>`. The date
//! segment is wall-clock "today" in UTC; the suffix is random unless a
//! [`DeterministicIdGuard`] is active on the current thread, in which case
//! it is derived from a frozen clock, a seed, and a monotonic counter so
//! replayed runs produce byte-identical artifacts.

use std::cell::RefCell;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

thread_local! {
    static DETERMINISTIC_CONTEXT: RefCell<Option<DeterministicState>> = RefCell::new(None);
}

struct DeterministicState {
    frozen_now: DateTime<Utc>,
    seed: u64,
    counter: u64,
}

/// Scoped guard that pins ID generation on the current thread to a frozen
/// clock and a deterministic counter. Dropping the guard restores normal
/// (random) ID generation. Used by replay/golden-file tests and by strict
/// mode runs that must be byte-reproducible.
pub struct DeterministicIdGuard {
    _private: (),
}

impl DeterministicIdGuard {
    pub fn install(frozen_now: DateTime<Utc>, seed: u64) -> Self {
        DETERMINISTIC_CONTEXT.with(|cell| {
            *cell.borrow_mut() = Some(DeterministicState {
                frozen_now,
                seed,
                counter: 0,
            });
        });
        DeterministicIdGuard { _private: () }
    }
}

impl Drop for DeterministicIdGuard {
    fn drop(&mut self) {
        DETERMINISTIC_CONTEXT.with(|cell| {
            *cell.borrow_mut() = None;
        });
    }
}

fn date_segment(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d").to_string()
}

fn next_suffix(now: DateTime<Utc>) -> (String, String) {
    let has_context = DETERMINISTIC_CONTEXT.with(|cell| cell.borrow().is_some());
    if has_context {
        DETERMINISTIC_CONTEXT.with(|cell| {
            let mut guard = cell.borrow_mut();
            let state = guard.as_mut().expect("checked above");
            let date = date_segment(state.frozen_now);
            let mut hasher = Sha256::new();
            hasher.update(state.seed.to_le_bytes());
            hasher.update(state.counter.to_le_bytes());
            state.counter += 1;
            let digest = hasher.finalize();
            let suffix = hex::encode(&digest[..4]);
            (date, suffix)
        })
    } else {
        let suffix = Uuid::new_v4().simple().to_string()[..8].to_string();
        (date_segment(now), suffix)
    }
}

pub fn new_event_id(now: DateTime<Utc>) -> String {
    let (date, suffix) = next_suffix(now);
    format!("EVT-{date}-{suffix}")
}

pub fn new_alert_id(now: DateTime<Utc>) -> String {
    let (date, suffix) = next_suffix(now);
    format!("ALERT-{date}-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn deterministic_context_is_reproducible() {
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap();
        let first = {
            let _guard = DeterministicIdGuard::install(now, 42);
            vec![new_event_id(now), new_event_id(now), new_alert_id(now)]
        };
        let second = {
            let _guard = DeterministicIdGuard::install(now, 42);
            vec![new_event_id(now), new_event_id(now), new_alert_id(now)]
        };
        assert_eq!(first, second);
    }

    #[test]
    fn ids_carry_expected_prefix_and_date() {
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap();
        let _guard = DeterministicIdGuard::install(now, 1);
        let evt = new_event_id(now);
        assert!(evt.starts_with("EVT-20260728-"));
        let alert = new_alert_id(now);
        assert!(alert.starts_with("ALERT-20260728-"));
    }

    #[test]
    fn without_context_ids_are_random() {
        let now = Utc::now();
        let a = new_event_id(now);
        let b = new_event_id(now);
        assert_ne!(a, b);
    }
}
