//! Which streams are due for a re-scan.
//!
//! A stream is stale when it is enabled, not deleted, not already queued for
//! a scan, and either has never been scanned or was last scanned at least
//! [`STALENESS_TTL_HOURS`] ago. [`stale_filter`] and [`is_eligible`] encode
//! the same rule; the first runs in the store, the second in process.

use crate::models::{ScanState, Stream};
use crate::query::{FilterTree, Predicate};
use chrono::{DateTime, Duration, Utc};
use mongodb::bson::{self, Bson};

pub const STALENESS_TTL_HOURS: i64 = 12;

/// States that already have a scan in flight.
pub const IN_FLIGHT_STATES: [ScanState; 1] = [ScanState::ScanQueued];

pub fn staleness_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(STALENESS_TTL_HOURS)
}

/// Store filter selecting stale streams as of `now`.
///
/// The root is an AND node so the security rewrite appends to it. Rows
/// without `enabled` or `deleted` columns count as enabled and not deleted,
/// matching how [`Stream`] reads them.
pub fn stale_filter(now: DateTime<Utc>) -> FilterTree {
    let cutoff = bson::DateTime::from_chrono(staleness_cutoff(now));
    let in_flight = IN_FLIGHT_STATES
        .iter()
        .map(|s| Bson::String(s.as_str().to_string()))
        .collect();

    FilterTree::and([
        FilterTree::fields([
            Predicate::ne("enabled", false),
            Predicate::ne("deleted", true),
            Predicate::not_in("state", in_flight),
        ]),
        FilterTree::or([
            FilterTree::field(Predicate::is_set("scannedAt", false)),
            FilterTree::field(Predicate::lte("scannedAt", cutoff)),
        ]),
    ])
}

pub fn is_eligible(stream: &Stream, now: DateTime<Utc>) -> bool {
    if !stream.enabled || stream.deleted {
        return false;
    }
    if stream
        .state
        .is_some_and(|state| IN_FLIGHT_STATES.contains(&state))
    {
        return false;
    }
    match stream.scanned_at_utc() {
        None => true,
        Some(at) => at <= staleness_cutoff(now),
    }
}
