//! Shared timestamp and identifier helpers.

use chrono::{SecondsFormat, Utc};
use ulid::Ulid;

/// Current UTC time as RFC 3339 with microseconds and a `Z` suffix
/// (e.g. `2026-10-19T08:15:02.123456Z`).
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn new_event_id() -> String {
    Ulid::new().to_string()
}
