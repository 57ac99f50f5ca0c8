use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub attendee_ids: Vec<String>,
    pub session_id: String,
}

/// Outcome of resolving a proposed event start against the current time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolvedStart {
    AsProposed(DateTime<Utc>),
    /// The proposal carried a stale date. The intent is still actionable,
    /// so the event moves to the following day at the same hour/minute.
    MovedToNextDay(DateTime<Utc>),
}

impl ResolvedStart {
    pub fn start(&self) -> DateTime<Utc> {
        match self {
            Self::AsProposed(at) | Self::MovedToNextDay(at) => *at,
        }
    }
}

/// A start time in the past is not discarded; it is rescheduled to the same
/// hour/minute on the day after `now`.
pub fn resolve_start(starts_at: DateTime<Utc>, now: DateTime<Utc>) -> ResolvedStart {
    if starts_at >= now {
        return ResolvedStart::AsProposed(starts_at);
    }

    let time = starts_at.time();
    let candidate = (now + Duration::days(1)).date_naive().and_time(time).and_utc();
    ResolvedStart::MovedToNextDay(candidate)
}
