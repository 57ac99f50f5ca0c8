use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionPhase {
    /// Awaiting human review before any autonomous worker may pick it up.
    PendingReview,
    Approved,
    InProgress,
    Done,
}

impl MissionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingReview => "pending_review",
            Self::Approved => "approved",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending_review" => Some(Self::PendingReview),
            "approved" => Some(Self::Approved),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionPriority {
    Low,
    #[default]
    Normal,
    High,
}

impl MissionPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }

    /// Lenient parse for model-proposed priority strings.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "high" | "urgent" | "critical" => Self::High,
            _ => Self::Normal,
        }
    }
}

/// A task assigned to an agent, created from a `mission` or `document` item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: String,
    pub title: String,
    pub description: String,
    pub agent_id: String,
    pub priority: MissionPriority,
    pub phase: MissionPhase,
    pub scheduled_at: DateTime<Utc>,
    pub session_id: String,
}

/// Normalizes a model-proposed schedule: unparsable values and anything in
/// the past collapse to `now`. Past timestamps must never be honored
/// verbatim or a downstream scheduler would read them as extreme urgency.
pub fn normalize_schedule(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let parsed = raw
        .and_then(|value| DateTime::parse_from_rfc3339(value.trim()).ok())
        .map(|value| value.with_timezone(&Utc));

    match parsed {
        Some(at) if at > now => at,
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{normalize_schedule, MissionPriority};

    #[test]
    fn future_schedule_is_kept() {
        let now = Utc::now();
        let future = now + Duration::hours(6);
        let normalized = normalize_schedule(Some(&future.to_rfc3339()), now);
        assert_eq!(normalized, future);
    }

    #[test]
    fn past_schedule_collapses_to_now() {
        let now = Utc::now();
        let normalized = normalize_schedule(Some("2019-01-01T00:00:00Z"), now);
        assert_eq!(normalized, now);
    }

    #[test]
    fn unparsable_schedule_collapses_to_now() {
        let now = Utc::now();
        assert_eq!(normalize_schedule(Some("next tuesday-ish"), now), now);
        assert_eq!(normalize_schedule(None, now), now);
    }

    #[test]
    fn priority_parses_leniently() {
        assert_eq!(MissionPriority::parse_lenient("HIGH"), MissionPriority::High);
        assert_eq!(MissionPriority::parse_lenient("urgent"), MissionPriority::High);
        assert_eq!(MissionPriority::parse_lenient("low"), MissionPriority::Low);
        assert_eq!(MissionPriority::parse_lenient("whenever"), MissionPriority::Normal);
    }
}
