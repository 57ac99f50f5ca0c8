use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::package::ResolutionMode;

/// A multi-party decision-making session between autonomous agents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub mode: ResolutionMode,
    pub participant_ids: Vec<String>,
    #[serde(default)]
    pub metadata: SessionMetadata,
    pub created_at: DateTime<Utc>,
}

/// Session metadata the engine reads and writes.
///
/// `follow_up_depth` is the recursion counter bounding chains of sessions
/// spawning further sessions; `parent_session_id` is the back-reference
/// recorded on follow-ups, and `spawned_follow_up_ids` the forward links
/// written onto the parent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(default)]
    pub follow_up_depth: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spawned_follow_up_ids: Vec<String>,
    #[serde(default)]
    pub auto_start: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub agent_id: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// Roster entry for a known agent identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,
    pub display_name: String,
}
