//! Sqlite-backed implementations of the collaborator contracts in
//! `conclave_core::services`, plus in-memory doubles for tests.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use conclave_core::ServiceError;

pub mod calendar;
pub mod crm;
pub mod feedback;
pub mod memory;
pub mod mission;
pub mod package;
pub mod project;
pub mod quote;
pub mod roster;
pub mod session;

pub use calendar::SqlCalendarService;
pub use crm::SqlCrmService;
pub use feedback::SqlFeedbackWriter;
pub use memory::{
    FeedbackRecord, InMemoryAgentRoster, InMemoryCalendarService, InMemoryCrmService,
    InMemoryFeedbackWriter, InMemoryMissionService, InMemoryPackageStore, InMemoryProjectService,
    InMemoryQuoteService, InMemorySessionService,
};
pub use mission::SqlMissionService;
pub use package::SqlPackageStore;
pub use project::SqlProjectService;
pub use quote::SqlQuoteService;
pub use roster::SqlAgentRoster;
pub use session::SqlSessionService;

pub(crate) fn storage(error: sqlx::Error) -> ServiceError {
    ServiceError::Storage(error.to_string())
}

pub(crate) fn decode(detail: impl Into<String>) -> ServiceError {
    ServiceError::Storage(format!("decode error: {}", detail.into()))
}

pub(crate) fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, ServiceError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| decode(format!("invalid timestamp in `{column}`: `{value}` ({error})")))
}

pub(crate) fn encode_json<T: Serialize>(column: &str, value: &T) -> Result<String, ServiceError> {
    serde_json::to_string(value)
        .map_err(|error| decode(format!("cannot encode `{column}`: {error}")))
}

pub(crate) fn decode_json<T: DeserializeOwned>(column: &str, raw: &str) -> Result<T, ServiceError> {
    serde_json::from_str(raw).map_err(|error| decode(format!("invalid `{column}`: {error}")))
}
