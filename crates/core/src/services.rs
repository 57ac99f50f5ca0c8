//! Collaborator contracts consumed by the engine.
//!
//! Each external subsystem (roster, missions, sessions, CRM, calendar,
//! quotes, projects, feedback memory) exposes a narrow create/update
//! contract here; implementations live in `conclave-db`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::calendar::CalendarEvent;
use crate::domain::crm::{Company, Contact, CrmSnapshot, Deal, Pipeline};
use crate::domain::mission::Mission;
use crate::domain::package::{CrmDetails, CrmKind, ResolutionItem, ResolutionPackage};
use crate::domain::project::Project;
use crate::domain::quote::Quote;
use crate::domain::session::{AgentProfile, Session, SessionMetadata};
use crate::errors::ServiceError;

/// Persists packages as whole snapshots: `save` replaces the prior copy,
/// there is no field-level merge at the storage boundary.
#[async_trait]
pub trait PackageRepository: Send + Sync {
    async fn find_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<ResolutionPackage>, ServiceError>;

    async fn save(&self, package: &ResolutionPackage) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait AgentRoster: Send + Sync {
    async fn list_agents(&self) -> Result<Vec<AgentProfile>, ServiceError>;
}

#[async_trait]
pub trait MissionService: Send + Sync {
    async fn create_mission(&self, mission: &Mission) -> Result<(), ServiceError>;
    async fn mission_exists(&self, mission_id: &str) -> Result<bool, ServiceError>;
}

#[async_trait]
pub trait SessionService: Send + Sync {
    async fn get_session(&self, session_id: &str) -> Result<Session, ServiceError>;
    async fn create_session(&self, session: &Session) -> Result<(), ServiceError>;
    async fn update_metadata(
        &self,
        session_id: &str,
        metadata: &SessionMetadata,
    ) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait CrmService: Send + Sync {
    async fn snapshot(&self) -> Result<CrmSnapshot, ServiceError>;
    async fn create_company(&self, company: &Company) -> Result<(), ServiceError>;
    async fn create_contact(&self, contact: &Contact) -> Result<(), ServiceError>;
    async fn create_deal(&self, deal: &Deal) -> Result<(), ServiceError>;
    async fn update_entity(
        &self,
        kind: CrmKind,
        entity_id: &str,
        details: &CrmDetails,
    ) -> Result<(), ServiceError>;
    async fn default_pipeline(&self) -> Result<Option<Pipeline>, ServiceError>;
}

#[async_trait]
pub trait CalendarService: Send + Sync {
    async fn create_event(&self, event: &CalendarEvent) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait QuoteService: Send + Sync {
    /// Number of the most recently created quote, if any.
    async fn last_quote_number(&self) -> Result<Option<String>, ServiceError>;
    async fn create_quote(&self, quote: &Quote) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait ProjectService: Send + Sync {
    async fn create_project(&self, project: &Project) -> Result<(), ServiceError>;
    async fn link_missions(
        &self,
        project_id: &str,
        mission_ids: &[String],
    ) -> Result<(), ServiceError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackVerdict {
    Approved,
    Rejected,
}

/// Emits structured decision records to the shared memory store agents
/// read back later. Engine callers treat failures as best-effort.
#[async_trait]
pub trait FeedbackWriter: Send + Sync {
    async fn record_item_verdict(
        &self,
        session_id: &str,
        session_title: &str,
        item: &ResolutionItem,
        verdict: FeedbackVerdict,
    ) -> Result<(), ServiceError>;

    async fn record_batch_outcome(
        &self,
        session_id: &str,
        session_title: &str,
        items: &[ResolutionItem],
    ) -> Result<(), ServiceError>;
}
