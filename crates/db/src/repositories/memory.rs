//! In-memory service doubles backing engine and command tests.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use conclave_core::domain::calendar::CalendarEvent;
use conclave_core::domain::crm::{Company, Contact, CrmSnapshot, Deal, Pipeline};
use conclave_core::domain::mission::Mission;
use conclave_core::domain::package::{CrmDetails, CrmKind, ResolutionItem, ResolutionPackage};
use conclave_core::domain::project::Project;
use conclave_core::domain::quote::Quote;
use conclave_core::domain::session::{AgentProfile, Session, SessionMetadata};
use conclave_core::services::{
    AgentRoster, CalendarService, CrmService, FeedbackVerdict, FeedbackWriter, MissionService,
    PackageRepository, ProjectService, QuoteService, SessionService,
};
use conclave_core::ServiceError;

#[derive(Default)]
pub struct InMemoryPackageStore {
    packages: RwLock<HashMap<String, ResolutionPackage>>,
}

impl InMemoryPackageStore {
    pub async fn insert(&self, package: ResolutionPackage) {
        self.packages.write().await.insert(package.session_id.clone(), package);
    }
}

#[async_trait::async_trait]
impl PackageRepository for InMemoryPackageStore {
    async fn find_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<ResolutionPackage>, ServiceError> {
        Ok(self.packages.read().await.get(session_id).cloned())
    }

    async fn save(&self, package: &ResolutionPackage) -> Result<(), ServiceError> {
        self.packages.write().await.insert(package.session_id.clone(), package.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAgentRoster {
    agents: Vec<AgentProfile>,
}

impl InMemoryAgentRoster {
    pub fn new(agents: Vec<AgentProfile>) -> Self {
        Self { agents }
    }
}

#[async_trait::async_trait]
impl AgentRoster for InMemoryAgentRoster {
    async fn list_agents(&self) -> Result<Vec<AgentProfile>, ServiceError> {
        Ok(self.agents.clone())
    }
}

#[derive(Default)]
pub struct InMemoryMissionService {
    existing_ids: HashSet<String>,
    created: RwLock<Vec<Mission>>,
}

impl InMemoryMissionService {
    /// Pre-registers ids `mission_exists` should acknowledge without a
    /// matching created mission.
    pub fn with_existing(ids: impl IntoIterator<Item = String>) -> Self {
        Self { existing_ids: ids.into_iter().collect(), created: RwLock::default() }
    }

    pub async fn created(&self) -> Vec<Mission> {
        self.created.read().await.clone()
    }
}

#[async_trait::async_trait]
impl MissionService for InMemoryMissionService {
    async fn create_mission(&self, mission: &Mission) -> Result<(), ServiceError> {
        self.created.write().await.push(mission.clone());
        Ok(())
    }

    async fn mission_exists(&self, mission_id: &str) -> Result<bool, ServiceError> {
        if self.existing_ids.contains(mission_id) {
            return Ok(true);
        }
        Ok(self.created.read().await.iter().any(|mission| mission.id == mission_id))
    }
}

#[derive(Default)]
pub struct InMemorySessionService {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionService {
    pub async fn insert(&self, session: Session) {
        self.sessions.write().await.insert(session.id.clone(), session);
    }

    pub async fn created_sessions(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self.sessions.read().await.values().cloned().collect();
        sessions.sort_by(|a, b| a.id.cmp(&b.id));
        sessions
    }
}

#[async_trait::async_trait]
impl SessionService for InMemorySessionService {
    async fn get_session(&self, session_id: &str) -> Result<Session, ServiceError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("session `{session_id}`")))
    }

    async fn create_session(&self, session: &Session) -> Result<(), ServiceError> {
        self.sessions.write().await.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn update_metadata(
        &self,
        session_id: &str,
        metadata: &SessionMetadata,
    ) -> Result<(), ServiceError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| ServiceError::NotFound(format!("session `{session_id}`")))?;
        session.metadata = metadata.clone();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCrmService {
    snapshot: CrmSnapshot,
    companies: RwLock<Vec<Company>>,
    contacts: RwLock<Vec<Contact>>,
    deals: RwLock<Vec<Deal>>,
    updates: RwLock<Vec<(CrmKind, String, CrmDetails)>>,
    default_pipeline: Option<Pipeline>,
}

impl InMemoryCrmService {
    pub fn new(snapshot: CrmSnapshot, default_pipeline: Option<Pipeline>) -> Self {
        Self { snapshot, default_pipeline, ..Self::default() }
    }

    pub async fn created_companies(&self) -> Vec<Company> {
        self.companies.read().await.clone()
    }

    pub async fn created_contacts(&self) -> Vec<Contact> {
        self.contacts.read().await.clone()
    }

    pub async fn created_deals(&self) -> Vec<Deal> {
        self.deals.read().await.clone()
    }

    pub async fn updates(&self) -> Vec<(CrmKind, String, CrmDetails)> {
        self.updates.read().await.clone()
    }
}

#[async_trait::async_trait]
impl CrmService for InMemoryCrmService {
    async fn snapshot(&self) -> Result<CrmSnapshot, ServiceError> {
        Ok(self.snapshot.clone())
    }

    async fn create_company(&self, company: &Company) -> Result<(), ServiceError> {
        self.companies.write().await.push(company.clone());
        Ok(())
    }

    async fn create_contact(&self, contact: &Contact) -> Result<(), ServiceError> {
        self.contacts.write().await.push(contact.clone());
        Ok(())
    }

    async fn create_deal(&self, deal: &Deal) -> Result<(), ServiceError> {
        self.deals.write().await.push(deal.clone());
        Ok(())
    }

    async fn update_entity(
        &self,
        kind: CrmKind,
        entity_id: &str,
        details: &CrmDetails,
    ) -> Result<(), ServiceError> {
        self.updates.write().await.push((kind, entity_id.to_string(), details.clone()));
        Ok(())
    }

    async fn default_pipeline(&self) -> Result<Option<Pipeline>, ServiceError> {
        Ok(self.default_pipeline.clone())
    }
}

#[derive(Default)]
pub struct InMemoryCalendarService {
    events: RwLock<Vec<CalendarEvent>>,
}

impl InMemoryCalendarService {
    pub async fn created_events(&self) -> Vec<CalendarEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait::async_trait]
impl CalendarService for InMemoryCalendarService {
    async fn create_event(&self, event: &CalendarEvent) -> Result<(), ServiceError> {
        self.events.write().await.push(event.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryQuoteService {
    seed_number: Option<String>,
    quotes: RwLock<Vec<Quote>>,
}

impl InMemoryQuoteService {
    pub fn with_last_number(number: impl Into<String>) -> Self {
        Self { seed_number: Some(number.into()), quotes: RwLock::default() }
    }

    pub async fn created_quotes(&self) -> Vec<Quote> {
        self.quotes.read().await.clone()
    }
}

#[async_trait::async_trait]
impl QuoteService for InMemoryQuoteService {
    async fn last_quote_number(&self) -> Result<Option<String>, ServiceError> {
        let quotes = self.quotes.read().await;
        Ok(quotes.last().map(|quote| quote.number.clone()).or_else(|| self.seed_number.clone()))
    }

    async fn create_quote(&self, quote: &Quote) -> Result<(), ServiceError> {
        self.quotes.write().await.push(quote.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryProjectService {
    projects: RwLock<Vec<Project>>,
    links: RwLock<Vec<(String, Vec<String>)>>,
}

impl InMemoryProjectService {
    pub async fn created_projects(&self) -> Vec<Project> {
        self.projects.read().await.clone()
    }

    pub async fn links(&self) -> Vec<(String, Vec<String>)> {
        self.links.read().await.clone()
    }
}

#[async_trait::async_trait]
impl ProjectService for InMemoryProjectService {
    async fn create_project(&self, project: &Project) -> Result<(), ServiceError> {
        self.projects.write().await.push(project.clone());
        Ok(())
    }

    async fn link_missions(
        &self,
        project_id: &str,
        mission_ids: &[String],
    ) -> Result<(), ServiceError> {
        self.links.write().await.push((project_id.to_string(), mission_ids.to_vec()));
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FeedbackRecord {
    ItemVerdict { session_id: String, item_id: String, verdict: FeedbackVerdict },
    BatchOutcome { session_id: String, item_ids: Vec<String> },
}

#[derive(Default)]
pub struct InMemoryFeedbackWriter {
    records: RwLock<Vec<FeedbackRecord>>,
}

impl InMemoryFeedbackWriter {
    pub async fn records(&self) -> Vec<FeedbackRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait::async_trait]
impl FeedbackWriter for InMemoryFeedbackWriter {
    async fn record_item_verdict(
        &self,
        session_id: &str,
        _session_title: &str,
        item: &ResolutionItem,
        verdict: FeedbackVerdict,
    ) -> Result<(), ServiceError> {
        self.records.write().await.push(FeedbackRecord::ItemVerdict {
            session_id: session_id.to_string(),
            item_id: item.id.clone(),
            verdict,
        });
        Ok(())
    }

    async fn record_batch_outcome(
        &self,
        session_id: &str,
        _session_title: &str,
        items: &[ResolutionItem],
    ) -> Result<(), ServiceError> {
        self.records.write().await.push(FeedbackRecord::BatchOutcome {
            session_id: session_id.to_string(),
            item_ids: items.iter().map(|item| item.id.clone()).collect(),
        });
        Ok(())
    }
}
