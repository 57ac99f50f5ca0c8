pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod services;

pub use config::{AppConfig, ConfigError, DatabaseConfig, EngineConfig, LlmConfig, LoggingConfig};
pub use domain::calendar::{resolve_start, CalendarEvent, ResolvedStart};
pub use domain::crm::{
    split_contact_name, Company, Contact, CrmSnapshot, CustomerKind, CustomerMatch, Deal,
    Pipeline, PipelineStage,
};
pub use domain::mission::{normalize_schedule, Mission, MissionPhase, MissionPriority};
pub use domain::package::{
    CrmAction, CrmDetails, CrmItemData, CrmKind, DocumentData, EventData, FollowUpData, ItemData,
    ItemStatus, ItemType, MissionData, ProjectData, QuoteData, QuoteLineData, ResolutionItem,
    ResolutionMode, ResolutionPackage,
};
pub use domain::project::Project;
pub use domain::quote::{next_quote_number, CustomerRef, Quote, QuoteLine};
pub use domain::session::{AgentProfile, Session, SessionMetadata, TranscriptMessage};
pub use engine::{EngineServices, PackageEngine};
pub use errors::{DomainError, ExecutorError, ServiceError};
pub use services::{
    AgentRoster, CalendarService, CrmService, FeedbackVerdict, FeedbackWriter, MissionService,
    PackageRepository, ProjectService, QuoteService, SessionService,
};
