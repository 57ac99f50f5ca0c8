//! Resolution package engine: approval operations and the execution
//! dispatcher.
//!
//! The dispatcher processes one package at a time, strictly in package
//! order, persisting the whole package after every item so partial
//! progress survives a crash mid-batch. One item's failure never aborts
//! the batch.

mod executors;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::domain::package::ResolutionPackage;
use crate::errors::{ExecutorError, ServiceError};
use crate::services::{
    AgentRoster, CalendarService, CrmService, FeedbackVerdict, FeedbackWriter, MissionService,
    PackageRepository, ProjectService, QuoteService, SessionService,
};

/// Collaborator handles the engine executes against.
#[derive(Clone)]
pub struct EngineServices {
    pub packages: Arc<dyn PackageRepository>,
    pub roster: Arc<dyn AgentRoster>,
    pub missions: Arc<dyn MissionService>,
    pub sessions: Arc<dyn SessionService>,
    pub crm: Arc<dyn CrmService>,
    pub calendar: Arc<dyn CalendarService>,
    pub quotes: Arc<dyn QuoteService>,
    pub projects: Arc<dyn ProjectService>,
    pub feedback: Arc<dyn FeedbackWriter>,
}

pub struct PackageEngine {
    config: EngineConfig,
    services: EngineServices,
    /// Sessions with an execution pass currently in flight. A second
    /// concurrent run for the same session is rejected, not serialized.
    in_flight: Mutex<HashSet<String>>,
}

impl PackageEngine {
    pub fn new(config: EngineConfig, services: EngineServices) -> Self {
        Self { config, services, in_flight: Mutex::new(HashSet::new()) }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validates and persists a package, replacing any prior snapshot.
    pub async fn persist_package(&self, package: &ResolutionPackage) -> Result<(), ExecutorError> {
        package.validate()?;
        self.services.packages.save(package).await?;
        Ok(())
    }

    pub async fn approve_item(&self, session_id: &str, item_id: &str) -> Result<(), ExecutorError> {
        self.decide_item(session_id, item_id, FeedbackVerdict::Approved).await
    }

    pub async fn reject_item(&self, session_id: &str, item_id: &str) -> Result<(), ExecutorError> {
        self.decide_item(session_id, item_id, FeedbackVerdict::Rejected).await
    }

    async fn decide_item(
        &self,
        session_id: &str,
        item_id: &str,
        verdict: FeedbackVerdict,
    ) -> Result<(), ExecutorError> {
        let session = self.services.sessions.get_session(session_id).await?;
        let mut package = self.load_package(session_id).await?;

        match verdict {
            FeedbackVerdict::Approved => package.approve(item_id)?,
            FeedbackVerdict::Rejected => package.reject(item_id)?,
        }
        self.services.packages.save(&package).await?;

        if let Some(item) = package.item(item_id) {
            if let Err(error) = self
                .services
                .feedback
                .record_item_verdict(session_id, &session.title, item, verdict)
                .await
            {
                warn!(session_id, item_id, %error, "feedback verdict write failed");
            }
        }
        Ok(())
    }

    /// Approves every pending item, saving the package once, then records
    /// one feedback verdict per newly approved item.
    pub async fn approve_all_pending(&self, session_id: &str) -> Result<Vec<String>, ExecutorError> {
        let session = self.services.sessions.get_session(session_id).await?;
        let mut package = self.load_package(session_id).await?;

        let approved = package.approve_all_pending();
        self.services.packages.save(&package).await?;

        for item_id in &approved {
            if let Some(item) = package.item(item_id) {
                if let Err(error) = self
                    .services
                    .feedback
                    .record_item_verdict(session_id, &session.title, item, FeedbackVerdict::Approved)
                    .await
                {
                    warn!(session_id, %item_id, %error, "feedback verdict write failed");
                }
            }
        }
        Ok(approved)
    }

    /// Executes every approved item of the session's package, in package
    /// order, isolating failures per item.
    pub async fn execute_package(&self, session_id: &str) -> Result<(), ExecutorError> {
        let _guard = self.claim_run(session_id)?;

        let session = self.services.sessions.get_session(session_id).await?;
        let mut package = self.load_package(session_id).await?;
        let selected = package.approved_item_ids();

        info!(session_id, items = selected.len(), "executing resolution package");

        for item_id in selected {
            let Some(item) = package.item(&item_id).cloned() else {
                continue;
            };

            match self.execute_item(&session, &package, &item).await {
                Ok(created_id) => {
                    info!(session_id, %item_id, %created_id, item_type = ?item.item_type(), "item executed");
                    package.mark_created(&item_id, created_id)?;
                }
                Err(error) => {
                    if error.is_guardrail() {
                        warn!(session_id, %item_id, %error, guardrail = true, "item rejected by guardrail");
                    } else {
                        warn!(session_id, %item_id, %error, "item execution failed");
                    }
                    package.mark_failed(&item_id, error.to_string())?;
                }
            }

            // Persist after every single item, not batched, so a crash
            // mid-batch loses at most the in-flight item's result.
            self.services.packages.save(&package).await?;
        }

        if let Err(error) = self
            .services
            .feedback
            .record_batch_outcome(session_id, &session.title, &package.items)
            .await
        {
            warn!(session_id, %error, "batch outcome feedback write failed");
        }
        Ok(())
    }

    async fn load_package(&self, session_id: &str) -> Result<ResolutionPackage, ExecutorError> {
        self.services
            .packages
            .find_by_session(session_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("no package for session `{session_id}`")).into()
            })
    }

    fn claim_run(&self, session_id: &str) -> Result<RunGuard<'_>, ExecutorError> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !in_flight.insert(session_id.to_string()) {
            return Err(ExecutorError::Busy(format!(
                "package for session `{session_id}` is already executing"
            )));
        }
        Ok(RunGuard { engine: self, session_id: session_id.to_string() })
    }
}

struct RunGuard<'a> {
    engine: &'a PackageEngine,
    session_id: String,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self
            .engine
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        in_flight.remove(&self.session_id);
    }
}
