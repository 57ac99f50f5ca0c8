//! Per-type action executors.
//!
//! Each executor validates the item's payload, performs one side effect
//! against its target subsystem, and returns the created entity's id.
//! Failures are captured by the dispatcher as `item.error`; the item
//! stays approved and eligible for a later re-run.

use chrono::{Duration, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::domain::calendar::{resolve_start, CalendarEvent, ResolvedStart};
use crate::domain::crm::{split_contact_name, Company, Contact, Deal, Pipeline};
use crate::domain::mission::{normalize_schedule, Mission, MissionPhase, MissionPriority};
use crate::domain::package::{
    CrmAction, CrmItemData, CrmKind, DocumentData, EventData, FollowUpData, ItemData, ItemStatus,
    ItemType, MissionData, ProjectData, QuoteData, ResolutionItem, ResolutionMode,
    ResolutionPackage,
};
use crate::domain::project::Project;
use crate::domain::quote::{next_quote_number, CustomerRef, Quote, QuoteLine};
use crate::domain::session::{Session, SessionMetadata};
use crate::errors::ExecutorError;

use super::PackageEngine;

impl PackageEngine {
    pub(super) async fn execute_item(
        &self,
        session: &Session,
        package: &ResolutionPackage,
        item: &ResolutionItem,
    ) -> Result<String, ExecutorError> {
        match &item.data {
            ItemData::Mission(data) => self.execute_mission(session, data).await,
            ItemData::FollowUp(data) => self.execute_follow_up(session, data).await,
            ItemData::Document(data) => self.execute_document(session, item, data).await,
            ItemData::Crm(data) => self.execute_crm(data).await,
            ItemData::Event(data) => self.execute_event(session, data).await,
            ItemData::Quote(data) => self.execute_quote(data).await,
            ItemData::Project(data) => self.execute_project(package, data).await,
        }
    }

    /// Creates a mission in `PendingReview` so a human can intervene
    /// before any autonomous worker picks it up.
    async fn execute_mission(
        &self,
        session: &Session,
        data: &MissionData,
    ) -> Result<String, ExecutorError> {
        let agent_id = self.resolve_agent(&data.agent_id).await?;
        let now = Utc::now();

        let mission = Mission {
            id: Uuid::new_v4().to_string(),
            title: data.title.clone(),
            description: data.description.clone(),
            agent_id,
            priority: MissionPriority::parse_lenient(&data.priority),
            phase: MissionPhase::PendingReview,
            scheduled_at: normalize_schedule(data.scheduled_at.as_deref(), now),
            session_id: session.id.clone(),
        };
        self.services.missions.create_mission(&mission).await?;
        Ok(mission.id)
    }

    /// Spawns a follow-up session, bounded by the recursion depth ceiling.
    ///
    /// The new session never inherits `auto` autonomy and never
    /// auto-starts, regardless of the parent's mode.
    async fn execute_follow_up(
        &self,
        session: &Session,
        data: &FollowUpData,
    ) -> Result<String, ExecutorError> {
        let depth = session.metadata.follow_up_depth + 1;
        if depth > self.config.follow_up_depth_limit {
            return Err(ExecutorError::Guardrail(format!(
                "follow-up depth {depth} exceeds limit {}; refusing to spawn another session",
                self.config.follow_up_depth_limit
            )));
        }

        let roster = self.services.roster.list_agents().await?;
        let mut participants = Vec::new();
        for participant_id in &data.participant_ids {
            if roster.iter().any(|agent| &agent.id == participant_id) {
                participants.push(participant_id.clone());
            } else {
                warn!(%participant_id, "dropping unknown follow-up participant");
            }
        }
        if participants.len() < 2 {
            participants = session.participant_ids.clone();
        }

        let follow_up = Session {
            id: Uuid::new_v4().to_string(),
            title: data.title.clone(),
            description: compose_follow_up_brief(data),
            mode: ResolutionMode::Propose,
            participant_ids: participants,
            metadata: SessionMetadata {
                follow_up_depth: depth,
                parent_session_id: Some(session.id.clone()),
                spawned_follow_up_ids: Vec::new(),
                auto_start: false,
            },
            created_at: Utc::now(),
        };
        self.services.sessions.create_session(&follow_up).await?;

        // Forward link on the parent is bookkeeping; a failed write must
        // not fail an item whose session already exists.
        let mut parent_metadata = session.metadata.clone();
        parent_metadata.spawned_follow_up_ids.push(follow_up.id.clone());
        if let Err(error) =
            self.services.sessions.update_metadata(&session.id, &parent_metadata).await
        {
            warn!(session_id = %session.id, %error, "failed to record spawned follow-up on parent");
        }

        Ok(follow_up.id)
    }

    /// A document request is a writing task, not a decision, so the
    /// mission is created already approved.
    async fn execute_document(
        &self,
        session: &Session,
        item: &ResolutionItem,
        data: &DocumentData,
    ) -> Result<String, ExecutorError> {
        let agent_id = self.resolve_agent(&data.agent_id).await?;

        let mission = Mission {
            id: Uuid::new_v4().to_string(),
            title: data.title.clone(),
            description: compose_document_brief(data, &item.source_excerpt),
            agent_id,
            priority: MissionPriority::Normal,
            phase: MissionPhase::Approved,
            scheduled_at: Utc::now(),
            session_id: session.id.clone(),
        };
        self.services.missions.create_mission(&mission).await?;
        Ok(mission.id)
    }

    async fn execute_crm(&self, data: &CrmItemData) -> Result<String, ExecutorError> {
        let name = data.name.trim();
        if name.is_empty() {
            return Err(ExecutorError::Validation("crm item requires a display name".to_string()));
        }

        match data.action {
            CrmAction::Update => {
                let target_id = data.target_id.as_deref().filter(|id| !id.trim().is_empty()).ok_or_else(
                    || ExecutorError::Validation("crm update requires a target id".to_string()),
                )?;
                self.services.crm.update_entity(data.kind, target_id, &data.details).await?;
                Ok(target_id.to_string())
            }
            CrmAction::Create => match data.kind {
                CrmKind::Company => {
                    let company = Company {
                        id: Uuid::new_v4().to_string(),
                        name: name.to_string(),
                        email: data.details.email.clone(),
                        phone: data.details.phone.clone(),
                        website: data.details.website.clone(),
                    };
                    self.services.crm.create_company(&company).await?;
                    Ok(company.id)
                }
                CrmKind::Contact => {
                    let (first_name, last_name) = split_contact_name(name);
                    let contact = Contact {
                        id: Uuid::new_v4().to_string(),
                        first_name,
                        last_name,
                        email: data.details.email.clone(),
                        phone: data.details.phone.clone(),
                        company_id: None,
                    };
                    self.services.crm.create_contact(&contact).await?;
                    Ok(contact.id)
                }
                CrmKind::Deal => {
                    // A deal cannot exist outside a pipeline; fail loudly
                    // when the business has none configured.
                    let pipeline = self.services.crm.default_pipeline().await?.ok_or_else(|| {
                        ExecutorError::Validation(
                            "no default pipeline configured; cannot create a deal".to_string(),
                        )
                    })?;
                    let stage_id = resolve_stage_id(&pipeline, data.details.stage.as_deref())
                        .ok_or_else(|| {
                            ExecutorError::Validation(format!(
                                "pipeline `{}` has no stages; cannot create a deal",
                                pipeline.name
                            ))
                        })?;
                    let deal = Deal {
                        id: Uuid::new_v4().to_string(),
                        name: name.to_string(),
                        amount: data.details.amount.clone(),
                        stage_id,
                        pipeline_id: pipeline.id,
                    };
                    self.services.crm.create_deal(&deal).await?;
                    Ok(deal.id)
                }
            },
        }
    }

    async fn execute_event(
        &self,
        session: &Session,
        data: &EventData,
    ) -> Result<String, ExecutorError> {
        let starts_at = chrono::DateTime::parse_from_rfc3339(data.starts_at.trim())
            .map_err(|_| {
                ExecutorError::Validation(format!(
                    "unparsable event start time `{}`",
                    data.starts_at
                ))
            })?
            .with_timezone(&Utc);

        let duration_minutes = data
            .duration_minutes
            .filter(|minutes| *minutes > 0)
            .unwrap_or(self.config.default_event_duration_minutes);

        let now = Utc::now();
        let resolved = resolve_start(starts_at, now);
        if let ResolvedStart::MovedToNextDay(moved) = resolved {
            warn!(
                proposed = %starts_at,
                rescheduled = %moved,
                "event start was in the past; moved to the following day"
            );
        }

        let start = resolved.start();
        let event = CalendarEvent {
            id: Uuid::new_v4().to_string(),
            title: data.title.clone(),
            description: data.description.clone(),
            starts_at: start,
            ends_at: start + Duration::minutes(duration_minutes),
            attendee_ids: data.attendee_ids.clone(),
            session_id: session.id.clone(),
        };
        self.services.calendar.create_event(&event).await?;
        Ok(event.id)
    }

    async fn execute_quote(&self, data: &QuoteData) -> Result<String, ExecutorError> {
        let customer_name = data.customer_name.trim();
        if customer_name.is_empty() {
            return Err(ExecutorError::Validation("quote requires a customer name".to_string()));
        }
        if data.lines.is_empty() {
            return Err(ExecutorError::Validation(
                "quote requires at least one line item".to_string(),
            ));
        }

        let snapshot = self.services.crm.snapshot().await?;
        let matched = snapshot.match_customer(customer_name).ok_or_else(|| {
            ExecutorError::Validation(format!(
                "no existing company or contact matches customer `{customer_name}`"
            ))
        })?;

        let last_number = self.services.quotes.last_quote_number().await?;
        let number = next_quote_number(last_number.as_deref(), &self.config.quote_number_prefix);

        let lines: Vec<QuoteLine> = data
            .lines
            .iter()
            .map(|line| QuoteLine {
                description: line.description.clone(),
                quantity: line.quantity.unwrap_or(1),
                unit_price: line.unit_price,
            })
            .collect();
        let subtotal = Quote::compute_totals(&lines);

        let quote = Quote {
            id: Uuid::new_v4().to_string(),
            number,
            customer: CustomerRef { kind: matched.kind, id: matched.id },
            description: data.description.clone(),
            lines,
            subtotal,
            total: subtotal,
            created_at: Utc::now(),
        };
        self.services.quotes.create_quote(&quote).await?;
        Ok(quote.id)
    }

    /// Mission references resolve against same-package items that already
    /// reached `Created` in this pass, then against pre-existing
    /// missions. Unresolvable references are dropped, never fatal.
    async fn execute_project(
        &self,
        package: &ResolutionPackage,
        data: &ProjectData,
    ) -> Result<String, ExecutorError> {
        let name = data.name.trim();
        if name.is_empty() {
            return Err(ExecutorError::Validation("project requires a name".to_string()));
        }

        let mut mission_ids = Vec::new();
        for reference in &data.mission_ids {
            if let Some(resolved) = resolve_batch_mission(package, reference) {
                mission_ids.push(resolved);
                continue;
            }
            if self.services.missions.mission_exists(reference).await? {
                mission_ids.push(reference.clone());
                continue;
            }
            warn!(%reference, "dropping unresolvable mission reference on project");
        }

        let project = Project {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: data.description.clone(),
            mission_ids: mission_ids.clone(),
        };
        self.services.projects.create_project(&project).await?;
        if !mission_ids.is_empty() {
            self.services.projects.link_missions(&project.id, &mission_ids).await?;
        }
        Ok(project.id)
    }

    /// Roster-validates an assignee, substituting the configured default
    /// agent when the proposed id is unknown.
    async fn resolve_agent(&self, agent_id: &str) -> Result<String, ExecutorError> {
        let roster = self.services.roster.list_agents().await?;
        if roster.iter().any(|agent| agent.id == agent_id) {
            return Ok(agent_id.to_string());
        }
        warn!(
            agent_id,
            fallback = %self.config.default_agent_id,
            "assignee not in roster; substituting default agent"
        );
        Ok(self.config.default_agent_id.clone())
    }
}

/// Resolves a project reference against a same-package `mission` item
/// that has already reached `Created` and carries a real id.
fn resolve_batch_mission(package: &ResolutionPackage, reference: &str) -> Option<String> {
    let item = package.item(reference)?;
    if item.item_type() == ItemType::Mission && item.status == ItemStatus::Created {
        return item.created_id.clone();
    }
    None
}

fn compose_follow_up_brief(data: &FollowUpData) -> String {
    let mut brief = String::new();
    if !data.topic.is_empty() {
        brief.push_str(&format!("Topic: {}\n", data.topic));
    }
    if !data.agenda.is_empty() {
        brief.push_str("Agenda:\n");
        for line in &data.agenda {
            brief.push_str(&format!("- {line}\n"));
        }
    }
    if !data.unresolved.is_empty() {
        brief.push_str("Unresolved from the originating session:\n");
        for line in &data.unresolved {
            brief.push_str(&format!("- {line}\n"));
        }
    }
    brief.trim_end().to_string()
}

fn compose_document_brief(data: &DocumentData, source_excerpt: &str) -> String {
    let mut brief = format!("Document requested: {} - {}", data.doc_type, data.title);
    if !data.description.is_empty() {
        brief.push_str(&format!("\n\n{}", data.description));
    }
    if !source_excerpt.is_empty() {
        brief.push_str(&format!("\n\nSource: \"{source_excerpt}\""));
    }
    brief
}

fn resolve_stage_id(pipeline: &Pipeline, requested_stage: Option<&str>) -> Option<String> {
    if let Some(requested) = requested_stage {
        let needle = requested.trim().to_lowercase();
        if let Some(stage) =
            pipeline.stages.iter().find(|stage| stage.name.to_lowercase() == needle)
        {
            return Some(stage.id.clone());
        }
    }
    pipeline.first_stage().map(|stage| stage.id.clone())
}
