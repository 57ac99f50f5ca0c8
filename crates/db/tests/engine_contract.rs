//! Dispatcher behavior checks over the in-memory service doubles.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Timelike, Utc};
use rust_decimal::Decimal;

use conclave_core::{
    AgentProfile, AppConfig, Company, Contact, CrmAction, CrmDetails, CrmItemData, CrmKind,
    CrmSnapshot, CustomerKind, DocumentData, EngineServices, EventData, ExecutorError,
    FollowUpData, ItemData, ItemStatus, MissionData, MissionPhase, MissionService, PackageEngine,
    PackageRepository, Pipeline, PipelineStage, ProjectData, QuoteData, QuoteLineData,
    ResolutionItem, ResolutionMode, ResolutionPackage, ServiceError, Session, SessionMetadata,
    SessionService,
};
use conclave_db::repositories::{
    InMemoryAgentRoster, InMemoryCalendarService, InMemoryCrmService, InMemoryFeedbackWriter,
    InMemoryMissionService, InMemoryPackageStore, InMemoryProjectService, InMemoryQuoteService,
    InMemorySessionService,
};

struct World {
    packages: Arc<InMemoryPackageStore>,
    missions: Arc<InMemoryMissionService>,
    sessions: Arc<InMemorySessionService>,
    crm: Arc<InMemoryCrmService>,
    calendar: Arc<InMemoryCalendarService>,
    quotes: Arc<InMemoryQuoteService>,
    projects: Arc<InMemoryProjectService>,
    feedback: Arc<InMemoryFeedbackWriter>,
    engine: Arc<PackageEngine>,
}

fn crm_snapshot() -> CrmSnapshot {
    CrmSnapshot {
        companies: vec![Company {
            id: "co-acme".to_string(),
            name: "Acme Corporation".to_string(),
            email: None,
            phone: None,
            website: None,
        }],
        contacts: vec![Contact {
            id: "ct-dana".to_string(),
            first_name: "Dana".to_string(),
            last_name: "Reyes".to_string(),
            email: None,
            phone: None,
            company_id: Some("co-acme".to_string()),
        }],
        pipelines: Vec::new(),
    }
}

fn default_pipeline() -> Pipeline {
    Pipeline {
        id: "pl-sales".to_string(),
        name: "Sales".to_string(),
        stages: vec![
            PipelineStage { id: "st-qualified".to_string(), name: "Qualified".to_string(), position: 1 },
            PipelineStage { id: "st-won".to_string(), name: "Won".to_string(), position: 2 },
        ],
    }
}

fn build_world(missions: Arc<InMemoryMissionService>, crm: Arc<InMemoryCrmService>) -> World {
    let packages = Arc::new(InMemoryPackageStore::default());
    let roster = Arc::new(InMemoryAgentRoster::new(vec![
        AgentProfile { id: "agent-coordinator".to_string(), display_name: "Coordinator".to_string() },
        AgentProfile { id: "agent-ops".to_string(), display_name: "Ops Agent".to_string() },
        AgentProfile { id: "agent-sales".to_string(), display_name: "Sales Agent".to_string() },
    ]));
    let sessions = Arc::new(InMemorySessionService::default());
    let calendar = Arc::new(InMemoryCalendarService::default());
    let quotes = Arc::new(InMemoryQuoteService::with_last_number("QT-0041"));
    let projects = Arc::new(InMemoryProjectService::default());
    let feedback = Arc::new(InMemoryFeedbackWriter::default());

    let services = EngineServices {
        packages: packages.clone(),
        roster,
        missions: missions.clone(),
        sessions: sessions.clone(),
        crm: crm.clone(),
        calendar: calendar.clone(),
        quotes: quotes.clone(),
        projects: projects.clone(),
        feedback: feedback.clone(),
    };
    let engine = Arc::new(PackageEngine::new(AppConfig::default().engine, services));

    World { packages, missions, sessions, crm, calendar, quotes, projects, feedback, engine }
}

fn world() -> World {
    build_world(
        Arc::new(InMemoryMissionService::default()),
        Arc::new(InMemoryCrmService::new(crm_snapshot(), Some(default_pipeline()))),
    )
}

fn session(id: &str, mode: ResolutionMode, follow_up_depth: u32) -> Session {
    Session {
        id: id.to_string(),
        title: "Q3 roadmap review".to_string(),
        description: String::new(),
        mode,
        participant_ids: vec!["agent-ops".to_string(), "agent-sales".to_string()],
        metadata: SessionMetadata {
            follow_up_depth,
            parent_session_id: None,
            spawned_follow_up_ids: Vec::new(),
            auto_start: false,
        },
        created_at: Utc::now(),
    }
}

async fn seed(world: &World, session: Session, items: Vec<ResolutionItem>) {
    let package =
        ResolutionPackage::new(format!("pkg-{}", session.id), &session.id, session.mode, items);
    world.packages.insert(package).await;
    world.sessions.insert(session).await;
}

fn mission_item(id: &str, agent_id: &str, scheduled_at: Option<String>) -> ResolutionItem {
    ResolutionItem::pending(
        id,
        ItemData::Mission(MissionData {
            title: "Draft the rollout plan".to_string(),
            description: "Write up the rollout plan we agreed on".to_string(),
            agent_id: agent_id.to_string(),
            priority: "high".to_string(),
            scheduled_at,
            mission_refs: Vec::new(),
        }),
        "someone should own the rollout plan",
    )
}

#[tokio::test]
async fn mission_falls_back_to_default_agent_and_clamps_past_schedule() {
    let world = world();
    seed(
        &world,
        session("sess-1", ResolutionMode::Propose, 0),
        vec![mission_item("m1", "agent-ghost", Some("2020-01-01T00:00:00Z".to_string()))],
    )
    .await;

    let before = Utc::now();
    world.engine.approve_all_pending("sess-1").await.expect("approve");
    world.engine.execute_package("sess-1").await.expect("execute");

    let created = world.missions.created().await;
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].agent_id, "agent-coordinator");
    assert_eq!(created[0].phase, MissionPhase::PendingReview);
    assert!(created[0].scheduled_at >= before, "past schedule must collapse to now");

    let package = world.packages.find_by_session("sess-1").await.unwrap().unwrap();
    assert_eq!(package.items[0].status, ItemStatus::Created);
    assert_eq!(package.items[0].created_id.as_deref(), Some(created[0].id.as_str()));
}

#[tokio::test]
async fn project_resolves_same_batch_mission_ids_and_drops_ghost_references() {
    let missions = Arc::new(InMemoryMissionService::with_existing(["mission-prior".to_string()]));
    let world = build_world(
        missions,
        Arc::new(InMemoryCrmService::new(crm_snapshot(), Some(default_pipeline()))),
    );
    seed(
        &world,
        session("sess-1", ResolutionMode::Propose, 0),
        vec![
            mission_item("m1", "agent-ops", None),
            ResolutionItem::pending(
                "p1",
                ItemData::Project(ProjectData {
                    name: "Rollout".to_string(),
                    description: String::new(),
                    mission_ids: vec![
                        "m1".to_string(),
                        "mission-prior".to_string(),
                        "mission-ghost".to_string(),
                    ],
                }),
                "group these under one project",
            ),
        ],
    )
    .await;

    world.engine.approve_all_pending("sess-1").await.expect("approve");
    world.engine.execute_package("sess-1").await.expect("execute");

    let created_mission_id = world.missions.created().await[0].id.clone();
    let projects = world.projects.created_projects().await;
    assert_eq!(projects.len(), 1);
    assert_eq!(
        projects[0].mission_ids,
        vec![created_mission_id.clone(), "mission-prior".to_string()],
        "item id resolves to the real created id; ghosts are dropped"
    );
    assert_eq!(world.projects.links().await, vec![(
        projects[0].id.clone(),
        vec![created_mission_id, "mission-prior".to_string()],
    )]);
}

#[tokio::test]
async fn one_failing_item_never_aborts_the_batch() {
    let world = world();
    seed(
        &world,
        session("sess-1", ResolutionMode::Propose, 0),
        vec![
            ResolutionItem::pending(
                "q1",
                ItemData::Quote(QuoteData {
                    customer_name: "Unknown Partner".to_string(),
                    description: String::new(),
                    lines: vec![QuoteLineData {
                        description: "Consulting".to_string(),
                        quantity: Some(2),
                        unit_price: Decimal::new(50000, 2),
                    }],
                }),
                "",
            ),
            mission_item("m1", "agent-ops", None),
        ],
    )
    .await;

    world.engine.approve_all_pending("sess-1").await.expect("approve");
    world.engine.execute_package("sess-1").await.expect("execute");

    let package = world.packages.find_by_session("sess-1").await.unwrap().unwrap();
    let failed = package.item("q1").unwrap();
    assert_eq!(failed.status, ItemStatus::Approved, "failed item stays eligible for a re-run");
    assert!(failed.error.as_deref().unwrap().contains("no existing company or contact"));

    let succeeded = package.item("m1").unwrap();
    assert_eq!(succeeded.status, ItemStatus::Created);
    assert_eq!(world.quotes.created_quotes().await.len(), 0);
    assert!(world.crm.created_companies().await.is_empty(), "no fallback customer is created");
    assert_eq!(world.missions.created().await.len(), 1);
    assert!(!world.feedback.records().await.is_empty());
}

#[tokio::test]
async fn follow_up_is_forced_to_propose_without_auto_start() {
    let world = world();
    seed(
        &world,
        session("sess-1", ResolutionMode::Auto, 0),
        vec![ResolutionItem::pending(
            "f1",
            ItemData::FollowUp(FollowUpData {
                title: "Pricing follow-up".to_string(),
                topic: "Enterprise pricing".to_string(),
                agenda: vec!["Review tier limits".to_string()],
                participant_ids: vec!["agent-ops".to_string(), "agent-ghost".to_string()],
                unresolved: Vec::new(),
                scheduled_at: None,
            }),
            "",
        )],
    )
    .await;

    world.engine.approve_all_pending("sess-1").await.expect("approve");
    world.engine.execute_package("sess-1").await.expect("execute");

    let package = world.packages.find_by_session("sess-1").await.unwrap().unwrap();
    let follow_up_id = package.item("f1").unwrap().created_id.clone().unwrap();
    let spawned = world.sessions.get_session(&follow_up_id).await.unwrap();

    assert_eq!(spawned.mode, ResolutionMode::Propose, "auto mode must not be inherited");
    assert!(!spawned.metadata.auto_start);
    assert_eq!(spawned.metadata.follow_up_depth, 1);
    assert_eq!(spawned.metadata.parent_session_id.as_deref(), Some("sess-1"));
    // One valid participant is not a conversation; parent list is reused.
    assert_eq!(spawned.participant_ids, vec!["agent-ops".to_string(), "agent-sales".to_string()]);

    let parent = world.sessions.get_session("sess-1").await.unwrap();
    assert_eq!(parent.metadata.spawned_follow_up_ids, vec![follow_up_id]);
}

#[tokio::test]
async fn follow_up_depth_ceiling_is_a_guardrail_rejection() {
    let world = world();
    seed(
        &world,
        session("sess-deep", ResolutionMode::Propose, 2),
        vec![ResolutionItem::pending(
            "f1",
            ItemData::FollowUp(FollowUpData {
                title: "Yet another follow-up".to_string(),
                topic: String::new(),
                agenda: Vec::new(),
                participant_ids: Vec::new(),
                unresolved: Vec::new(),
                scheduled_at: None,
            }),
            "",
        )],
    )
    .await;

    world.engine.approve_all_pending("sess-deep").await.expect("approve");
    world.engine.execute_package("sess-deep").await.expect("execute");

    let package = world.packages.find_by_session("sess-deep").await.unwrap().unwrap();
    let item = package.item("f1").unwrap();
    assert_eq!(item.status, ItemStatus::Approved);
    assert!(item.error.as_deref().unwrap().starts_with("guardrail rejected execution"));
    assert_eq!(world.sessions.created_sessions().await.len(), 1, "only the seeded session exists");
}

#[tokio::test]
async fn past_event_start_moves_to_next_day_same_time() {
    let world = world();
    let stale = Utc.with_ymd_and_hms(2024, 6, 1, 14, 30, 0).unwrap();
    seed(
        &world,
        session("sess-1", ResolutionMode::Propose, 0),
        vec![ResolutionItem::pending(
            "e1",
            ItemData::Event(EventData {
                title: "Pricing sync".to_string(),
                description: String::new(),
                starts_at: stale.to_rfc3339(),
                duration_minutes: Some(30),
                attendee_ids: vec!["agent-ops".to_string()],
            }),
            "",
        )],
    )
    .await;

    world.engine.approve_all_pending("sess-1").await.expect("approve");
    world.engine.execute_package("sess-1").await.expect("execute");

    let events = world.calendar.created_events().await;
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.starts_at.date_naive(), (Utc::now() + Duration::days(1)).date_naive());
    assert_eq!((event.starts_at.hour(), event.starts_at.minute()), (14, 30));
    assert_eq!(event.ends_at - event.starts_at, Duration::minutes(30));
}

#[tokio::test]
async fn document_mission_is_created_approved_with_source_excerpt() {
    let world = world();
    seed(
        &world,
        session("sess-1", ResolutionMode::Propose, 0),
        vec![ResolutionItem::pending(
            "d1",
            ItemData::Document(DocumentData {
                doc_type: "proposal".to_string(),
                title: "Enterprise tier proposal".to_string(),
                description: "One page, pricing and SLA".to_string(),
                agent_id: "agent-ops".to_string(),
            }),
            "we owe them a written proposal by Friday",
        )],
    )
    .await;

    world.engine.approve_all_pending("sess-1").await.expect("approve");
    world.engine.execute_package("sess-1").await.expect("execute");

    let created = world.missions.created().await;
    assert_eq!(created.len(), 1);
    let mission = &created[0];
    // A writing task needs no second review round.
    assert_eq!(mission.phase, MissionPhase::Approved);
    assert_eq!(mission.agent_id, "agent-ops");
    assert!(mission.description.contains("proposal - Enterprise tier proposal"));
    assert!(mission.description.contains("we owe them a written proposal by Friday"));

    let package = world.packages.find_by_session("sess-1").await.unwrap().unwrap();
    assert_eq!(package.item("d1").unwrap().status, ItemStatus::Created);
}

#[tokio::test]
async fn deal_creation_lands_in_the_default_pipeline_stage() {
    let world = world();
    seed(
        &world,
        session("sess-1", ResolutionMode::Propose, 0),
        vec![ResolutionItem::pending(
            "c1",
            ItemData::Crm(CrmItemData {
                kind: CrmKind::Deal,
                action: CrmAction::Create,
                name: "Acme renewal".to_string(),
                details: CrmDetails {
                    amount: Some("12000".to_string()),
                    stage: Some("won".to_string()),
                    ..CrmDetails::default()
                },
                target_id: None,
            }),
            "",
        )],
    )
    .await;

    world.engine.approve_all_pending("sess-1").await.expect("approve");
    world.engine.execute_package("sess-1").await.expect("execute");

    let deals = world.crm.created_deals().await;
    assert_eq!(deals.len(), 1);
    assert_eq!(deals[0].pipeline_id, "pl-sales");
    assert_eq!(deals[0].stage_id, "st-won", "requested stage name wins over the first stage");
    assert_eq!(deals[0].amount.as_deref(), Some("12000"));

    let package = world.packages.find_by_session("sess-1").await.unwrap().unwrap();
    assert_eq!(package.item("c1").unwrap().created_id.as_deref(), Some(deals[0].id.as_str()));
}

#[tokio::test]
async fn deal_creation_without_a_pipeline_is_a_validation_failure() {
    let world = build_world(
        Arc::new(InMemoryMissionService::default()),
        Arc::new(InMemoryCrmService::new(crm_snapshot(), None)),
    );
    seed(
        &world,
        session("sess-1", ResolutionMode::Propose, 0),
        vec![ResolutionItem::pending(
            "c1",
            ItemData::Crm(CrmItemData {
                kind: CrmKind::Deal,
                action: CrmAction::Create,
                name: "Acme renewal".to_string(),
                details: CrmDetails::default(),
                target_id: None,
            }),
            "",
        )],
    )
    .await;

    world.engine.approve_all_pending("sess-1").await.expect("approve");
    world.engine.execute_package("sess-1").await.expect("execute");

    let package = world.packages.find_by_session("sess-1").await.unwrap().unwrap();
    let item = package.item("c1").unwrap();
    assert_eq!(item.status, ItemStatus::Approved, "failed item stays retryable");
    assert!(item.error.as_deref().unwrap().contains("no default pipeline configured"));
    assert!(world.crm.created_deals().await.is_empty());
}

#[tokio::test]
async fn crm_update_patches_only_the_provided_details() {
    let world = world();
    seed(
        &world,
        session("sess-1", ResolutionMode::Propose, 0),
        vec![ResolutionItem::pending(
            "c1",
            ItemData::Crm(CrmItemData {
                kind: CrmKind::Company,
                action: CrmAction::Update,
                name: "Acme Corporation".to_string(),
                details: CrmDetails {
                    email: Some("sales@acme.example".to_string()),
                    ..CrmDetails::default()
                },
                target_id: Some("co-acme".to_string()),
            }),
            "",
        )],
    )
    .await;

    world.engine.approve_all_pending("sess-1").await.expect("approve");
    world.engine.execute_package("sess-1").await.expect("execute");

    let updates = world.crm.updates().await;
    assert_eq!(updates.len(), 1);
    let (kind, target_id, details) = &updates[0];
    assert_eq!(*kind, CrmKind::Company);
    assert_eq!(target_id, "co-acme");
    assert_eq!(details.email.as_deref(), Some("sales@acme.example"));
    assert_eq!(details.phone, None, "unset fields are not part of the patch");
    assert_eq!(details.website, None);
    assert!(world.crm.created_companies().await.is_empty(), "an update never creates");

    let package = world.packages.find_by_session("sess-1").await.unwrap().unwrap();
    assert_eq!(package.item("c1").unwrap().created_id.as_deref(), Some("co-acme"));
}

#[tokio::test]
async fn quote_matches_customer_and_continues_the_number_sequence() {
    let world = world();
    seed(
        &world,
        session("sess-1", ResolutionMode::Propose, 0),
        vec![ResolutionItem::pending(
            "q1",
            ItemData::Quote(QuoteData {
                customer_name: "Acme".to_string(),
                description: "Renewal quote".to_string(),
                lines: vec![
                    QuoteLineData {
                        description: "License".to_string(),
                        quantity: Some(3),
                        unit_price: Decimal::new(1000, 2),
                    },
                    QuoteLineData {
                        description: "Onboarding".to_string(),
                        quantity: None,
                        unit_price: Decimal::new(2550, 2),
                    },
                ],
            }),
            "",
        )],
    )
    .await;

    world.engine.approve_all_pending("sess-1").await.expect("approve");
    world.engine.execute_package("sess-1").await.expect("execute");

    let quotes = world.quotes.created_quotes().await;
    assert_eq!(quotes.len(), 1);
    let quote = &quotes[0];
    assert_eq!(quote.number, "QT-0042");
    assert_eq!(quote.customer.kind, CustomerKind::Company);
    assert_eq!(quote.customer.id, "co-acme");
    assert_eq!(quote.lines[1].quantity, 1, "missing quantity defaults to one");
    assert_eq!(quote.subtotal, Decimal::new(5550, 2));
    assert_eq!(quote.total, quote.subtotal);
}

#[tokio::test]
async fn created_items_are_skipped_on_a_second_execution_pass() {
    let world = world();
    seed(
        &world,
        session("sess-1", ResolutionMode::Propose, 0),
        vec![mission_item("m1", "agent-ops", None)],
    )
    .await;

    world.engine.approve_all_pending("sess-1").await.expect("approve");
    world.engine.execute_package("sess-1").await.expect("first run");
    world.engine.execute_package("sess-1").await.expect("second run");

    assert_eq!(world.missions.created().await.len(), 1, "created item must not re-execute");
}

#[tokio::test]
async fn rejecting_then_approving_an_item_is_an_invalid_transition() {
    let world = world();
    seed(
        &world,
        session("sess-1", ResolutionMode::Propose, 0),
        vec![mission_item("m1", "agent-ops", None)],
    )
    .await;

    world.engine.reject_item("sess-1", "m1").await.expect("reject");
    let error = world.engine.approve_item("sess-1", "m1").await.expect_err("decided item");
    assert!(matches!(error, ExecutorError::Domain(_)));
}

#[tokio::test]
async fn missing_package_surfaces_not_found() {
    let world = world();
    world.sessions.insert(session("sess-empty", ResolutionMode::Propose, 0)).await;

    let error = world.engine.execute_package("sess-empty").await.expect_err("no package");
    assert!(matches!(error, ExecutorError::Service(ServiceError::NotFound(_))));
}

/// Mission service that parks inside `create_mission` until released, to
/// hold an execution pass open.
struct GatedMissionService {
    entered: tokio::sync::Notify,
    release: tokio::sync::Notify,
    inner: InMemoryMissionService,
}

#[async_trait::async_trait]
impl MissionService for GatedMissionService {
    async fn create_mission(
        &self,
        mission: &conclave_core::Mission,
    ) -> Result<(), ServiceError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.create_mission(mission).await
    }

    async fn mission_exists(&self, mission_id: &str) -> Result<bool, ServiceError> {
        self.inner.mission_exists(mission_id).await
    }
}

#[tokio::test]
async fn concurrent_execution_for_the_same_session_is_rejected_as_busy() {
    let gated = Arc::new(GatedMissionService {
        entered: tokio::sync::Notify::new(),
        release: tokio::sync::Notify::new(),
        inner: InMemoryMissionService::default(),
    });

    let packages = Arc::new(InMemoryPackageStore::default());
    let sessions = Arc::new(InMemorySessionService::default());
    let services = EngineServices {
        packages: packages.clone(),
        roster: Arc::new(InMemoryAgentRoster::new(vec![AgentProfile {
            id: "agent-ops".to_string(),
            display_name: "Ops Agent".to_string(),
        }])),
        missions: gated.clone(),
        sessions: sessions.clone(),
        crm: Arc::new(InMemoryCrmService::default()),
        calendar: Arc::new(InMemoryCalendarService::default()),
        quotes: Arc::new(InMemoryQuoteService::default()),
        projects: Arc::new(InMemoryProjectService::default()),
        feedback: Arc::new(InMemoryFeedbackWriter::default()),
    };
    let engine = Arc::new(PackageEngine::new(AppConfig::default().engine, services));

    sessions.insert(session("sess-1", ResolutionMode::Propose, 0)).await;
    let mut package = ResolutionPackage::new(
        "pkg-sess-1",
        "sess-1",
        ResolutionMode::Propose,
        vec![mission_item("m1", "agent-ops", None)],
    );
    package.approve("m1").unwrap();
    packages.insert(package).await;

    let first = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.execute_package("sess-1").await })
    };
    gated.entered.notified().await;

    let second = engine.execute_package("sess-1").await;
    assert!(matches!(second, Err(ExecutorError::Busy(_))));

    gated.release.notify_one();
    first.await.expect("join").expect("first run completes");
    assert_eq!(gated.inner.created().await.len(), 1);
}
