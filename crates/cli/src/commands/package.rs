//! Package review and execution commands.

use std::sync::Arc;

use conclave_core::{
    AppConfig, EngineServices, ExecutorError, ItemStatus, PackageEngine, PackageRepository,
    ServiceError,
};
use conclave_db::repositories::{
    SqlAgentRoster, SqlCalendarService, SqlCrmService, SqlFeedbackWriter, SqlMissionService,
    SqlPackageStore, SqlProjectService, SqlQuoteService, SqlSessionService,
};
use conclave_db::DbPool;

use crate::commands::{self, CommandError, CommandResult};

pub fn show(session_id: &str) -> CommandResult {
    let (config, runtime) = match commands::setup("show") {
        Ok(parts) => parts,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = commands::connect(&config).await?;
        let store = SqlPackageStore::new(pool.clone());
        let package = store.find_by_session(session_id).await.map_err(classify_service)?;
        pool.close().await;

        match package {
            Some(package) => serde_json::to_string_pretty(&package)
                .map_err(|error| ("serialization", error.to_string(), 6u8)),
            None => Err((
                "not_found",
                format!("no package for session `{session_id}`"),
                5u8,
            )),
        }
    });

    match result {
        // The snapshot itself is the output, not the status envelope.
        Ok(json) => CommandResult { exit_code: 0, output: json },
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("show", error_class, message, exit_code)
        }
    }
}

pub fn approve(session_id: &str, item_id: &str) -> CommandResult {
    decide("approve", session_id, item_id)
}

pub fn reject(session_id: &str, item_id: &str) -> CommandResult {
    decide("reject", session_id, item_id)
}

fn decide(command: &'static str, session_id: &str, item_id: &str) -> CommandResult {
    let (config, runtime) = match commands::setup(command) {
        Ok(parts) => parts,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = commands::connect(&config).await?;
        let engine = build_engine(&config, pool.clone());
        let outcome = match command {
            "approve" => engine.approve_item(session_id, item_id).await,
            _ => engine.reject_item(session_id, item_id).await,
        };
        pool.close().await;
        outcome.map_err(classify_executor)
    });

    let past_tense = if command == "approve" { "approved" } else { "rejected" };
    match result {
        Ok(()) => CommandResult::success(command, format!("item `{item_id}` {past_tense}")),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure(command, error_class, message, exit_code)
        }
    }
}

pub fn approve_all(session_id: &str) -> CommandResult {
    let (config, runtime) = match commands::setup("approve-all") {
        Ok(parts) => parts,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = commands::connect(&config).await?;
        let engine = build_engine(&config, pool.clone());
        let approved = engine.approve_all_pending(session_id).await.map_err(classify_executor)?;
        pool.close().await;
        Ok::<usize, CommandError>(approved.len())
    });

    match result {
        Ok(count) => {
            CommandResult::success("approve-all", format!("approved {count} pending items"))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("approve-all", error_class, message, exit_code)
        }
    }
}

pub fn execute(session_id: &str) -> CommandResult {
    let (config, runtime) = match commands::setup("execute") {
        Ok(parts) => parts,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = commands::connect(&config).await?;
        let engine = build_engine(&config, pool.clone());
        engine.execute_package(session_id).await.map_err(classify_executor)?;

        let store = SqlPackageStore::new(pool.clone());
        let package = store
            .find_by_session(session_id)
            .await
            .map_err(classify_service)?
            .ok_or_else(|| {
                ("not_found", format!("no package for session `{session_id}`"), 5u8)
            })?;
        pool.close().await;

        let created =
            package.items.iter().filter(|item| item.status == ItemStatus::Created).count();
        let failed = package.items.iter().filter(|item| item.error.is_some()).count();
        Ok::<(usize, usize), CommandError>((created, failed))
    });

    match result {
        Ok((created, failed)) => CommandResult::success(
            "execute",
            format!("execution pass finished: {created} created, {failed} failed"),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("execute", error_class, message, exit_code)
        }
    }
}

fn build_engine(config: &AppConfig, pool: DbPool) -> PackageEngine {
    let services = EngineServices {
        packages: Arc::new(SqlPackageStore::new(pool.clone())),
        roster: Arc::new(SqlAgentRoster::new(pool.clone())),
        missions: Arc::new(SqlMissionService::new(pool.clone())),
        sessions: Arc::new(SqlSessionService::new(pool.clone())),
        crm: Arc::new(SqlCrmService::new(pool.clone())),
        calendar: Arc::new(SqlCalendarService::new(pool.clone())),
        quotes: Arc::new(SqlQuoteService::new(pool.clone())),
        projects: Arc::new(SqlProjectService::new(pool.clone())),
        feedback: Arc::new(SqlFeedbackWriter::new(pool)),
    };
    PackageEngine::new(config.engine.clone(), services)
}

fn classify_executor(error: ExecutorError) -> CommandError {
    match &error {
        ExecutorError::Validation(_) => ("validation", error.to_string(), 5),
        ExecutorError::Guardrail(_) => ("guardrail", error.to_string(), 5),
        ExecutorError::Domain(_) => ("invalid_transition", error.to_string(), 6),
        ExecutorError::Service(ServiceError::NotFound(_)) => ("not_found", error.to_string(), 5),
        ExecutorError::Service(_) => ("storage", error.to_string(), 4),
        ExecutorError::Busy(_) => ("busy", error.to_string(), 7),
    }
}

fn classify_service(error: ServiceError) -> CommandError {
    match &error {
        ServiceError::NotFound(_) => ("not_found", error.to_string(), 5),
        _ => ("storage", error.to_string(), 4),
    }
}
