//! Readiness checks for the operator loop.
//!
//! Config failure is itself a check, so doctor never goes through the
//! shared command setup path.

use serde::Serialize;

use conclave_core::AppConfig;

use crate::commands;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skip(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Skipped, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let checks = match AppConfig::load(None) {
        Ok(config) => vec![
            DoctorCheck::pass("config_validation", "configuration loaded and validated"),
            check_llm_api_key(&config),
            check_database_connectivity(&config),
        ],
        Err(error) => vec![
            DoctorCheck::fail("config_validation", error.to_string()),
            DoctorCheck::skip("llm_api_key", "skipped because configuration did not load"),
            DoctorCheck::skip(
                "database_connectivity",
                "skipped because configuration did not load",
            ),
        ],
    };

    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    DoctorReport {
        overall_status: if any_failed { CheckStatus::Fail } else { CheckStatus::Pass },
        summary: if any_failed {
            "doctor: one or more readiness checks failed".to_string()
        } else {
            "doctor: all readiness checks passed".to_string()
        },
        checks,
    }
}

/// Package derivation needs a model key; approval and execution do not,
/// so a missing key is reported but never fails the doctor.
fn check_llm_api_key(config: &AppConfig) -> DoctorCheck {
    match config.llm.api_key {
        Some(_) => DoctorCheck::pass(
            "llm_api_key",
            format!("api key configured for model `{}`", config.llm.model),
        ),
        None => DoctorCheck::skip(
            "llm_api_key",
            "no api key configured; set CONCLAVE_LLM_API_KEY to enable derivation",
        ),
    }
}

fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck::fail(
                "database_connectivity",
                format!("failed to initialize async runtime: {error}"),
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = commands::connect(config).await.map_err(|(_, message, _)| message)?;
        pool.close().await;
        Ok::<(), String>(())
    });

    match result {
        Ok(()) => DoctorCheck::pass(
            "database_connectivity",
            format!("connected using `{}`", config.database.url),
        ),
        Err(details) => DoctorCheck::fail("database_connectivity", details),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];
    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }
    lines.join("\n")
}
