use sentinel_core::config::{AppConfig, LoadOptions};
use sentinel_core::{ModelArtifactSet, PolicyTables};
use sentinel_db::connect_with_config;
use serde::Serialize;

use crate::commands::CommandResult;

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

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const CHECKS_AFTER_CONFIG: [&str; 3] = ["database_connectivity", "model_artifacts", "policy_tables"];

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_database_connectivity(&config));
            checks.push(check_model_artifacts(&config));
            checks.push(check_policy_tables(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.extend(CHECKS_AFTER_CONFIG.into_iter().map(|name| DoctorCheck {
                name,
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            }));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| format!("failed to connect to database: {error}"))?;

        pool.close().await;
        Ok::<(), String>(())
    });

    match result {
        Ok(()) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.url),
        },
        Err(error) => {
            DoctorCheck { name: "database_connectivity", status: CheckStatus::Fail, details: error }
        }
    }
}

fn check_model_artifacts(config: &AppConfig) -> DoctorCheck {
    let path = &config.assets.models_path;
    match ModelArtifactSet::load(path).and_then(ModelArtifactSet::into_registry) {
        Ok(registry) => DoctorCheck {
            name: "model_artifacts",
            status: CheckStatus::Pass,
            details: format!("{} models loaded from `{}`", registry.len(), path.display()),
        },
        Err(error) => DoctorCheck {
            name: "model_artifacts",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_policy_tables(config: &AppConfig) -> DoctorCheck {
    let source = config
        .assets
        .policy_path
        .as_ref()
        .map(|path| format!("`{}`", path.display()))
        .unwrap_or_else(|| "built-in defaults".to_string());

    match PolicyTables::load(config.assets.policy_path.as_deref()) {
        Ok(_) => DoctorCheck {
            name: "policy_tables",
            status: CheckStatus::Pass,
            details: format!("policy tables validated from {source}"),
        },
        Err(error) => {
            DoctorCheck { name: "policy_tables", status: CheckStatus::Fail, details: error.to_string() }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

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

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
