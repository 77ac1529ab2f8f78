use offerwise_core::config::{AppConfig, LoadOptions};
use offerwise_core::resolution::{ClassifierClient, ClassifierError};
use offerwise_db::{connect_with_settings, migrations};
use offerwise_server::classifier::HttpClassifierClient;
use serde::Serialize;

use crate::commands::{CommandResult, EXIT_DOCTOR};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
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

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Fail { EXIT_DOCTOR } else { 0 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
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
            let (database, classifier) = run_probes(&config);
            checks.push(database);
            checks.push(classifier);
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("database_connectivity"));
            checks.push(skipped("classifier_reachability"));
        }
    }

    summarize(checks)
}

fn summarize(checks: Vec<DoctorCheck>) -> DoctorReport {
    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let warned = checks.iter().any(|check| check.status == CheckStatus::Warn);

    let (overall_status, summary) = match (failed, warned) {
        (true, _) => (CheckStatus::Fail, "doctor: one or more readiness checks failed"),
        (false, true) => (
            CheckStatus::Warn,
            "doctor: ready, recommendations will be served from the rule table",
        ),
        (false, false) => (CheckStatus::Pass, "doctor: all readiness checks passed"),
    };

    DoctorReport { overall_status, summary: summary.to_string(), checks }
}

fn skipped(name: &'static str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: "skipped because configuration did not load".to_string(),
    }
}

fn run_probes(config: &AppConfig) -> (DoctorCheck, DoctorCheck) {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            let details = format!("failed to initialize async runtime: {error}");
            return (
                DoctorCheck { name: "database_connectivity", status: CheckStatus::Fail, details },
                DoctorCheck {
                    name: "classifier_reachability",
                    status: CheckStatus::Skipped,
                    details: "skipped because the async runtime did not start".to_string(),
                },
            );
        }
    };

    runtime.block_on(async {
        (check_database_connectivity(config).await, check_classifier(config).await)
    })
}

async fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    let result = async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

        let applied = migrations::applied_count(&pool).await;
        pool.close().await;
        let applied = applied.map_err(|error| format!("failed to query database: {error}"))?;
        Ok::<(usize, usize), String>((migrations::known_count(), applied))
    }
    .await;

    match result {
        Ok((known, applied)) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!(
                "connected using `{}` ({applied} of {known} migrations applied)",
                config.database.url
            ),
        },
        Err(error) => {
            DoctorCheck { name: "database_connectivity", status: CheckStatus::Fail, details: error }
        }
    }
}

async fn check_classifier(config: &AppConfig) -> DoctorCheck {
    if !config.classifier.enabled {
        return DoctorCheck {
            name: "classifier_reachability",
            status: CheckStatus::Skipped,
            details: "classifier disabled; recommendations come from the rule table".to_string(),
        };
    }

    let client = match HttpClassifierClient::new(&config.classifier) {
        Ok(client) => client,
        Err(error) => {
            return DoctorCheck {
                name: "classifier_reachability",
                status: CheckStatus::Fail,
                details: format!("classifier client could not be built: {error}"),
            };
        }
    };

    classifier_check(client.probe().await, &config.classifier.endpoint_url)
}

fn classifier_check(probe: Result<(), ClassifierError>, endpoint_url: &str) -> DoctorCheck {
    match probe {
        Ok(()) => DoctorCheck {
            name: "classifier_reachability",
            status: CheckStatus::Pass,
            details: format!("classifier at `{endpoint_url}` answered its health probe"),
        },
        Err(error) => DoctorCheck {
            name: "classifier_reachability",
            status: CheckStatus::Warn,
            details: format!("classifier at `{endpoint_url}` unreachable: {error}"),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use offerwise_core::resolution::ClassifierError;

    use super::{classifier_check, render_human, summarize, CheckStatus, DoctorCheck};

    fn check(name: &'static str, status: CheckStatus) -> DoctorCheck {
        DoctorCheck { name, status, details: String::new() }
    }

    #[test]
    fn classifier_outage_warns_without_failing_the_report() {
        let classifier =
            classifier_check(Err(ClassifierError::Status(502)), "http://ml:8000/recommend");
        assert_eq!(classifier.status, CheckStatus::Warn);

        let report = summarize(vec![
            check("config_validation", CheckStatus::Pass),
            check("database_connectivity", CheckStatus::Pass),
            classifier,
        ]);
        assert_eq!(report.overall_status, CheckStatus::Warn);
    }

    #[test]
    fn any_failed_check_fails_the_report() {
        let report = summarize(vec![
            check("config_validation", CheckStatus::Fail),
            check("database_connectivity", CheckStatus::Skipped),
        ]);
        assert_eq!(report.overall_status, CheckStatus::Fail);
        assert!(render_human(&report).contains("- [fail] config_validation"));
    }
}
