use quotedesk_core::config::{AppConfig, LoadOptions};
use quotedesk_db::{connect, migrations, ping};
use serde::Serialize;

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

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
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
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["database_connectivity", "migration_state"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
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

fn check_database(config: &AppConfig) -> [DoctorCheck; 2] {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return [
                DoctorCheck {
                    name: "database_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("failed to initialize async runtime: {error}"),
                },
                skipped_migrations(),
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return [
                    DoctorCheck {
                        name: "database_connectivity",
                        status: CheckStatus::Fail,
                        details: format!("failed to connect to database: {error}"),
                    },
                    skipped_migrations(),
                ];
            }
        };

        let connectivity = match ping(&pool).await {
            Ok(()) => DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Pass,
                details: format!("connected using `{}`", config.database.url),
            },
            Err(error) => DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Fail,
                details: format!("database query failed: {error}"),
            },
        };

        let embedded = migrations::embedded_count() as i64;
        let migration_state = match migrations::applied_count(&pool).await {
            Ok(applied) if applied >= embedded => DoctorCheck {
                name: "migration_state",
                status: CheckStatus::Pass,
                details: format!("{applied} of {embedded} migration(s) applied"),
            },
            Ok(applied) => DoctorCheck {
                name: "migration_state",
                status: CheckStatus::Fail,
                details: format!(
                    "{} migration(s) pending; run `quotedesk migrate`",
                    embedded - applied
                ),
            },
            Err(error) => DoctorCheck {
                name: "migration_state",
                status: CheckStatus::Fail,
                details: format!("could not read migration history: {error}"),
            },
        };

        pool.close().await;
        [connectivity, migration_state]
    })
}

fn skipped_migrations() -> DoctorCheck {
    DoctorCheck {
        name: "migration_state",
        status: CheckStatus::Skipped,
        details: "skipped because the database is unreachable".to_string(),
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
