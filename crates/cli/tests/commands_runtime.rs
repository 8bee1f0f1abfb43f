use std::env;
use std::sync::{Mutex, OnceLock};

use quotedesk_cli::commands::{config, doctor, migrate, seed, start};
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn start_returns_success_with_valid_env() {
    with_env(&[("QUOTEDESK_DATABASE_URL", "sqlite::memory:")], || {
        let result = start::run();
        assert_eq!(result.exit_code, 0, "expected successful start preflight");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "start");
        assert_eq!(payload["status"], "ok");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("127.0.0.1:8080"));
        assert!(message.contains("admin-1"));
    });
}

#[test]
fn start_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("QUOTEDESK_DATABASE_URL", "postgres://localhost/quotes")], || {
        let result = start::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "start");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn start_reports_database_connectivity_failure() {
    let dir = TempDir::new().expect("tempdir");
    let url = format!("sqlite://{}/missing/nested/quotedesk.db", dir.path().display());

    with_env(&[("QUOTEDESK_DATABASE_URL", url.as_str())], || {
        let result = start::run();
        assert_eq!(result.exit_code, 4, "expected db connectivity failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "db_connectivity");
    });
}

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("QUOTEDESK_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["message"], "applied 1 pending migration(s)");
    });
}

#[test]
fn seed_is_idempotent_against_a_file_database() {
    let dir = TempDir::new().expect("tempdir");
    let url = format!("sqlite://{}/seed.db?mode=rwc", dir.path().display());

    with_env(&[("QUOTEDESK_DATABASE_URL", url.as_str())], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);
        assert_eq!(first_payload["command"], "seed");
        assert_eq!(
            first_payload["message"],
            "demo requests: 3 created, 0 already present; quotations created: 1"
        );

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        let second_payload = parse_payload(&second.output);
        assert_eq!(
            second_payload["message"],
            "demo requests: 0 created, 3 already present; quotations created: 0"
        );
    });
}

#[test]
fn config_attributes_env_sources() {
    with_env(
        &[("QUOTEDESK_DATABASE_URL", "sqlite::memory:"), ("QUOTEDESK_DESK_ADMIN_ID", "admin-42")],
        || {
            let result = config::run();
            assert_eq!(result.exit_code, 0);
            assert!(result
                .output
                .contains("- desk.admin_id = admin-42 (source: env (QUOTEDESK_DESK_ADMIN_ID))"));
            assert!(result.output.contains("- server.port = 8080 (source: default)"));
            assert!(result.output.contains("- logging.format = compact (source: default)"));
        },
    );
}

#[test]
fn config_reports_validation_failure() {
    with_env(&[("QUOTEDESK_LOGGING_LEVEL", "loud")], || {
        let result = config::run();
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "config");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn doctor_flags_pending_migrations_on_a_fresh_database() {
    with_env(&[("QUOTEDESK_DATABASE_URL", "sqlite::memory:")], || {
        let payload = parse_payload(&doctor::run(true));

        assert_eq!(payload["overall_status"], "fail");
        let checks = payload["checks"].as_array().cloned().unwrap_or_default();
        let status_of = |name: &str| {
            checks
                .iter()
                .find(|check| check["name"] == name)
                .map(|check| check["status"].clone())
                .unwrap_or(Value::Null)
        };
        assert_eq!(status_of("config_validation"), "pass");
        assert_eq!(status_of("database_connectivity"), "pass");
        assert_eq!(status_of("migration_state"), "fail");
    });
}

#[test]
fn doctor_passes_after_migrate_on_a_file_database() {
    let dir = TempDir::new().expect("tempdir");
    let url = format!("sqlite://{}/doctor.db?mode=rwc", dir.path().display());

    with_env(&[("QUOTEDESK_DATABASE_URL", url.as_str())], || {
        assert_eq!(migrate::run().exit_code, 0);

        let report = doctor::run(false);
        assert!(report.starts_with("doctor: all readiness checks passed"), "{report}");
        assert!(report.contains("- [ok] migration_state: 1 of 1 migration(s) applied"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "QUOTEDESK_DATABASE_URL",
        "QUOTEDESK_DATABASE_MAX_CONNECTIONS",
        "QUOTEDESK_DATABASE_TIMEOUT_SECS",
        "QUOTEDESK_SERVER_BIND_ADDRESS",
        "QUOTEDESK_SERVER_PORT",
        "QUOTEDESK_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "QUOTEDESK_DESK_ADMIN_ID",
        "QUOTEDESK_LOGGING_LEVEL",
        "QUOTEDESK_LOGGING_FORMAT",
        "QUOTEDESK_LOG_LEVEL",
        "QUOTEDESK_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
