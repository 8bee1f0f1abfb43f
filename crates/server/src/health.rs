use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use quotedesk_db::{migrations, ping, DbPool};
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub database: HealthCheck,
    pub migrations: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let migrations = if database.status == "ready" {
        migration_check(&state.db_pool).await
    } else {
        HealthCheck { status: "degraded", detail: "database unreachable".to_string() }
    };
    let ready = database.status == "ready" && migrations.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "quotedesk-server runtime initialized".to_string(),
        },
        database,
        migrations,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match ping(pool).await {
        Ok(()) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}

async fn migration_check(pool: &DbPool) -> HealthCheck {
    let embedded = migrations::embedded_count() as i64;
    match migrations::applied_count(pool).await {
        Ok(applied) if applied >= embedded => HealthCheck {
            status: "ready",
            detail: format!("{applied} of {embedded} migration(s) applied"),
        },
        Ok(applied) => HealthCheck {
            status: "degraded",
            detail: format!("{} migration(s) pending", embedded - applied),
        },
        Err(error) => HealthCheck {
            status: "degraded",
            detail: format!("could not read migration history: {error}"),
        },
    }
}
