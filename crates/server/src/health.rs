use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use sentinel_db::DbPool;
use serde::Serialize;

use crate::state::AppState;

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
    pub assets: HealthCheck,
    pub checked_at: String,
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(state.source.db_pool()).await;
    let snapshot = state.assets.snapshot();
    let assets = if snapshot.models().is_empty() {
        HealthCheck { status: "degraded", detail: "no pricing models are loaded".to_string() }
    } else {
        HealthCheck {
            status: "ready",
            detail: format!(
                "{} models, {} cost-basis rows, {} price series",
                snapshot.models().len(),
                snapshot.cost_basis().len(),
                snapshot.history().series_count()
            ),
        }
    };
    let ready = database.status == "ready" && assets.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "sentinel-server runtime initialized".to_string(),
        },
        database,
        assets,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}
