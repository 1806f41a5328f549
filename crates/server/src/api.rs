use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use sentinel_agent::{ChatReply, ChatRequest};
use sentinel_core::{
    ApplicationError, DomainError, InterfaceError, ManualOverride, PredictionReport, PriceRequest,
    RequestMode,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::health;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PredictBody {
    pub item: String,
    pub state: String,
    #[serde(default, alias = "premise")]
    pub premise_type: Option<String>,
    #[serde(default, alias = "actual_price")]
    pub actual_market_price: Option<f64>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub usd_now: Option<f64>,
    #[serde(default)]
    pub usd_lag_60: Option<f64>,
    #[serde(default)]
    pub diesel_now: Option<f64>,
    #[serde(default)]
    pub diesel_lag_30: Option<f64>,
    #[serde(default)]
    pub is_festive: u8,
}

impl PredictBody {
    pub fn into_request(self, today: NaiveDate) -> Result<PriceRequest, DomainError> {
        let manual = match (self.usd_now, self.usd_lag_60, self.diesel_now, self.diesel_lag_30) {
            (None, None, None, None) => None,
            (Some(currency_now), Some(currency_lag60), Some(fuel_now), Some(fuel_lag30)) => {
                Some(ManualOverride { currency_now, currency_lag60, fuel_now, fuel_lag30 })
            }
            _ => {
                return Err(DomainError::InvalidRequest(
                    "manual override requires usd_now, usd_lag_60, diesel_now and diesel_lag_30"
                        .to_string(),
                ))
            }
        };

        let festive = match self.is_festive {
            0 => false,
            1 => true,
            other => {
                return Err(DomainError::InvalidRequest(format!(
                    "is_festive must be 0 or 1, got {other}"
                )))
            }
        };

        Ok(PriceRequest {
            item: self.item,
            region: self.state,
            premise: self.premise_type,
            observed_price: self.actual_market_price,
            mode: RequestMode::from_parts(self.target_date, manual)?,
            festive,
            today,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error_class: String,
    pub message: String,
    pub correlation_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub status: String,
    pub models: usize,
    pub cost_basis_rows: usize,
    pub price_series: usize,
    pub correlation_id: String,
}

/// Interface error rendered as a JSON body with the mapped HTTP status.
#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl ApiError {
    fn domain(error: DomainError, correlation_id: &str) -> Self {
        Self(ApplicationError::from(error).into_interface(correlation_id))
    }

    fn rejected(rejection: JsonRejection, correlation_id: &str) -> Self {
        Self(InterfaceError::BadRequest {
            message: rejection.body_text(),
            correlation_id: correlation_id.to_string(),
        })
    }

    pub fn status(&self) -> StatusCode {
        match self.0 {
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = &self.0;
        warn!(
            event_name = "sentinel.api.request_failed",
            correlation_id = error.correlation_id(),
            error_class = error.error_class(),
            status = status.as_u16(),
            error = %error,
            "request failed"
        );

        // Client errors carry their reason; server-side details stay in the log.
        let message = match error {
            InterfaceError::NotFound { message, .. } | InterfaceError::BadRequest { message, .. } => {
                message.clone()
            }
            InterfaceError::ServiceUnavailable { .. } | InterfaceError::Internal { .. } => {
                error.user_message().to_string()
            }
        };
        let body = ErrorBody {
            error_class: error.error_class().to_string(),
            message,
            correlation_id: error.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/predict", post(predict))
        .route("/chat", post(chat))
        .route("/admin/reload", post(reload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn predict(
    State(state): State<AppState>,
    body: Result<Json<PredictBody>, JsonRejection>,
) -> Result<Json<PredictionReport>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let Json(body) = body.map_err(|rejection| ApiError::rejected(rejection, &correlation_id))?;
    let request = body
        .into_request(Utc::now().date_naive())
        .map_err(|error| ApiError::domain(error, &correlation_id))?;

    let pipeline = state.assets.snapshot();
    let report = pipeline
        .predict(&request, state.analyst.as_ref(), &correlation_id)
        .await
        .map_err(|error| ApiError::domain(error, &correlation_id))?;

    info!(
        event_name = "sentinel.pipeline.predicted",
        correlation_id = %correlation_id,
        item = %report.sentinel_meta.item,
        state = %report.sentinel_meta.state,
        mode = %report.sentinel_meta.mode,
        fair_price = report.pricing_hub.fair_price,
        audit_status = report.pricing_hub.audit_report.status.as_str(),
        "prediction served"
    );

    Ok(Json(report))
}

/// Accepts the question as a JSON body or, as the dashboard sends it, as
/// query parameters on a bodiless POST. A parseable body wins.
pub async fn chat(
    State(state): State<AppState>,
    query: Result<Query<ChatRequest>, QueryRejection>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let request = match (body, query) {
        (Ok(Json(request)), _) | (Err(_), Ok(Query(request))) => request,
        (Err(rejection), Err(_)) => return Err(ApiError::rejected(rejection, &correlation_id)),
    };

    let reply = state.analyst.chat(&request).await;
    info!(
        event_name = "sentinel.chat.answered",
        correlation_id = %correlation_id,
        item = %request.item,
        "chat reply served"
    );
    Ok(Json(reply))
}

pub async fn reload(State(state): State<AppState>) -> Result<Json<ReloadResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let pipeline = state
        .source
        .load()
        .await
        .map_err(|error| ApiError(ApplicationError::from(error).into_interface(&correlation_id)))?;

    let response = ReloadResponse {
        status: "reloaded".to_string(),
        models: pipeline.models().len(),
        cost_basis_rows: pipeline.cost_basis().len(),
        price_series: pipeline.history().series_count(),
        correlation_id: correlation_id.clone(),
    };
    state.assets.publish(pipeline);

    info!(
        event_name = "system.assets.reloaded",
        correlation_id = %correlation_id,
        models = response.models,
        cost_basis_rows = response.cost_basis_rows,
        "asset snapshot published"
    );
    Ok(Json(response))
}
