//! JSON API for the quotation desk, mounted under `/api/v1`.
//!
//! Absent rows are `200 null`. Errors carry a correlation id that also tags
//! the handler's log events.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{error, warn, Instrument};
use uuid::Uuid;

use quotedesk_core::domain::quotation::Quotation;
use quotedesk_core::domain::request::{QuoteRequest, RequestId};
use quotedesk_core::errors::{ApplicationError, FieldViolation, InterfaceError};
use quotedesk_core::input::{NewRequestInput, QuotationInput};
use quotedesk_core::pricing::PricedItems;
use quotedesk_db::QuotationDesk;

#[derive(Clone)]
pub struct ApiState {
    desk: QuotationDesk,
}

pub fn router(desk: QuotationDesk) -> Router {
    Router::new()
        .route("/api/v1/requests", post(create_request).get(list_requests))
        .route("/api/v1/requests/{id}", get(get_request))
        .route("/api/v1/requests/{id}/quotation", get(get_quotation).put(upsert_quotation))
        .route("/api/v1/quotations/preview", post(preview_quotation))
        .with_state(ApiState { desk })
}

/// A request plus the display hints the listing views need.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestView {
    #[serde(flatten)]
    pub request: QuoteRequest,
    pub status_label: &'static str,
    pub has_quotation: bool,
}

impl From<QuoteRequest> for RequestView {
    fn from(request: QuoteRequest) -> Self {
        Self {
            status_label: request.status.label(),
            has_quotation: request.status.has_quotation(),
            request,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: &'static str,
    detail: String,
    correlation_id: String,
    fields: Vec<FieldViolation>,
}

#[derive(Debug)]
pub struct ApiError(InterfaceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.0.user_message(),
            detail: self.0.to_string(),
            correlation_id: self.0.correlation_id().to_string(),
            fields: self.0.fields().to_vec(),
        };
        (status, Json(body)).into_response()
    }
}

fn fail(correlation_id: &str, failure: ApplicationError) -> ApiError {
    let interface = failure.into_interface(correlation_id);
    match &interface {
        InterfaceError::ServiceUnavailable { .. } | InterfaceError::Internal { .. } => {
            error!(event_name = "api.request.failed", error = %interface, "request failed");
        }
        _ => warn!(event_name = "api.request.rejected", error = %interface, "request rejected"),
    }
    ApiError(interface)
}

fn malformed_body(correlation_id: &str, rejection: JsonRejection) -> ApiError {
    let reason = rejection.body_text();
    warn!(event_name = "api.request.malformed", reason = %reason, "request body rejected");
    ApiError(InterfaceError::BadRequest {
        message: "request body could not be parsed".to_string(),
        fields: vec![FieldViolation::new("body", reason)],
        correlation_id: correlation_id.to_string(),
    })
}

fn span(operation: &'static str, correlation_id: &str) -> tracing::Span {
    tracing::info_span!("api", operation, correlation_id = %correlation_id)
}

async fn create_request(
    State(state): State<ApiState>,
    payload: Result<Json<NewRequestInput>, JsonRejection>,
) -> Result<(StatusCode, Json<RequestView>), ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    async {
        let Json(input) = payload.map_err(|rejection| malformed_body(&correlation_id, rejection))?;
        let request =
            state.desk.create_request(input).await.map_err(|e| fail(&correlation_id, e))?;
        Ok((StatusCode::CREATED, Json(RequestView::from(request))))
    }
    .instrument(span("createRequest", &correlation_id))
    .await
}

async fn list_requests(State(state): State<ApiState>) -> Result<Json<Vec<RequestView>>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    async {
        let requests = state.desk.list_requests().await.map_err(|e| fail(&correlation_id, e))?;
        Ok(Json(requests.into_iter().map(RequestView::from).collect()))
    }
    .instrument(span("listRequests", &correlation_id))
    .await
}

async fn get_request(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Option<RequestView>>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    async {
        let request =
            state.desk.get_request(&RequestId(id)).await.map_err(|e| fail(&correlation_id, e))?;
        Ok(Json(request.map(RequestView::from)))
    }
    .instrument(span("getRequest", &correlation_id))
    .await
}

async fn get_quotation(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Option<Quotation>>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    async {
        let quotation =
            state.desk.get_quotation(&RequestId(id)).await.map_err(|e| fail(&correlation_id, e))?;
        Ok(Json(quotation))
    }
    .instrument(span("getQuotation", &correlation_id))
    .await
}

async fn upsert_quotation(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    payload: Result<Json<QuotationInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Quotation>), ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    async {
        let Json(input) = payload.map_err(|rejection| malformed_body(&correlation_id, rejection))?;
        let outcome = state
            .desk
            .upsert_quotation(RequestId(id), input)
            .await
            .map_err(|e| fail(&correlation_id, e))?;
        let status = if outcome.was_created() { StatusCode::CREATED } else { StatusCode::OK };
        Ok((status, Json(outcome.into_quotation())))
    }
    .instrument(span("upsertQuotation", &correlation_id))
    .await
}

async fn preview_quotation(
    State(state): State<ApiState>,
    payload: Result<Json<QuotationInput>, JsonRejection>,
) -> Result<Json<PricedItems>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    span("previewQuotation", &correlation_id).in_scope(|| {
        let Json(input) =
            payload.map_err(|rejection| malformed_body(&correlation_id, rejection))?;
        let priced = state.desk.preview(input).map_err(|e| fail(&correlation_id, e))?;
        Ok(Json(priced))
    })
}
