use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use estimator_core::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink};
use estimator_core::domain::estimate::{Estimate, EstimateRecord, EstimateRequest};
use estimator_core::domain::service::ServiceDefinition;
use estimator_core::engine::Estimator;
use estimator_core::errors::{ApplicationError, InterfaceError};
use estimator_db::{EstimateRecordRepository, StoredEstimateRecord};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::document::{DocumentRenderer, RenderedDocument};

pub const DEFAULT_RECORDS_LIMIT: u32 = 20;
pub const MAX_RECORDS_LIMIT: u32 = 200;

#[derive(Clone)]
pub struct ApiState {
    pub estimator: Arc<Estimator>,
    pub records: Arc<dyn EstimateRecordRepository>,
    pub documents: Arc<DocumentRenderer>,
    pub audit: Arc<dyn AuditSink>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub error: String,
    pub detail: String,
    pub correlation_id: String,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

fn error_response(error: InterfaceError) -> (StatusCode, Json<ApiError>) {
    let status = match &error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ApiError {
            error: error.user_message().to_string(),
            detail: error.message().to_string(),
            correlation_id: error.correlation_id().to_string(),
        }),
    )
}

fn correlation_id() -> String {
    format!("req-{}", uuid::Uuid::new_v4())
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/services", get(list_services))
        .route("/api/v1/services/{name}", get(get_service))
        .route("/api/v1/estimates", post(create_estimate))
        .route("/api/v1/estimates/document", post(render_document))
        .route("/api/v1/estimates/records", get(list_records))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
pub struct ServiceSearchQuery {
    pub search: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServiceSummary {
    pub name: String,
    pub display_name: String,
    pub question_count: usize,
    pub unit: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServiceListResponse {
    pub services: Vec<ServiceSummary>,
}

pub async fn list_services(
    State(state): State<ApiState>,
    Query(query): Query<ServiceSearchQuery>,
) -> Json<ServiceListResponse> {
    let catalog = state.estimator.catalog();
    let term = query.search.unwrap_or_default();

    let services = catalog
        .search(&term)
        .into_iter()
        .filter_map(|name| catalog.lookup(name).ok())
        .map(|service| ServiceSummary {
            name: service.name.clone(),
            display_name: service.display_name(),
            question_count: service.questions.len(),
            unit: service.unit.clone(),
        })
        .collect();

    Json(ServiceListResponse { services })
}

pub async fn get_service(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> ApiResult<Json<ServiceDefinition>> {
    state
        .estimator
        .catalog()
        .lookup(&name)
        .map(|service| Json(service.clone()))
        .map_err(|error| {
            error_response(ApplicationError::from(error).into_interface(correlation_id()))
        })
}

// ---------------------------------------------------------------------------
// Estimates
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PersistenceOutcome {
    pub persisted: bool,
    pub record_id: Option<i64>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EstimateResponse {
    pub correlation_id: String,
    pub estimate: Estimate,
    pub persistence: PersistenceOutcome,
}

/// Evaluates and persists an estimate. A failed save still returns the
/// computed estimate with `persisted = false`.
pub async fn create_estimate(
    State(state): State<ApiState>,
    Json(request): Json<EstimateRequest>,
) -> ApiResult<Json<EstimateResponse>> {
    let correlation_id = correlation_id();
    let context = AuditContext::new(correlation_id.clone(), request.estimator.trim());

    let estimate = match state.estimator.estimate(request) {
        Ok(estimate) => estimate,
        Err(error) => {
            state.audit.emit(
                context
                    .event("estimate.rejected", AuditCategory::Pricing, AuditOutcome::Rejected)
                    .with_metadata("reason", error.to_string()),
            );
            return Err(error_response(
                ApplicationError::from(error).into_interface(correlation_id),
            ));
        }
    };

    info!(
        event_name = "estimate.evaluated",
        correlation_id = %correlation_id,
        estimator = %estimate.estimator,
        service_count = estimate.services.len(),
        grand_total = %estimate.summary.grand_total,
        "estimate evaluated"
    );
    state.audit.emit(
        context
            .event("estimate.evaluated", AuditCategory::Pricing, AuditOutcome::Success)
            .with_estimate(&estimate),
    );

    let persistence = match state.records.append(estimate.to_record()).await {
        Ok(record_id) => {
            state.audit.emit(
                context
                    .event("estimate.persisted", AuditCategory::Persistence, AuditOutcome::Success)
                    .with_metadata("record_id", record_id.to_string()),
            );
            PersistenceOutcome { persisted: true, record_id: Some(record_id), error: None }
        }
        Err(error) => {
            let error = ApplicationError::from(error);
            warn!(
                event_name = "estimate.persist_failed",
                correlation_id = %correlation_id,
                error = %error,
                "estimate computed but could not be saved"
            );
            state.audit.emit(
                context
                    .event(
                        "estimate.persist_failed",
                        AuditCategory::Persistence,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("error", error.to_string()),
            );
            let interface = error.into_interface(correlation_id.clone());
            PersistenceOutcome {
                persisted: false,
                record_id: None,
                error: Some(interface.message().to_string()),
            }
        }
    };

    Ok(Json(EstimateResponse { correlation_id, estimate, persistence }))
}

pub async fn render_document(
    State(state): State<ApiState>,
    Json(estimate): Json<Estimate>,
) -> ApiResult<RenderedDocument> {
    let correlation_id = correlation_id();
    let context = AuditContext::new(correlation_id.clone(), estimate.estimator.clone());

    match state.documents.render(&estimate).await {
        Ok(document) => {
            state.audit.emit(
                context
                    .event(
                        "estimate.document_rendered",
                        AuditCategory::Document,
                        AuditOutcome::Success,
                    )
                    .with_metadata("file_name", document.file_name()),
            );
            Ok(document)
        }
        Err(error) => {
            state.audit.emit(
                context
                    .event(
                        "estimate.document_failed",
                        AuditCategory::Document,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("error", error.to_string()),
            );
            Err(error_response(
                ApplicationError::Document(error.to_string()).into_interface(correlation_id),
            ))
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
pub struct RecordsQuery {
    pub limit: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecordView {
    pub id: i64,
    #[serde(flatten)]
    pub record: EstimateRecord,
}

impl From<StoredEstimateRecord> for RecordView {
    fn from(value: StoredEstimateRecord) -> Self {
        Self { id: value.id, record: value.record }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecordsResponse {
    pub records: Vec<RecordView>,
}

pub async fn list_records(
    State(state): State<ApiState>,
    Query(query): Query<RecordsQuery>,
) -> ApiResult<Json<RecordsResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_RECORDS_LIMIT).clamp(1, MAX_RECORDS_LIMIT);

    let records = state.records.list_recent(limit).await.map_err(|error| {
        error_response(ApplicationError::from(error).into_interface(correlation_id()))
    })?;

    Ok(Json(RecordsResponse { records: records.into_iter().map(RecordView::from).collect() }))
}
