use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::json;

use super::delivery::DeliveryError;
use super::domain::Applicant;
use super::form::ApplicationForm;
use super::pipeline::{ApplicationPipeline, SubmissionError, SubmissionSession};

/// Header a client sends to tie repeated submits to one form instance.
pub const FORM_SESSION_HEADER: &str = "x-form-session";

/// In-flight sessions keyed by the client's form session id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<SubmissionSession>>>,
}

impl SessionRegistry {
    pub fn session(&self, id: &str) -> Arc<SubmissionSession> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(sessions.entry(id.to_string()).or_default())
    }

    /// Drops the entry unless another request is still using it.
    pub fn release(&self, id: &str) {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = sessions.get(id) {
            if !session.is_in_flight() && Arc::strong_count(session) == 1 {
                sessions.remove(id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone)]
pub(crate) struct RecruitmentState {
    pipeline: Arc<ApplicationPipeline>,
    sessions: Arc<SessionRegistry>,
}

/// Router exposing validation and submission of job applications. The body
/// limit follows the configured file ceilings since attachments travel
/// inline as base64.
pub fn application_router(pipeline: Arc<ApplicationPipeline>) -> Router {
    let body_limit = pipeline.policy().limits().request_body_limit();
    Router::new()
        .route("/api/v1/applications", post(submit_handler))
        .route("/api/v1/applications/validate", post(validate_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(RecruitmentState {
            pipeline,
            sessions: Arc::new(SessionRegistry::default()),
        })
}

pub(crate) async fn validate_handler(
    State(state): State<RecruitmentState>,
    axum::Json(applicant): axum::Json<Applicant>,
) -> Response {
    let mut form = ApplicationForm::from_applicant(applicant);
    let valid = form.validate(state.pipeline.validator());
    let payload = json!({
        "valid": valid,
        "errors": form.errors(),
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn submit_handler(
    State(state): State<RecruitmentState>,
    headers: HeaderMap,
    axum::Json(applicant): axum::Json<Applicant>,
) -> Response {
    let session_id = headers
        .get(FORM_SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let session = match &session_id {
        Some(id) => state.sessions.session(id),
        None => Arc::new(SubmissionSession::new()),
    };

    let mut form = ApplicationForm::from_applicant(applicant);
    let outcome = state.pipeline.submit(&session, &mut form).await;
    drop(session);
    if let Some(id) = &session_id {
        state.sessions.release(id);
    }

    match outcome {
        Ok(receipt) => (StatusCode::ACCEPTED, axum::Json(receipt)).into_response(),
        Err(error) => submission_error_response(error),
    }
}

pub(crate) fn submission_error_response(error: SubmissionError) -> Response {
    let code = error.code();
    let (status, payload) = match &error {
        SubmissionError::AlreadyInFlight => (
            StatusCode::CONFLICT,
            json!({ "error": error.to_string(), "code": code }),
        ),
        SubmissionError::Invalid(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "error": error.to_string(), "code": code, "errors": errors }),
        ),
        SubmissionError::Files(failures) => (
            StatusCode::BAD_REQUEST,
            json!({ "error": error.to_string(), "code": code, "files": failures }),
        ),
        SubmissionError::Delivery(delivery) => (
            delivery_status(delivery),
            json!({ "error": error.to_string(), "code": code }),
        ),
    };
    (status, axum::Json(payload)).into_response()
}

pub(crate) fn delivery_status(error: &DeliveryError) -> StatusCode {
    match error {
        DeliveryError::TransportFailed { .. } | DeliveryError::PartialDelivery { .. } => {
            StatusCode::BAD_GATEWAY
        }
        DeliveryError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        DeliveryError::ConfigMissing(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
