use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::json;

use super::{InquiryError, InquiryService, ServiceInquiry};
use crate::workflows::recruitment::router::delivery_status;

pub fn inquiry_router(service: Arc<InquiryService>) -> Router {
    Router::new()
        .route("/api/v1/inquiries", post(submit_handler))
        .with_state(service)
}

pub(crate) async fn submit_handler(
    State(service): State<Arc<InquiryService>>,
    axum::Json(inquiry): axum::Json<ServiceInquiry>,
) -> Response {
    match service.submit(&inquiry).await {
        Ok(ack) => (StatusCode::ACCEPTED, axum::Json(ack)).into_response(),
        Err(InquiryError::Invalid(errors)) => {
            let payload = json!({
                "error": "inquiry is incomplete",
                "errors": errors,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(InquiryError::Delivery(error)) => {
            let payload = json!({
                "error": error.to_string(),
                "code": error.code(),
            });
            (delivery_status(&error), axum::Json(payload)).into_response()
        }
    }
}
