//! End-to-end submission of a job application through the public pipeline,
//! the configured gateway and a local relay stub.

mod common {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use image::codecs::jpeg::JpegEncoder;
    use image::{Rgb, RgbImage};
    use serde_json::Value;

    use job_intake::config::{MailApiConfig, MailConfig};
    use job_intake::workflows::recruitment::{
        Applicability, Applicant, Category, DeliveryStrategy, EducationTier, Gender,
        MailClientKind, UploadedFile,
    };

    pub(super) const RECIPIENT: &str = "careers@example.org";

    pub(super) type Inbox = Arc<Mutex<Vec<Value>>>;

    async fn accept(State(inbox): State<Inbox>, Json(body): Json<Value>) -> StatusCode {
        inbox.lock().expect("inbox mutex poisoned").push(body);
        StatusCode::OK
    }

    pub(super) async fn relay_stub() -> (String, Inbox) {
        let inbox = Inbox::default();
        let router = Router::new()
            .route("/api/v1/mail/send", post(accept))
            .with_state(inbox.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind relay stub");
        let address = listener.local_addr().expect("stub address");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("relay stub");
        });
        (format!("http://{address}/api/v1/mail/send"), inbox)
    }

    pub(super) fn relay_config(endpoint: String) -> MailConfig {
        MailConfig {
            recipient: Some(RECIPIENT.to_string()),
            strategy: DeliveryStrategy::Relay,
            fallback: None,
            relay_endpoint: Some(endpoint),
            mail_api: MailApiConfig {
                endpoint: "http://127.0.0.1:9/unused".to_string(),
                service_id: None,
                template_id: None,
                public_key: None,
                payload_ceiling: 50_000,
            },
            timeout: Duration::from_secs(5),
            mail_client: MailClientKind::LogOnly,
        }
    }

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 200 / width) as u8, (y * 200 / height) as u8, 120])
        });
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, 90)
            .encode_image(&image)
            .expect("jpeg encodes");
        bytes
    }

    fn pdf(size: usize) -> Vec<u8> {
        let mut bytes = b"%PDF-1.4\n".to_vec();
        bytes.resize(size, b' ');
        bytes
    }

    pub(super) fn asha_rao() -> Applicant {
        let mut applicant = Applicant {
            first_name: "Asha".to_string(),
            last_name: "Rao".to_string(),
            father_name: "Venkat Rao".to_string(),
            date_of_birth: "1994-08-17".to_string(),
            gender: Some(Gender::Female),
            category: Some(Category::Obc),
            national_id: "123456789012".to_string(),
            email: "asha.rao@example.com".to_string(),
            phone: "9876543210".to_string(),
            address: "4-12 Station Road".to_string(),
            city: "Visakhapatnam".to_string(),
            postal_code: "530001".to_string(),
            position: "Lascar".to_string(),
            experience: "3".to_string(),
            photo: Some(UploadedFile::new("asha.jpg", "image/jpeg", jpeg(640, 800))),
            ..Applicant::default()
        };
        applicant.education.tenth = EducationTier {
            applicability: Applicability::Yes,
            institution: "ZP High School".to_string(),
            year: "2010".to_string(),
            percentage: "78.50".to_string(),
            certificate: Some(UploadedFile::new("tenth.pdf", "application/pdf", pdf(200_000))),
        };
        for tier in [
            &mut applicant.education.intermediate,
            &mut applicant.education.diploma,
            &mut applicant.education.graduation,
        ] {
            tier.applicability = Applicability::No;
        }
        applicant
    }
}

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use job_intake::config::IntakeConfig;
use job_intake::workflows::recruitment::{
    application_router, build_gateway, read_tier_blocks, ApplicationForm, ApplicationPipeline,
    ApplicationValidator, FileConstraintPolicy, FileIngestor, FormState, SubmissionComposer,
    SubmissionError, SubmissionSession, TierKind, TierSummary, Verification,
};

use common::*;

fn pipeline(endpoint: String) -> ApplicationPipeline {
    let intake = IntakeConfig::default();
    let gateway = build_gateway(&relay_config(endpoint)).expect("relay configured");
    ApplicationPipeline::new(
        ApplicationValidator::new(intake.rules, intake.positions.clone()),
        FileIngestor::new(FileConstraintPolicy::new(intake.file_limits), intake.image),
        SubmissionComposer::new(RECIPIENT),
        gateway,
    )
}

#[tokio::test]
async fn asha_rao_application_is_delivered_through_the_relay() {
    let (endpoint, inbox) = relay_stub().await;
    let pipeline = pipeline(endpoint);
    let session = SubmissionSession::new();
    let mut form = ApplicationForm::from_applicant(asha_rao());

    let receipt = pipeline
        .submit(&session, &mut form)
        .await
        .expect("application delivered");

    assert_eq!(receipt.delivery.verification, Verification::Confirmed);
    assert_eq!(receipt.attachments, vec!["Passport Photo", "10th Memo"]);
    assert_eq!(form.state(), FormState::Submitted);

    let requests = inbox.lock().expect("inbox mutex poisoned").clone();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request["to"], RECIPIENT);
    assert_eq!(request["from"], "asha.rao@example.com");
    assert_eq!(request["subject"], "Job Application - Asha Rao");
    assert_eq!(request["attachments"][0]["contentType"], "image/jpeg");
    assert_eq!(request["attachments"][1]["contentType"], "application/pdf");

    let body = request["body"].as_str().expect("plain-text body");
    let blocks = read_tier_blocks(body);
    assert_eq!(
        blocks,
        vec![
            (
                TierKind::Tenth,
                TierSummary::Populated {
                    institution: "ZP High School".to_string(),
                    year: "2010".to_string(),
                    percentage: "78.50".to_string(),
                }
            ),
            (TierKind::Intermediate, TierSummary::NotApplicable),
            (TierKind::Diploma, TierSummary::NotApplicable),
            (TierKind::Graduation, TierSummary::NotApplicable),
        ]
    );
}

#[tokio::test]
async fn five_digit_phone_blocks_submission() {
    let (endpoint, inbox) = relay_stub().await;
    let pipeline = pipeline(endpoint);
    let mut applicant = asha_rao();
    applicant.phone = "98765".to_string();
    let mut form = ApplicationForm::from_applicant(applicant);

    let error = pipeline
        .submit(&SubmissionSession::new(), &mut form)
        .await
        .expect_err("phone is invalid");

    match error {
        SubmissionError::Invalid(errors) => {
            let phone = errors
                .iter()
                .find(|(key, _)| key.to_string() == "phone")
                .map(|(_, error)| error.code.as_str());
            assert_eq!(phone, Some("INVALID_FORMAT"));
            assert_eq!(errors.len(), 1);
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert!(inbox.lock().expect("inbox mutex poisoned").is_empty());
}

#[tokio::test]
async fn http_submission_reaches_the_relay() {
    let (endpoint, inbox) = relay_stub().await;
    let router = application_router(Arc::new(pipeline(endpoint)));

    let response = router
        .oneshot(
            Request::post("/api/v1/applications")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-form-session", "browser-tab-1")
                .body(Body::from(
                    serde_json::to_vec(&asha_rao()).expect("serializes"),
                ))
                .expect("request builds"),
        )
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(inbox.lock().expect("inbox mutex poisoned").len(), 1);
}
