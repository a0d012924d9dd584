use std::sync::Arc;

use super::common::*;

use crate::workflows::recruitment::delivery::{DeliveryError, Verification};
use crate::workflows::recruitment::domain::{TierKind, UploadedFile};
use crate::workflows::recruitment::form::{ApplicationForm, FormState};
use crate::workflows::recruitment::pipeline::{SubmissionError, SubmissionSession};
use crate::workflows::recruitment::validation::{ErrorCode, FieldKey, TierField};

#[tokio::test]
async fn successful_submission_resets_the_form() {
    let gateway = RecordingGateway::default();
    let pipeline = pipeline_with(Arc::new(gateway.clone()));
    let session = SubmissionSession::new();
    let mut form = ApplicationForm::from_applicant(graduate());

    let receipt = pipeline
        .submit(&session, &mut form)
        .await
        .expect("submission succeeds");

    assert_eq!(receipt.subject, "Job Application - Asha Rao");
    assert_eq!(receipt.recipient, RECIPIENT);
    assert_eq!(
        receipt.attachments,
        vec!["Passport Photo", "10th Memo", "Intermediate Memo", "Graduation Memo"]
    );
    assert_eq!(receipt.delivery.verification, Verification::Confirmed);
    assert_eq!(form.state(), FormState::Submitted);
    assert_eq!(form.applicant(), ApplicationForm::new().applicant());
    assert!(!session.is_in_flight());

    let messages = gateway.messages();
    assert_eq!(messages.len(), 1);
    let photo = &messages[0].attachments[0].file;
    assert_eq!(photo.content_type, "image/jpeg");
    let decoded = image::load_from_memory(&photo.data).expect("photo decodes");
    assert_eq!((decoded.width(), decoded.height()), (800, 600));
}

#[tokio::test]
async fn invalid_phone_blocks_submission() {
    let gateway = RecordingGateway::default();
    let pipeline = pipeline_with(Arc::new(gateway.clone()));
    let mut applicant = asha_rao();
    applicant.phone = "98765".to_string();
    let mut form = ApplicationForm::from_applicant(applicant);

    let error = pipeline
        .submit(&SubmissionSession::new(), &mut form)
        .await
        .expect_err("invalid");

    match error {
        SubmissionError::Invalid(errors) => {
            assert_eq!(
                errors.get(FieldKey::Phone).map(|error| error.code),
                Some(ErrorCode::InvalidFormat)
            );
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert_eq!(form.state(), FormState::Editing);
    assert_eq!(form.applicant().phone, "98765");
    assert!(gateway.messages().is_empty());
}

#[tokio::test]
async fn second_submit_while_in_flight_is_a_no_op() {
    let gateway = RecordingGateway::default();
    let pipeline = pipeline_with(Arc::new(gateway.clone()));
    let session = SubmissionSession::new();
    let mut form = ApplicationForm::from_applicant(asha_rao());

    let guard = session.try_begin().expect("session is free");
    let error = pipeline
        .submit(&session, &mut form)
        .await
        .expect_err("coalesced");
    assert!(matches!(error, SubmissionError::AlreadyInFlight));
    assert_eq!(form.state(), FormState::Editing);
    assert!(form.errors().is_empty());
    assert!(gateway.messages().is_empty());

    drop(guard);
    assert!(session.try_begin().is_some());
}

#[tokio::test]
async fn undecodable_photo_is_reported_on_its_field() {
    let gateway = RecordingGateway::default();
    let pipeline = pipeline_with(Arc::new(gateway.clone()));
    let mut applicant = asha_rao();
    applicant.photo = Some(UploadedFile::new("asha.jpg", "image/jpeg", vec![0xFF; 64]));
    let mut form = ApplicationForm::from_applicant(applicant);

    let error = pipeline
        .submit(&SubmissionSession::new(), &mut form)
        .await
        .expect_err("photo cannot be decoded");

    match error {
        SubmissionError::Files(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].field, "photo");
            assert_eq!(failures[0].error.code, ErrorCode::EncodingFailed);
        }
        other => panic!("expected file failure, got {other:?}"),
    }
    assert_eq!(form.state(), FormState::Editing);
    assert_eq!(
        form.errors().get(FieldKey::Photo).map(|error| error.code),
        Some(ErrorCode::EncodingFailed)
    );
    assert!(gateway.messages().is_empty());
}

#[tokio::test]
async fn oversized_certificate_is_rejected_before_delivery() {
    let gateway = RecordingGateway::default();
    let pipeline = pipeline_with(Arc::new(gateway.clone()));
    let mut applicant = asha_rao();
    applicant.education.tenth.certificate = Some(memo("tenth.pdf", 500_001));
    let mut form = ApplicationForm::from_applicant(applicant);

    let error = pipeline
        .submit(&SubmissionSession::new(), &mut form)
        .await
        .expect_err("too large");

    assert_eq!(error.code(), "TOO_LARGE");
    assert_eq!(
        form.errors()
            .get(FieldKey::Tier(TierKind::Tenth, TierField::Certificate))
            .map(|error| error.code),
        Some(ErrorCode::TooLarge)
    );
    assert!(gateway.messages().is_empty());
}

#[tokio::test]
async fn delivery_failure_keeps_the_model() {
    let gateway = Arc::new(FailingGateway::new(transport_failure()));
    let pipeline = pipeline_with(gateway.clone());
    let mut form = ApplicationForm::from_applicant(asha_rao());

    let error = pipeline
        .submit(&SubmissionSession::new(), &mut form)
        .await
        .expect_err("transport down");

    assert!(matches!(
        error,
        SubmissionError::Delivery(DeliveryError::TransportFailed { .. })
    ));
    assert_eq!(error.code(), "TRANSPORT_FAILED");
    assert_eq!(form.state(), FormState::Failed);
    assert_eq!(form.applicant().first_name, "Asha");
    assert_eq!(gateway.calls(), 1);
}
