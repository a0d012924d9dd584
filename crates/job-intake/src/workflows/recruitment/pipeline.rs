use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::AppConfig;

use super::compose::SubmissionComposer;
use super::delivery::{build_gateway, DeliveryAck, DeliveryError, DeliveryGateway};
use super::domain::AttachmentSlot;
use super::files::{FileConstraintPolicy, FileIngestor, IngestError};
use super::form::ApplicationForm;
use super::validation::{ApplicationValidator, FieldError, ValidationErrors};

/// One in-flight submission at a time per form.
#[derive(Debug, Default)]
pub struct SubmissionSession {
    in_flight: AtomicBool,
}

impl SubmissionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Claims the session, or `None` while another submission holds it.
    pub fn try_begin(&self) -> Option<InFlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard { session: self })
    }
}

/// Releases the session when dropped.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    session: &'a SubmissionSession,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.session.in_flight.store(false, Ordering::Release);
    }
}

/// An attachment that could not be prepared for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub field: String,
    pub label: &'static str,
    pub error: FieldError,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("a submission is already in progress for this form")]
    AlreadyInFlight,
    #[error("application has {} invalid field(s)", .0.len())]
    Invalid(ValidationErrors),
    #[error("{} attachment(s) could not be prepared", .0.len())]
    Files(Vec<FileFailure>),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl SubmissionError {
    pub fn code(&self) -> &'static str {
        match self {
            SubmissionError::AlreadyInFlight => "ALREADY_IN_FLIGHT",
            SubmissionError::Invalid(_) => "VALIDATION_FAILED",
            SubmissionError::Files(failures) => failures
                .first()
                .map(|failure| failure.error.code.as_str())
                .unwrap_or("VALIDATION_FAILED"),
            SubmissionError::Delivery(error) => error.code(),
        }
    }
}

/// What the caller learns about a delivered application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub subject: String,
    pub recipient: String,
    pub attachments: Vec<String>,
    pub delivery: DeliveryAck,
}

/// validate, ingest, compose, send.
pub struct ApplicationPipeline {
    validator: ApplicationValidator,
    ingestor: FileIngestor,
    composer: SubmissionComposer,
    gateway: Arc<dyn DeliveryGateway>,
}

impl ApplicationPipeline {
    pub fn new(
        validator: ApplicationValidator,
        ingestor: FileIngestor,
        composer: SubmissionComposer,
        gateway: Arc<dyn DeliveryGateway>,
    ) -> Self {
        Self {
            validator,
            ingestor,
            composer,
            gateway,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, DeliveryError> {
        let recipient = config
            .mail
            .recipient
            .clone()
            .ok_or_else(|| DeliveryError::config_missing("MAIL_RECIPIENT"))?;
        let gateway = build_gateway(&config.mail)?;
        let intake = &config.intake;
        Ok(Self::new(
            ApplicationValidator::new(intake.rules, intake.positions.clone()),
            FileIngestor::new(FileConstraintPolicy::new(intake.file_limits), intake.image),
            SubmissionComposer::new(recipient),
            gateway,
        ))
    }

    pub fn validator(&self) -> &ApplicationValidator {
        &self.validator
    }

    pub fn policy(&self) -> &FileConstraintPolicy {
        self.ingestor.policy()
    }

    pub fn composer(&self) -> &SubmissionComposer {
        &self.composer
    }

    pub async fn submit(
        &self,
        session: &SubmissionSession,
        form: &mut ApplicationForm,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let Some(_guard) = session.try_begin() else {
            return Err(SubmissionError::AlreadyInFlight);
        };

        if !form.validate(&self.validator) {
            info!(
                applicant = %form.applicant().display_name(),
                invalid_fields = form.errors().len(),
                "application failed validation"
            );
            return Err(SubmissionError::Invalid(form.errors().clone()));
        }
        form.begin_submission();

        let mut files = Vec::new();
        let mut failures = Vec::new();
        for (slot, result) in self.ingestor.ingest_all(form.applicant().attachments()).await {
            match result {
                Ok(file) => files.push((slot, file)),
                Err(error) => failures.push((slot, error)),
            }
        }
        if !failures.is_empty() {
            let failures: Vec<FileFailure> = failures
                .into_iter()
                .map(|(slot, error)| {
                    let failure = file_failure(slot, &error);
                    form.record_file_error(slot, failure.error.clone());
                    failure
                })
                .collect();
            return Err(SubmissionError::Files(failures));
        }

        let message = self.composer.compose(form.applicant(), files);
        let attachments = message.attachment_labels();
        match self.gateway.send(&message).await {
            Ok(delivery) => {
                info!(
                    applicant = %message.sender_name,
                    strategy = %delivery.strategy,
                    chunks = delivery.chunks,
                    "application submitted"
                );
                form.mark_submitted();
                Ok(SubmissionReceipt {
                    subject: message.subject,
                    recipient: message.to,
                    attachments,
                    delivery,
                })
            }
            Err(error) => {
                warn!(
                    applicant = %message.sender_name,
                    code = error.code(),
                    "application delivery failed"
                );
                form.mark_failed();
                Err(error.into())
            }
        }
    }
}

fn file_failure(slot: AttachmentSlot, error: &IngestError) -> FileFailure {
    FileFailure {
        field: slot.field_key().to_string(),
        label: slot.label(),
        error: FieldError::new(error.code(), error.to_string()),
    }
}
