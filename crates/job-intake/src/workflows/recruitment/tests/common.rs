use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Router;
use chrono::NaiveDate;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, Rgb, RgbImage};
use serde_json::Value;

use crate::workflows::recruitment::compose::{OutboundMessage, SubmissionComposer};
use crate::workflows::recruitment::delivery::{
    DeliveryAck, DeliveryError, DeliveryGateway, DeliveryStrategy,
};
use crate::workflows::recruitment::domain::{
    Applicability, Applicant, Category, EducationTier, Gender, UploadedFile,
};
use crate::workflows::recruitment::files::{FileConstraintPolicy, FileIngestor, ImageSettings};
use crate::workflows::recruitment::pipeline::ApplicationPipeline;
use crate::workflows::recruitment::validation::{ApplicationValidator, ValidationRules};

pub(super) const RECIPIENT: &str = "careers@example.org";

pub(super) fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
}

pub(super) fn validator() -> ApplicationValidator {
    ApplicationValidator::new(
        ValidationRules::default(),
        vec!["Lascar".to_string(), "Helper".to_string()],
    )
    .with_reference_date(reference_date())
}

pub(super) fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            96,
        ])
    });
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, 85)
        .encode_image(&image)
        .expect("jpeg encodes");
    bytes
}

pub(super) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let pixels: Vec<u8> = (0..width * height)
        .flat_map(|index| [(index % 256) as u8, 40, 200, 128])
        .collect();
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(&pixels, width, height, ColorType::Rgba8)
        .expect("png encodes");
    bytes
}

pub(super) fn pdf_bytes(size: usize) -> Vec<u8> {
    let mut bytes = b"%PDF-1.4\n".to_vec();
    bytes.resize(size, b' ');
    bytes
}

pub(super) fn photo() -> UploadedFile {
    UploadedFile::new("asha.jpg", "image/jpeg", jpeg_bytes(1200, 900))
}

pub(super) fn memo(name: &str, size: usize) -> UploadedFile {
    UploadedFile::new(name, "application/pdf", pdf_bytes(size))
}

pub(super) fn populated(institution: &str, year: &str, percentage: &str, memo: UploadedFile) -> EducationTier {
    EducationTier {
        applicability: Applicability::Yes,
        institution: institution.to_string(),
        year: year.to_string(),
        percentage: percentage.to_string(),
        certificate: Some(memo),
    }
}

/// Only the 10th tier applies.
pub(super) fn asha_rao() -> Applicant {
    let mut applicant = Applicant {
        first_name: "Asha".to_string(),
        last_name: "Rao".to_string(),
        father_name: "Venkat Rao".to_string(),
        date_of_birth: "1994-08-17".to_string(),
        gender: Some(Gender::Female),
        category: Some(Category::General),
        disability: false,
        national_id: "123456789012".to_string(),
        email: "asha.rao@example.com".to_string(),
        phone: "9876543210".to_string(),
        address: "4-12 Station Road".to_string(),
        city: "Visakhapatnam".to_string(),
        postal_code: "530001".to_string(),
        position: "Lascar".to_string(),
        experience: "3".to_string(),
        photo: Some(photo()),
        ..Applicant::default()
    };
    applicant.education.tenth =
        populated("ZP High School", "2010", "78.50", memo("tenth.pdf", 200_000));
    applicant.education.intermediate = EducationTier::with_applicability(Applicability::No);
    applicant.education.diploma = EducationTier::with_applicability(Applicability::No);
    applicant.education.graduation = EducationTier::with_applicability(Applicability::No);
    applicant
}

/// 10th, intermediate and graduation apply; diploma does not.
pub(super) fn graduate() -> Applicant {
    let mut applicant = asha_rao();
    applicant.education.intermediate =
        populated("Govt Junior College", "2012", "81", memo("inter.pdf", 40_000));
    applicant.education.graduation =
        populated("Andhra University", "2015", "69.25", memo("degree.pdf", 60_000));
    applicant
}

pub(super) fn pipeline_with(gateway: Arc<dyn DeliveryGateway>) -> ApplicationPipeline {
    ApplicationPipeline::new(
        validator(),
        FileIngestor::new(FileConstraintPolicy::default(), ImageSettings::default()),
        SubmissionComposer::new(RECIPIENT),
        gateway,
    )
}

#[derive(Default, Clone)]
pub(super) struct RecordingGateway {
    messages: Arc<Mutex<Vec<OutboundMessage>>>,
}

impl RecordingGateway {
    pub(super) fn messages(&self) -> Vec<OutboundMessage> {
        self.messages.lock().expect("gateway mutex poisoned").clone()
    }
}

#[async_trait]
impl DeliveryGateway for RecordingGateway {
    fn strategy(&self) -> DeliveryStrategy {
        DeliveryStrategy::Relay
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryAck, DeliveryError> {
        self.messages
            .lock()
            .expect("gateway mutex poisoned")
            .push(message.clone());
        Ok(DeliveryAck::confirmed(DeliveryStrategy::Relay, 1))
    }
}

pub(super) struct FailingGateway {
    pub(super) error: DeliveryError,
    pub(super) calls: Mutex<usize>,
}

impl FailingGateway {
    pub(super) fn new(error: DeliveryError) -> Self {
        Self {
            error,
            calls: Mutex::new(0),
        }
    }

    pub(super) fn calls(&self) -> usize {
        *self.calls.lock().expect("gateway mutex poisoned")
    }
}

#[async_trait]
impl DeliveryGateway for FailingGateway {
    fn strategy(&self) -> DeliveryStrategy {
        DeliveryStrategy::Relay
    }

    async fn send(&self, _message: &OutboundMessage) -> Result<DeliveryAck, DeliveryError> {
        *self.calls.lock().expect("gateway mutex poisoned") += 1;
        Err(self.error.clone())
    }
}

pub(super) fn transport_failure() -> DeliveryError {
    DeliveryError::TransportFailed {
        strategy: DeliveryStrategy::Relay,
        detail: "connection refused".to_string(),
    }
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub(super) async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let address = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub server");
    });
    format!("http://{address}")
}

pub(super) async fn json_body(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    let value = serde_json::from_slice(&bytes).expect("json body");
    (status, value)
}
