use super::common::*;

use crate::workflows::recruitment::domain::{AttachmentSlot, TierKind, UploadedFile};
use crate::workflows::recruitment::files::{
    FileClass, FileConstraintPolicy, FileIngestor, FileLimits, FileRejection, ImageSettings,
    IngestError,
};
use crate::workflows::recruitment::validation::ErrorCode;

#[test]
fn ceiling_is_inclusive() {
    let policy = FileConstraintPolicy::default();
    assert!(policy.check("image/jpeg", 171_000, FileClass::Photo).is_ok());
    assert_eq!(
        policy
            .check("image/jpeg", 171_001, FileClass::Photo)
            .map_err(|rejection| rejection.code()),
        Err(ErrorCode::TooLarge)
    );
    assert!(policy
        .check("application/pdf", 500_000, FileClass::Document)
        .is_ok());
}

#[test]
fn configured_limits_replace_defaults() {
    let policy = FileConstraintPolicy::new(FileLimits {
        photo_max_bytes: 1_000,
        document_max_bytes: 2_000,
    });
    assert!(matches!(
        policy.check("image/png", 1_001, FileClass::Photo),
        Err(FileRejection::TooLarge { limit: 1_000, .. })
    ));
    assert!(policy.check("application/pdf", 2_000, FileClass::Document).is_ok());
}

#[tokio::test]
async fn pdf_passes_through_unchanged() {
    let ingestor = FileIngestor::default();
    let bytes = pdf_bytes(20_000);
    let file = ingestor
        .ingest(
            UploadedFile::new("memo.pdf", "application/pdf", bytes.clone()),
            FileClass::Document,
        )
        .await
        .expect("pdf accepted");

    assert_eq!(file.content_type, "application/pdf");
    assert_eq!(file.data, bytes);
    assert!(file.data_uri().starts_with("data:application/pdf;base64,"));
}

#[tokio::test]
async fn large_image_is_downscaled_to_jpeg() {
    let ingestor = FileIngestor::new(FileConstraintPolicy::default(), ImageSettings::default());
    let file = ingestor
        .ingest(
            UploadedFile::new("scan.png", "image/png", png_bytes(1000, 250)),
            FileClass::Document,
        )
        .await
        .expect("png accepted");

    assert_eq!(file.content_type, "image/jpeg");
    let decoded = image::load_from_memory(&file.data).expect("output decodes");
    assert_eq!((decoded.width(), decoded.height()), (800, 200));
}

#[tokio::test]
async fn small_image_keeps_its_dimensions() {
    let ingestor = FileIngestor::default();
    let file = ingestor
        .ingest(
            UploadedFile::new("face.jpg", "image/jpeg", jpeg_bytes(300, 400)),
            FileClass::Photo,
        )
        .await
        .expect("jpeg accepted");

    let decoded = image::load_from_memory(&file.data).expect("output decodes");
    assert_eq!((decoded.width(), decoded.height()), (300, 400));
}

#[tokio::test]
async fn undecodable_image_reports_encoding_failure() {
    let ingestor = FileIngestor::default();
    let error = ingestor
        .ingest(
            UploadedFile::new("broken.jpg", "image/jpeg", b"not really a jpeg".to_vec()),
            FileClass::Photo,
        )
        .await
        .expect_err("cannot decode");

    assert_eq!(error.code(), ErrorCode::EncodingFailed);
    assert!(matches!(error, IngestError::EncodingFailed { ref file_name, .. } if file_name == "broken.jpg"));
}

#[tokio::test]
async fn ingest_all_keeps_input_order() {
    let ingestor = FileIngestor::default();
    let results = ingestor
        .ingest_all(vec![
            (AttachmentSlot::Photo, photo()),
            (
                AttachmentSlot::Certificate(TierKind::Tenth),
                UploadedFile::new("memo.txt", "text/plain", vec![1; 8]),
            ),
            (
                AttachmentSlot::Certificate(TierKind::Graduation),
                memo("degree.pdf", 1_000),
            ),
        ])
        .await;

    let slots: Vec<_> = results.iter().map(|(slot, _)| *slot).collect();
    assert_eq!(
        slots,
        vec![
            AttachmentSlot::Photo,
            AttachmentSlot::Certificate(TierKind::Tenth),
            AttachmentSlot::Certificate(TierKind::Graduation),
        ]
    );
    assert!(results[0].1.is_ok());
    assert_eq!(
        results[1].1.as_ref().map_err(IngestError::code).err(),
        Some(ErrorCode::UnsupportedType)
    );
    assert!(results[2].1.is_ok());
}
