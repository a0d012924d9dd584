use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::ImageFormat;
use tracing::{debug, warn};

use super::policy::{AllowedType, FileClass, FileConstraintPolicy, FileRejection};
use super::super::domain::{AttachmentSlot, UploadedFile};
use super::super::validation::ErrorCode;

pub const DEFAULT_MAX_DIMENSION: u32 = 800;
pub const DEFAULT_JPEG_QUALITY: u8 = 70;

/// Recompression settings applied to image attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSettings {
    pub max_dimension: u32,
    pub jpeg_quality: u8,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// A file ready for a delivery strategy: metadata plus final bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct TransportableFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl TransportableFile {
    pub fn base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.content_type, self.base64())
    }

    /// Length of the data URI without building it.
    pub fn encoded_len(&self) -> usize {
        let prefix = "data:".len() + self.content_type.len() + ";base64,".len();
        prefix + self.data.len().div_ceil(3) * 4
    }
}

impl std::fmt::Debug for TransportableFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportableFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Rejected(#[from] FileRejection),
    #[error("'{file_name}' could not be read as an image ({detail}); please select the file again")]
    EncodingFailed { file_name: String, detail: String },
}

impl IngestError {
    pub const fn code(&self) -> ErrorCode {
        match self {
            IngestError::Rejected(rejection) => rejection.code(),
            IngestError::EncodingFailed { .. } => ErrorCode::EncodingFailed,
        }
    }
}

/// Validates uploads against the policy and recompresses images.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileIngestor {
    policy: FileConstraintPolicy,
    image: ImageSettings,
}

impl FileIngestor {
    pub fn new(policy: FileConstraintPolicy, image: ImageSettings) -> Self {
        Self { policy, image }
    }

    pub fn policy(&self) -> &FileConstraintPolicy {
        &self.policy
    }

    pub async fn ingest(
        &self,
        file: UploadedFile,
        class: FileClass,
    ) -> Result<TransportableFile, IngestError> {
        let allowed = self
            .policy
            .check(&file.content_type, file.size(), class)
            .inspect_err(|rejection| {
                warn!(file = %file.file_name, code = rejection.code().as_str(), "attachment rejected");
            })?;

        if !allowed.is_image() {
            return Ok(TransportableFile {
                file_name: file.file_name,
                content_type: allowed.mime().to_string(),
                data: file.data,
            });
        }

        let UploadedFile {
            file_name, data, ..
        } = file;
        let settings = self.image;
        let original_size = data.len();
        let outcome =
            tokio::task::spawn_blocking(move || recompress(&data, allowed, settings)).await;

        let detail = match outcome {
            Ok(Ok(bytes)) => {
                debug!(
                    file = %file_name,
                    original_size,
                    recompressed_size = bytes.len(),
                    "image recompressed"
                );
                return Ok(TransportableFile {
                    file_name,
                    content_type: mime::IMAGE_JPEG.to_string(),
                    data: bytes,
                });
            }
            Ok(Err(err)) => err.to_string(),
            Err(join) => join.to_string(),
        };

        warn!(file = %file_name, %detail, "image could not be decoded");
        Err(IngestError::EncodingFailed { file_name, detail })
    }

    /// Converts several attachments concurrently; results keep input order.
    pub async fn ingest_all(
        &self,
        files: Vec<(AttachmentSlot, UploadedFile)>,
    ) -> Vec<(AttachmentSlot, Result<TransportableFile, IngestError>)> {
        let handles: Vec<_> = files
            .into_iter()
            .map(|(slot, file)| {
                let ingestor = *self;
                let file_name = file.file_name.clone();
                let handle =
                    tokio::spawn(async move { ingestor.ingest(file, slot.class()).await });
                (slot, file_name, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (slot, file_name, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(join) => Err(IngestError::EncodingFailed {
                    file_name,
                    detail: join.to_string(),
                }),
            };
            results.push((slot, result));
        }
        results
    }
}

/// Scales `(width, height)` so the long edge is at most `max_dimension`,
/// preserving aspect ratio. Smaller images are returned unchanged.
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if max_dimension == 0 || (width <= max_dimension && height <= max_dimension) {
        return (width, height);
    }

    let scale = |edge: u32, long_edge: u32| -> u32 {
        let scaled = (u64::from(edge) * u64::from(max_dimension) + u64::from(long_edge) / 2)
            / u64::from(long_edge);
        scaled.clamp(1, u64::from(max_dimension)) as u32
    };

    if width > height {
        (max_dimension, scale(height, width))
    } else {
        (scale(width, height), max_dimension)
    }
}

fn recompress(
    bytes: &[u8],
    allowed: AllowedType,
    settings: ImageSettings,
) -> Result<Vec<u8>, image::ImageError> {
    let format = match allowed {
        AllowedType::Png => ImageFormat::Png,
        _ => ImageFormat::Jpeg,
    };
    let decoded = image::load_from_memory_with_format(bytes, format)?;

    let (width, height) = fit_within(decoded.width(), decoded.height(), settings.max_dimension);
    let resized = if (width, height) == (decoded.width(), decoded.height()) {
        decoded
    } else {
        decoded.resize_exact(width, height, FilterType::Triangle)
    };

    let rgb = resized.to_rgb8();
    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, settings.jpeg_quality).encode_image(&rgb)?;
    Ok(encoded)
}
