use std::fmt;

use super::super::validation::ErrorCode;

pub const DEFAULT_PHOTO_MAX_BYTES: u64 = 171_000;
pub const DEFAULT_DOCUMENT_MAX_BYTES: u64 = 500_000;

/// Room for the text fields and JSON framing around the encoded files.
const REQUEST_TEXT_ALLOWANCE: u64 = 256 * 1024;

/// Size class an attachment is judged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileClass {
    Photo,
    Document,
}

impl fmt::Display for FileClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileClass::Photo => f.write_str("photo"),
            FileClass::Document => f.write_str("document"),
        }
    }
}

/// Byte ceilings per size class, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileLimits {
    pub photo_max_bytes: u64,
    pub document_max_bytes: u64,
}

impl FileLimits {
    pub fn ceiling(&self, class: FileClass) -> u64 {
        match class {
            FileClass::Photo => self.photo_max_bytes,
            FileClass::Document => self.document_max_bytes,
        }
    }

    /// Largest JSON request that can carry a valid application: one photo and
    /// a memo for each of the four tiers, base64 encoded.
    pub fn request_body_limit(&self) -> usize {
        let raw = self.photo_max_bytes + 4 * self.document_max_bytes;
        let encoded = raw.div_ceil(3) * 4;
        usize::try_from(encoded + REQUEST_TEXT_ALLOWANCE).unwrap_or(usize::MAX)
    }
}

impl Default for FileLimits {
    fn default() -> Self {
        Self {
            photo_max_bytes: DEFAULT_PHOTO_MAX_BYTES,
            document_max_bytes: DEFAULT_DOCUMENT_MAX_BYTES,
        }
    }
}

/// The accepted upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowedType {
    Jpeg,
    Png,
    Pdf,
}

impl AllowedType {
    pub fn from_declared(declared: &str) -> Option<Self> {
        let parsed: mime::Mime = declared.trim().parse().ok()?;
        let essence = parsed.essence_str();
        if essence.eq_ignore_ascii_case(mime::IMAGE_JPEG.essence_str()) {
            Some(AllowedType::Jpeg)
        } else if essence.eq_ignore_ascii_case(mime::IMAGE_PNG.essence_str()) {
            Some(AllowedType::Png)
        } else if essence.eq_ignore_ascii_case(mime::APPLICATION_PDF.essence_str()) {
            Some(AllowedType::Pdf)
        } else {
            None
        }
    }

    pub const fn is_image(self) -> bool {
        matches!(self, AllowedType::Jpeg | AllowedType::Png)
    }

    pub fn mime(self) -> mime::Mime {
        match self {
            AllowedType::Jpeg => mime::IMAGE_JPEG,
            AllowedType::Png => mime::IMAGE_PNG,
            AllowedType::Pdf => mime::APPLICATION_PDF,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileRejection {
    #[error("unsupported file type '{declared}': only JPG, PNG and PDF files are allowed")]
    UnsupportedType { declared: String },
    #[error("{class} is {actual} bytes; it must be at most {limit} bytes")]
    TooLarge {
        class: FileClass,
        limit: u64,
        actual: u64,
    },
}

impl FileRejection {
    pub const fn code(&self) -> ErrorCode {
        match self {
            FileRejection::UnsupportedType { .. } => ErrorCode::UnsupportedType,
            FileRejection::TooLarge { .. } => ErrorCode::TooLarge,
        }
    }
}

/// Pure accept/reject rules over (declared type, size, class).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileConstraintPolicy {
    limits: FileLimits,
}

impl FileConstraintPolicy {
    pub fn new(limits: FileLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> FileLimits {
        self.limits
    }

    /// Type is checked before size, so an oversized unsupported file reports
    /// `UNSUPPORTED_TYPE`.
    pub fn check(
        &self,
        declared_type: &str,
        size: u64,
        class: FileClass,
    ) -> Result<AllowedType, FileRejection> {
        let allowed =
            AllowedType::from_declared(declared_type).ok_or_else(|| {
                FileRejection::UnsupportedType {
                    declared: declared_type.to_string(),
                }
            })?;

        let limit = self.limits.ceiling(class);
        if size > limit {
            return Err(FileRejection::TooLarge {
                class,
                limit,
                actual: size,
            });
        }

        Ok(allowed)
    }
}
