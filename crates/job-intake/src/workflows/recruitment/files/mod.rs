//! Attachment handling: type/size policy and conversion into transport payloads.

mod ingest;
mod policy;

pub use ingest::{
    fit_within, FileIngestor, ImageSettings, IngestError, TransportableFile,
    DEFAULT_JPEG_QUALITY, DEFAULT_MAX_DIMENSION,
};
pub use policy::{
    AllowedType, FileClass, FileConstraintPolicy, FileLimits, FileRejection,
    DEFAULT_DOCUMENT_MAX_BYTES, DEFAULT_PHOTO_MAX_BYTES,
};
