//! Job application intake: the applicant form, attachment handling,
//! validation, message composition, and delivery over pluggable transports.

pub mod compose;
pub mod delivery;
pub mod domain;
pub mod files;
pub mod form;
pub mod pipeline;
pub mod router;
pub mod validation;

#[cfg(test)]
mod tests;

pub use compose::{
    read_tier_blocks, LabeledAttachment, OutboundMessage, SubmissionComposer, TierSummary,
};
pub use delivery::{
    build_gateway, DeliveryAck, DeliveryError, DeliveryGateway, DeliveryStrategy,
    FallbackGateway, MailApiGateway, MailClientKind, MailtoGateway, RelayGateway, Verification,
};
pub use domain::{
    Applicability, Applicant, AttachmentSlot, Category, EducationHistory, EducationTier, Gender,
    TierKind, UploadedFile, NOT_APPLICABLE,
};
pub use files::{
    FileClass, FileConstraintPolicy, FileIngestor, FileLimits, FileRejection, ImageSettings,
    IngestError, TransportableFile,
};
pub use form::{ApplicationForm, FieldUpdate, FormState, TextField, TierText};
pub use pipeline::{
    ApplicationPipeline, FileFailure, SubmissionError, SubmissionReceipt, SubmissionSession,
};
pub use router::application_router;
pub use validation::{
    ApplicationValidator, ErrorCode, FieldError, FieldKey, TierField, ValidationErrors,
    ValidationRules,
};
