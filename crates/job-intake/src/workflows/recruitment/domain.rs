use serde::{Deserialize, Serialize};

use super::files::FileClass;
use super::validation::{FieldKey, TierField};

/// Sentinel written into a non-applicable tier's text fields.
pub const NOT_APPLICABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    #[serde(alias = "Male")]
    Male,
    #[serde(alias = "Female")]
    Female,
    #[serde(alias = "Other")]
    Other,
}

impl Gender {
    pub const fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

/// Reservation category collected on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[serde(alias = "General")]
    General,
    #[serde(alias = "OBC")]
    Obc,
    #[serde(alias = "SC")]
    Sc,
    #[serde(alias = "ST")]
    St,
}

impl Category {
    pub const fn label(self) -> &'static str {
        match self {
            Category::General => "General",
            Category::Obc => "OBC",
            Category::Sc => "SC",
            Category::St => "ST",
        }
    }
}

/// Whether an education tier applies to the applicant. `No` and
/// `NotApplicable` are treated identically downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Applicability {
    #[serde(alias = "Yes")]
    Yes,
    #[serde(alias = "No")]
    No,
    #[serde(alias = "na", alias = "NA", alias = "N/A")]
    NotApplicable,
}

impl Applicability {
    pub const fn is_applicable(self) -> bool {
        matches!(self, Applicability::Yes)
    }
}

/// Stages of education history, in the order they are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    Tenth,
    Intermediate,
    Diploma,
    Graduation,
}

impl TierKind {
    pub const ALL: [TierKind; 4] = [
        TierKind::Tenth,
        TierKind::Intermediate,
        TierKind::Diploma,
        TierKind::Graduation,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            TierKind::Tenth => "tenth",
            TierKind::Intermediate => "intermediate",
            TierKind::Diploma => "diploma",
            TierKind::Graduation => "graduation",
        }
    }

    pub const fn heading(self) -> &'static str {
        match self {
            TierKind::Tenth => "10th",
            TierKind::Intermediate => "Intermediate",
            TierKind::Diploma => "Diploma",
            TierKind::Graduation => "Graduation",
        }
    }

    pub const fn memo_label(self) -> &'static str {
        match self {
            TierKind::Tenth => "10th Memo",
            TierKind::Intermediate => "Intermediate Memo",
            TierKind::Diploma => "Diploma Memo",
            TierKind::Graduation => "Graduation Memo",
        }
    }

    pub const fn default_applicability(self) -> Applicability {
        match self {
            TierKind::Diploma => Applicability::No,
            _ => Applicability::Yes,
        }
    }

    pub fn from_key(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        TierKind::ALL.into_iter().find(|kind| {
            kind.key() == normalized || kind.heading().eq_ignore_ascii_case(&normalized)
        })
    }
}

/// A file exactly as the applicant selected it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

impl std::fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// One stage of education history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationTier {
    pub applicability: Applicability,
    pub institution: String,
    pub year: String,
    pub percentage: String,
    pub certificate: Option<UploadedFile>,
}

impl EducationTier {
    pub fn with_applicability(applicability: Applicability) -> Self {
        let mut tier = Self {
            applicability,
            institution: String::new(),
            year: String::new(),
            percentage: String::new(),
            certificate: None,
        };
        tier.normalize();
        tier
    }

    /// Replaces the sub-fields of a non-applicable tier with the sentinel.
    pub fn normalize(&mut self) {
        if self.applicability.is_applicable() {
            return;
        }
        self.institution = NOT_APPLICABLE.to_string();
        self.year = NOT_APPLICABLE.to_string();
        self.percentage = NOT_APPLICABLE.to_string();
        self.certificate = None;
    }
}

impl Default for EducationTier {
    fn default() -> Self {
        Self::with_applicability(Applicability::Yes)
    }
}

/// Fixed per-tier record so every tier is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationHistory {
    pub tenth: EducationTier,
    pub intermediate: EducationTier,
    pub diploma: EducationTier,
    pub graduation: EducationTier,
}

impl EducationHistory {
    pub fn get(&self, kind: TierKind) -> &EducationTier {
        match kind {
            TierKind::Tenth => &self.tenth,
            TierKind::Intermediate => &self.intermediate,
            TierKind::Diploma => &self.diploma,
            TierKind::Graduation => &self.graduation,
        }
    }

    pub fn get_mut(&mut self, kind: TierKind) -> &mut EducationTier {
        match kind {
            TierKind::Tenth => &mut self.tenth,
            TierKind::Intermediate => &mut self.intermediate,
            TierKind::Diploma => &mut self.diploma,
            TierKind::Graduation => &mut self.graduation,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (TierKind, &EducationTier)> {
        TierKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }

    pub fn normalize(&mut self) {
        for kind in TierKind::ALL {
            self.get_mut(kind).normalize();
        }
    }
}

impl Default for EducationHistory {
    fn default() -> Self {
        Self {
            tenth: EducationTier::with_applicability(TierKind::Tenth.default_applicability()),
            intermediate: EducationTier::with_applicability(
                TierKind::Intermediate.default_applicability(),
            ),
            diploma: EducationTier::with_applicability(TierKind::Diploma.default_applicability()),
            graduation: EducationTier::with_applicability(
                TierKind::Graduation.default_applicability(),
            ),
        }
    }
}

/// The aggregate submitted per application. Text fields hold raw input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Applicant {
    pub first_name: String,
    pub last_name: String,
    pub father_name: String,
    pub date_of_birth: String,
    pub gender: Option<Gender>,
    pub category: Option<Category>,
    pub disability: bool,
    pub national_id: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub position: String,
    pub experience: String,
    pub education: EducationHistory,
    pub photo: Option<UploadedFile>,
}

impl Default for Applicant {
    fn default() -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            father_name: String::new(),
            date_of_birth: String::new(),
            gender: None,
            category: None,
            disability: false,
            national_id: String::new(),
            email: String::new(),
            phone: String::new(),
            address: String::new(),
            city: String::new(),
            postal_code: String::new(),
            position: String::new(),
            experience: String::new(),
            education: EducationHistory::default(),
            photo: None,
        }
    }
}

impl Applicant {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    /// Files that travel with the application: the photo plus the
    /// certificate of every applicable tier.
    pub fn attachments(&self) -> Vec<(AttachmentSlot, UploadedFile)> {
        let mut files = Vec::new();
        if let Some(photo) = &self.photo {
            files.push((AttachmentSlot::Photo, photo.clone()));
        }
        for (kind, tier) in self.education.iter() {
            if !tier.applicability.is_applicable() {
                continue;
            }
            if let Some(certificate) = &tier.certificate {
                files.push((AttachmentSlot::Certificate(kind), certificate.clone()));
            }
        }
        files
    }
}

/// Where an attachment came from on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttachmentSlot {
    Photo,
    Certificate(TierKind),
}

impl AttachmentSlot {
    pub const fn label(self) -> &'static str {
        match self {
            AttachmentSlot::Photo => "Passport Photo",
            AttachmentSlot::Certificate(kind) => kind.memo_label(),
        }
    }

    pub const fn class(self) -> FileClass {
        match self {
            AttachmentSlot::Photo => FileClass::Photo,
            AttachmentSlot::Certificate(_) => FileClass::Document,
        }
    }

    pub const fn field_key(self) -> FieldKey {
        match self {
            AttachmentSlot::Photo => FieldKey::Photo,
            AttachmentSlot::Certificate(kind) => FieldKey::Tier(kind, TierField::Certificate),
        }
    }
}

/// Serde adapter carrying file bytes as base64; a `data:` URI prefix is tolerated.
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let payload = match raw.split_once(";base64,") {
            Some((prefix, payload)) if prefix.starts_with("data:") => payload,
            _ => raw.as_str(),
        };
        STANDARD
            .decode(payload.trim())
            .map_err(serde::de::Error::custom)
    }
}
