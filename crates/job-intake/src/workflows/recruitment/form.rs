use serde::Serialize;

use super::domain::{
    Applicability, Applicant, AttachmentSlot, Category, EducationTier, Gender, TierKind,
    UploadedFile, NOT_APPLICABLE,
};
use super::files::{FileConstraintPolicy, FileRejection};
use super::validation::{ApplicationValidator, FieldError, FieldKey, TierField, ValidationErrors};

/// Where a form is in its edit/submit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormState {
    Editing,
    Validated,
    Submitting,
    Submitted,
    Failed,
}

/// Free-text applicant fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    FirstName,
    LastName,
    FatherName,
    DateOfBirth,
    NationalId,
    Email,
    Phone,
    Address,
    City,
    PostalCode,
    Position,
    Experience,
}

impl TextField {
    pub const fn key(self) -> FieldKey {
        match self {
            TextField::FirstName => FieldKey::FirstName,
            TextField::LastName => FieldKey::LastName,
            TextField::FatherName => FieldKey::FatherName,
            TextField::DateOfBirth => FieldKey::DateOfBirth,
            TextField::NationalId => FieldKey::NationalId,
            TextField::Email => FieldKey::Email,
            TextField::Phone => FieldKey::Phone,
            TextField::Address => FieldKey::Address,
            TextField::City => FieldKey::City,
            TextField::PostalCode => FieldKey::PostalCode,
            TextField::Position => FieldKey::Position,
            TextField::Experience => FieldKey::Experience,
        }
    }

    fn slot(self, applicant: &mut Applicant) -> &mut String {
        match self {
            TextField::FirstName => &mut applicant.first_name,
            TextField::LastName => &mut applicant.last_name,
            TextField::FatherName => &mut applicant.father_name,
            TextField::DateOfBirth => &mut applicant.date_of_birth,
            TextField::NationalId => &mut applicant.national_id,
            TextField::Email => &mut applicant.email,
            TextField::Phone => &mut applicant.phone,
            TextField::Address => &mut applicant.address,
            TextField::City => &mut applicant.city,
            TextField::PostalCode => &mut applicant.postal_code,
            TextField::Position => &mut applicant.position,
            TextField::Experience => &mut applicant.experience,
        }
    }
}

/// Free-text sub-fields of an education tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierText {
    Institution,
    Year,
    Percentage,
}

impl TierText {
    pub const fn field(self) -> TierField {
        match self {
            TierText::Institution => TierField::Institution,
            TierText::Year => TierField::Year,
            TierText::Percentage => TierField::Percentage,
        }
    }

    fn slot(self, tier: &mut EducationTier) -> &mut String {
        match self {
            TierText::Institution => &mut tier.institution,
            TierText::Year => &mut tier.year,
            TierText::Percentage => &mut tier.percentage,
        }
    }
}

/// A single edit made by the applicant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Text(TextField, String),
    Gender(Option<Gender>),
    Category(Option<Category>),
    Disability(bool),
    TierApplicability(TierKind, Applicability),
    TierText(TierKind, TierText, String),
}

/// The applicant model together with its per-field errors and lifecycle
/// state. Each edit clears the error previously reported for that field.
#[derive(Debug, Clone)]
pub struct ApplicationForm {
    applicant: Applicant,
    errors: ValidationErrors,
    state: FormState,
}

impl Default for ApplicationForm {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationForm {
    pub fn new() -> Self {
        Self::from_applicant(Applicant::default())
    }

    pub fn from_applicant(applicant: Applicant) -> Self {
        Self {
            applicant,
            errors: ValidationErrors::default(),
            state: FormState::Editing,
        }
    }

    pub fn applicant(&self) -> &Applicant {
        &self.applicant
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn apply(&mut self, update: FieldUpdate) {
        match update {
            FieldUpdate::Text(field, value) => {
                *field.slot(&mut self.applicant) = value;
                self.errors.remove(field.key());
            }
            FieldUpdate::Gender(gender) => {
                self.applicant.gender = gender;
                self.errors.remove(FieldKey::Gender);
            }
            FieldUpdate::Category(category) => {
                self.applicant.category = category;
                self.errors.remove(FieldKey::Category);
            }
            FieldUpdate::Disability(disability) => {
                self.applicant.disability = disability;
            }
            FieldUpdate::TierApplicability(kind, applicability) => {
                set_applicability(self.applicant.education.get_mut(kind), applicability);
                self.errors
                    .retain(|key| !matches!(key, FieldKey::Tier(tier, _) if tier == kind));
            }
            FieldUpdate::TierText(kind, field, value) => {
                *field.slot(self.applicant.education.get_mut(kind)) = value;
                self.errors.remove(FieldKey::Tier(kind, field.field()));
            }
        }
        self.touch();
    }

    /// Checks the photo at selection time; a rejected file is not stored and
    /// its rejection becomes the photo field's error.
    pub fn attach_photo(
        &mut self,
        policy: &FileConstraintPolicy,
        file: UploadedFile,
    ) -> Result<(), FileRejection> {
        self.attach(policy, AttachmentSlot::Photo, file)
    }

    pub fn attach_certificate(
        &mut self,
        policy: &FileConstraintPolicy,
        kind: TierKind,
        file: UploadedFile,
    ) -> Result<(), FileRejection> {
        self.attach(policy, AttachmentSlot::Certificate(kind), file)
    }

    fn attach(
        &mut self,
        policy: &FileConstraintPolicy,
        slot: AttachmentSlot,
        file: UploadedFile,
    ) -> Result<(), FileRejection> {
        let key = slot.field_key();
        if let Err(rejection) = policy.check(&file.content_type, file.size(), slot.class()) {
            self.errors.remove(key);
            self.errors.insert(key, rejection_error(&rejection));
            return Err(rejection);
        }

        *self.file_slot(slot) = Some(file);
        self.errors.remove(key);
        self.touch();
        Ok(())
    }

    pub fn detach(&mut self, slot: AttachmentSlot) -> Option<UploadedFile> {
        let removed = self.file_slot(slot).take();
        self.touch();
        removed
    }

    fn file_slot(&mut self, slot: AttachmentSlot) -> &mut Option<UploadedFile> {
        match slot {
            AttachmentSlot::Photo => &mut self.applicant.photo,
            AttachmentSlot::Certificate(kind) => {
                &mut self.applicant.education.get_mut(kind).certificate
            }
        }
    }

    /// Normalises non-applicable tiers, then replaces the error map with a
    /// fresh validation pass. Returns whether the form is clean.
    pub fn validate(&mut self, validator: &ApplicationValidator) -> bool {
        self.applicant.education.normalize();
        self.errors = validator.validate(&self.applicant);
        self.state = if self.errors.is_empty() {
            FormState::Validated
        } else {
            FormState::Editing
        };
        self.errors.is_empty()
    }

    pub(crate) fn begin_submission(&mut self) {
        self.state = FormState::Submitting;
    }

    /// Records a failure found while preparing attachments and returns the
    /// form to editing.
    pub(crate) fn record_file_error(&mut self, slot: AttachmentSlot, error: FieldError) {
        let key = slot.field_key();
        self.errors.remove(key);
        self.errors.insert(key, error);
        self.state = FormState::Editing;
    }

    pub(crate) fn mark_submitted(&mut self) {
        self.reset();
        self.state = FormState::Submitted;
    }

    pub(crate) fn mark_failed(&mut self) {
        self.state = FormState::Failed;
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn touch(&mut self) {
        if matches!(
            self.state,
            FormState::Validated | FormState::Submitted | FormState::Failed
        ) {
            self.state = FormState::Editing;
        }
    }
}

pub(crate) fn rejection_error(rejection: &FileRejection) -> FieldError {
    FieldError::new(rejection.code(), rejection.to_string())
}

fn set_applicability(tier: &mut EducationTier, applicability: Applicability) {
    let was_applicable = tier.applicability.is_applicable();
    tier.applicability = applicability;
    if !applicability.is_applicable() {
        tier.normalize();
        return;
    }
    if !was_applicable {
        for value in [&mut tier.institution, &mut tier.year, &mut tier.percentage] {
            if *value == NOT_APPLICABLE {
                value.clear();
            }
        }
    }
}
