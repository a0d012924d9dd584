use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;
use serde::{Serialize, Serializer};

use super::domain::{Applicant, EducationTier, TierKind};

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const EARLIEST_COMPLETION_YEAR: i32 = 1950;
const PHONE_DIGITS: usize = 10;
const NATIONAL_ID_DIGITS: usize = 12;
const POSTAL_CODE_DIGITS: usize = 6;

pub(crate) fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"))
}

/// Machine-readable error codes shared by field and file failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Required,
    InvalidFormat,
    OutOfRange,
    UnknownOption,
    UnsupportedType,
    TooLarge,
    EncodingFailed,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Required => "REQUIRED",
            ErrorCode::InvalidFormat => "INVALID_FORMAT",
            ErrorCode::OutOfRange => "OUT_OF_RANGE",
            ErrorCode::UnknownOption => "UNKNOWN_OPTION",
            ErrorCode::UnsupportedType => "UNSUPPORTED_TYPE",
            ErrorCode::TooLarge => "TOO_LARGE",
            ErrorCode::EncodingFailed => "ENCODING_FAILED",
        }
    }
}

/// Sub-fields of an education tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TierField {
    Institution,
    Year,
    Percentage,
    Certificate,
}

impl TierField {
    pub const fn key(self) -> &'static str {
        match self {
            TierField::Institution => "institution",
            TierField::Year => "year",
            TierField::Percentage => "percentage",
            TierField::Certificate => "certificate",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            TierField::Institution => "institution",
            TierField::Year => "year of completion",
            TierField::Percentage => "percentage",
            TierField::Certificate => "memo",
        }
    }
}

/// Addressable form field. Tier sub-fields render as `tier.field`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldKey {
    FirstName,
    LastName,
    FatherName,
    DateOfBirth,
    Gender,
    Category,
    NationalId,
    Email,
    Phone,
    Address,
    City,
    PostalCode,
    Position,
    Experience,
    Photo,
    Tier(TierKind, TierField),
}

impl FieldKey {
    pub fn label(self) -> String {
        let label = match self {
            FieldKey::FirstName => "First name",
            FieldKey::LastName => "Last name",
            FieldKey::FatherName => "Father's name",
            FieldKey::DateOfBirth => "Date of birth",
            FieldKey::Gender => "Gender",
            FieldKey::Category => "Category",
            FieldKey::NationalId => "Aadhar number",
            FieldKey::Email => "Email",
            FieldKey::Phone => "Phone",
            FieldKey::Address => "Address",
            FieldKey::City => "City",
            FieldKey::PostalCode => "Pincode",
            FieldKey::Position => "Position",
            FieldKey::Experience => "Experience",
            FieldKey::Photo => "Passport photo",
            FieldKey::Tier(kind, field) => return format!("{} {}", kind.heading(), field.label()),
        };
        label.to_string()
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            FieldKey::FirstName => "first_name",
            FieldKey::LastName => "last_name",
            FieldKey::FatherName => "father_name",
            FieldKey::DateOfBirth => "date_of_birth",
            FieldKey::Gender => "gender",
            FieldKey::Category => "category",
            FieldKey::NationalId => "national_id",
            FieldKey::Email => "email",
            FieldKey::Phone => "phone",
            FieldKey::Address => "address",
            FieldKey::City => "city",
            FieldKey::PostalCode => "postal_code",
            FieldKey::Position => "position",
            FieldKey::Experience => "experience",
            FieldKey::Photo => "photo",
            FieldKey::Tier(kind, field) => return write!(f, "{}.{}", kind.key(), field.key()),
        };
        f.write_str(key)
    }
}

impl Serialize for FieldKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub code: ErrorCode,
    pub message: String,
}

impl FieldError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn required(key: FieldKey) -> Self {
        Self::new(ErrorCode::Required, format!("{} is required", key.label()))
    }
}

/// Field-to-error map produced by a validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<FieldKey, FieldError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: FieldKey) -> Option<&FieldError> {
        self.0.get(&key)
    }

    pub fn contains(&self, key: FieldKey) -> bool {
        self.0.contains_key(&key)
    }

    /// Records an error; the first error recorded for a field wins.
    pub fn insert(&mut self, key: FieldKey, error: FieldError) {
        self.0.entry(key).or_insert(error);
    }

    pub fn remove(&mut self, key: FieldKey) -> Option<FieldError> {
        self.0.remove(&key)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(FieldKey) -> bool) {
        self.0.retain(|key, _| keep(*key));
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &FieldError)> {
        self.0.iter().map(|(key, error)| (*key, error))
    }
}

/// Deployment switches for fields the form may leave optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
    pub require_national_id: bool,
    pub require_postal_code: bool,
    pub require_city: bool,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            require_national_id: true,
            require_postal_code: true,
            require_city: true,
        }
    }
}

/// Field-level and cross-field checks over an [`Applicant`].
///
/// Every field is inspected exactly once per pass: presence first, then the
/// format check when a value is present. All failures are collected.
#[derive(Debug, Clone)]
pub struct ApplicationValidator {
    rules: ValidationRules,
    positions: Vec<String>,
    reference_date: Option<NaiveDate>,
}

impl ApplicationValidator {
    pub fn new(rules: ValidationRules, positions: Vec<String>) -> Self {
        Self {
            rules,
            positions,
            reference_date: None,
        }
    }

    /// Pins "today" for date-of-birth and completion-year bounds.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn rules(&self) -> ValidationRules {
        self.rules
    }

    pub fn positions(&self) -> &[String] {
        &self.positions
    }

    pub fn validate(&self, applicant: &Applicant) -> ValidationErrors {
        let today = self
            .reference_date
            .unwrap_or_else(|| Local::now().date_naive());
        let mut errors = ValidationErrors::default();

        check(&mut errors, FieldKey::FirstName, &applicant.first_name, true, |_| None);
        check(&mut errors, FieldKey::LastName, &applicant.last_name, true, |_| None);
        check(&mut errors, FieldKey::FatherName, &applicant.father_name, true, |_| None);
        check(&mut errors, FieldKey::DateOfBirth, &applicant.date_of_birth, true, |value| {
            date_of_birth_error(value, today)
        });
        if applicant.gender.is_none() {
            errors.insert(FieldKey::Gender, FieldError::required(FieldKey::Gender));
        }
        if applicant.category.is_none() {
            errors.insert(FieldKey::Category, FieldError::required(FieldKey::Category));
        }
        check(
            &mut errors,
            FieldKey::NationalId,
            &applicant.national_id,
            self.rules.require_national_id,
            |value| digits_error(FieldKey::NationalId, value, NATIONAL_ID_DIGITS),
        );

        check(&mut errors, FieldKey::Email, &applicant.email, true, |value| {
            (!email_pattern().is_match(value)).then(|| {
                FieldError::new(ErrorCode::InvalidFormat, "Enter a valid e-mail address")
            })
        });
        check(&mut errors, FieldKey::Phone, &applicant.phone, true, |value| {
            digits_error(FieldKey::Phone, value, PHONE_DIGITS)
        });
        check(&mut errors, FieldKey::Address, &applicant.address, true, |_| None);
        check(
            &mut errors,
            FieldKey::City,
            &applicant.city,
            self.rules.require_city,
            |_| None,
        );
        check(
            &mut errors,
            FieldKey::PostalCode,
            &applicant.postal_code,
            self.rules.require_postal_code,
            |value| digits_error(FieldKey::PostalCode, value, POSTAL_CODE_DIGITS),
        );

        check(&mut errors, FieldKey::Position, &applicant.position, true, |value| {
            self.position_error(value)
        });
        check(&mut errors, FieldKey::Experience, &applicant.experience, true, experience_error);

        if applicant.photo.is_none() {
            errors.insert(FieldKey::Photo, FieldError::required(FieldKey::Photo));
        }

        for (kind, tier) in applicant.education.iter() {
            check_tier(&mut errors, kind, tier, today.year());
        }

        errors
    }

    /// Resolves free-form input to the configured spelling of a position.
    pub fn canonical_position(&self, value: &str) -> Option<&str> {
        let value = value.trim();
        self.positions
            .iter()
            .find(|position| position.eq_ignore_ascii_case(value))
            .map(String::as_str)
    }

    fn position_error(&self, value: &str) -> Option<FieldError> {
        match self.canonical_position(value) {
            Some(_) => None,
            None => Some(FieldError::new(
                ErrorCode::UnknownOption,
                format!("Position must be one of: {}", self.positions.join(", ")),
            )),
        }
    }
}

fn check(
    errors: &mut ValidationErrors,
    key: FieldKey,
    value: &str,
    required: bool,
    format: impl FnOnce(&str) -> Option<FieldError>,
) {
    let value = value.trim();
    if value.is_empty() {
        if required {
            errors.insert(key, FieldError::required(key));
        }
        return;
    }
    if let Some(error) = format(value) {
        errors.insert(key, error);
    }
}

fn check_tier(errors: &mut ValidationErrors, kind: TierKind, tier: &EducationTier, this_year: i32) {
    if !tier.applicability.is_applicable() {
        return;
    }

    check(
        errors,
        FieldKey::Tier(kind, TierField::Institution),
        &tier.institution,
        true,
        |_| None,
    );
    check(
        errors,
        FieldKey::Tier(kind, TierField::Year),
        &tier.year,
        true,
        |value| completion_year_error(kind, value, this_year),
    );
    check(
        errors,
        FieldKey::Tier(kind, TierField::Percentage),
        &tier.percentage,
        true,
        |value| percentage_error(kind, value),
    );
    if tier.certificate.is_none() {
        let key = FieldKey::Tier(kind, TierField::Certificate);
        errors.insert(key, FieldError::required(key));
    }
}

pub(crate) fn is_fixed_digits(value: &str, length: usize) -> bool {
    value.len() == length && value.bytes().all(|byte| byte.is_ascii_digit())
}

fn digits_error(key: FieldKey, value: &str, length: usize) -> Option<FieldError> {
    (!is_fixed_digits(value, length)).then(|| {
        FieldError::new(
            ErrorCode::InvalidFormat,
            format!("{} must be exactly {length} digits", key.label()),
        )
    })
}

fn date_of_birth_error(value: &str, today: NaiveDate) -> Option<FieldError> {
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) if date > today => Some(FieldError::new(
            ErrorCode::OutOfRange,
            "Date of birth cannot be in the future",
        )),
        Ok(_) => None,
        Err(_) => Some(FieldError::new(
            ErrorCode::InvalidFormat,
            "Date of birth must use YYYY-MM-DD",
        )),
    }
}

fn experience_error(value: &str) -> Option<FieldError> {
    match value.parse::<f64>() {
        Ok(years) if !years.is_finite() => Some(FieldError::new(
            ErrorCode::InvalidFormat,
            "Experience must be a number of years",
        )),
        Ok(years) if years < 0.0 => Some(FieldError::new(
            ErrorCode::OutOfRange,
            "Experience cannot be negative",
        )),
        Ok(_) => None,
        Err(_) => Some(FieldError::new(
            ErrorCode::InvalidFormat,
            "Experience must be a number of years",
        )),
    }
}

fn completion_year_error(kind: TierKind, value: &str, this_year: i32) -> Option<FieldError> {
    if !is_fixed_digits(value, 4) {
        return Some(FieldError::new(
            ErrorCode::InvalidFormat,
            format!("{} year must be four digits", kind.heading()),
        ));
    }
    let year: i32 = value.parse().ok()?;
    if year < EARLIEST_COMPLETION_YEAR || year > this_year {
        return Some(FieldError::new(
            ErrorCode::OutOfRange,
            format!(
                "{} year must be between {EARLIEST_COMPLETION_YEAR} and {this_year}",
                kind.heading()
            ),
        ));
    }
    None
}

/// Accepts `0`..=`100` with at most two decimal places.
pub(crate) fn parse_percentage(value: &str) -> Result<f64, ErrorCode> {
    let (whole, fraction) = match value.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (value, ""),
    };
    let shape_ok = !whole.is_empty()
        && whole.len() <= 3
        && whole.bytes().all(|byte| byte.is_ascii_digit())
        && fraction.len() <= 2
        && fraction.bytes().all(|byte| byte.is_ascii_digit())
        && !(value.contains('.') && fraction.is_empty());
    if !shape_ok {
        return Err(ErrorCode::InvalidFormat);
    }
    let parsed: f64 = value.parse().map_err(|_| ErrorCode::InvalidFormat)?;
    if parsed > 100.0 {
        return Err(ErrorCode::OutOfRange);
    }
    Ok(parsed)
}

fn percentage_error(kind: TierKind, value: &str) -> Option<FieldError> {
    match parse_percentage(value) {
        Ok(_) => None,
        Err(ErrorCode::OutOfRange) => Some(FieldError::new(
            ErrorCode::OutOfRange,
            format!("{} percentage cannot exceed 100", kind.heading()),
        )),
        Err(code) => Some(FieldError::new(
            code,
            format!("{} percentage must be a number with up to two decimals", kind.heading()),
        )),
    }
}
