//! Short service-inquiry (booking) form delivered through the same gateways as
//! job applications.

pub mod router;

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::recruitment::compose::{escape_html, OutboundMessage};
use super::recruitment::delivery::{DeliveryAck, DeliveryError, DeliveryGateway};
use super::recruitment::validation::{email_pattern, ErrorCode, FieldError};

pub use router::inquiry_router;

const PHONE_PATTERN: &str = r"^\+?[\d\s-]{10,}$";

fn phone_pattern() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(PHONE_PATTERN).expect("phone pattern compiles"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceInquiry {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub service: String,
    pub address: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InquiryField {
    Name,
    Email,
    Phone,
    Service,
    Address,
    Message,
}

impl InquiryField {
    pub const fn label(self) -> &'static str {
        match self {
            InquiryField::Name => "Name",
            InquiryField::Email => "Email",
            InquiryField::Phone => "Phone",
            InquiryField::Service => "Service",
            InquiryField::Address => "Address",
            InquiryField::Message => "Message",
        }
    }
}

pub type InquiryErrors = BTreeMap<InquiryField, FieldError>;

pub fn validate_inquiry(inquiry: &ServiceInquiry) -> InquiryErrors {
    let mut errors = InquiryErrors::new();
    let mut required = |field: InquiryField, value: &str| {
        if value.trim().is_empty() {
            errors.insert(
                field,
                FieldError::new(ErrorCode::Required, format!("{} is required", field.label())),
            );
            false
        } else {
            true
        }
    };

    required(InquiryField::Name, &inquiry.name);
    let email = required(InquiryField::Email, &inquiry.email);
    let phone = required(InquiryField::Phone, &inquiry.phone);
    required(InquiryField::Service, &inquiry.service);
    required(InquiryField::Message, &inquiry.message);

    if email && !email_pattern().is_match(inquiry.email.trim()) {
        errors.insert(
            InquiryField::Email,
            FieldError::new(ErrorCode::InvalidFormat, "Enter a valid e-mail address"),
        );
    }
    if phone && !phone_pattern().is_match(inquiry.phone.trim()) {
        errors.insert(
            InquiryField::Phone,
            FieldError::new(
                ErrorCode::InvalidFormat,
                "Phone must have at least 10 digits, spaces or dashes",
            ),
        );
    }
    errors
}

pub fn compose_inquiry(recipient: &str, inquiry: &ServiceInquiry) -> OutboundMessage {
    let address = match inquiry.address.trim() {
        "" => "Not provided",
        address => address,
    };
    let rows = [
        ("Name", inquiry.name.trim()),
        ("Email", inquiry.email.trim()),
        ("Phone", inquiry.phone.trim()),
        ("Service", inquiry.service.trim()),
        ("Address", address),
    ];

    let mut body = String::from("Service Inquiry Details\n\n");
    let mut html = String::from("<html><body><h1>New Service Inquiry</h1><table>");
    for (label, value) in rows {
        body.push_str(&format!("{label}: {value}\n"));
        html.push_str(&format!(
            "<tr><th>{label}</th><td>{}</td></tr>",
            escape_html(value)
        ));
    }
    body.push_str(&format!("\nMessage:\n{}\n", inquiry.message.trim()));
    html.push_str(&format!(
        "</table><h2>Message</h2><p>{}</p></body></html>",
        escape_html(inquiry.message.trim())
    ));

    let email = inquiry.email.trim();
    OutboundMessage {
        to: recipient.to_string(),
        reply_to: (!email.is_empty()).then(|| email.to_string()),
        sender_name: inquiry.name.trim().to_string(),
        subject: format!("Service Inquiry - {}", inquiry.name.trim()),
        body,
        html_body: html,
        attachments: Vec::new(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InquiryError {
    #[error("inquiry has {} invalid field(s)", .0.len())]
    Invalid(InquiryErrors),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

pub struct InquiryService {
    recipient: String,
    gateway: Arc<dyn DeliveryGateway>,
}

impl InquiryService {
    pub fn new(recipient: impl Into<String>, gateway: Arc<dyn DeliveryGateway>) -> Self {
        Self {
            recipient: recipient.into(),
            gateway,
        }
    }

    pub async fn submit(&self, inquiry: &ServiceInquiry) -> Result<DeliveryAck, InquiryError> {
        let errors = validate_inquiry(inquiry);
        if !errors.is_empty() {
            return Err(InquiryError::Invalid(errors));
        }

        let message = compose_inquiry(&self.recipient, inquiry);
        let ack = self.gateway.send(&message).await.inspect_err(|err| {
            warn!(code = err.code(), "service inquiry delivery failed");
        })?;
        info!(
            sender = %message.sender_name,
            strategy = %ack.strategy,
            "service inquiry delivered"
        );
        Ok(ack)
    }
}
