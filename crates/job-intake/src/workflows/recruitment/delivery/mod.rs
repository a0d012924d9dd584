//! Outbound delivery strategies behind one [`DeliveryGateway`] interface.

mod fallback;
mod mail_api;
mod mailto;
mod relay;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::error;

use crate::config::MailConfig;

use super::compose::OutboundMessage;

pub use fallback::FallbackGateway;
pub use mail_api::{plan_chunks, MailApiCredentials, MailApiGateway, MessageChunk};
pub use mailto::{
    mailto_uri, LogOnlyLauncher, MailClientKind, MailClientLauncher, MailtoGateway,
    SystemMailClient,
};
pub use relay::RelayGateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStrategy {
    Relay,
    MailApi,
    Mailto,
}

impl DeliveryStrategy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "relay" | "http" => Some(Self::Relay),
            "mail_api" | "mailapi" | "emailjs" => Some(Self::MailApi),
            "mailto" | "mail_client" => Some(Self::Mailto),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            DeliveryStrategy::Relay => "relay",
            DeliveryStrategy::MailApi => "mail_api",
            DeliveryStrategy::Mailto => "mailto",
        }
    }
}

impl fmt::Display for DeliveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether the transport acknowledged the message or merely handed it off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    Confirmed,
    Unverified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryAck {
    pub strategy: DeliveryStrategy,
    pub verification: Verification,
    pub chunks: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub undelivered_attachments: Vec<String>,
}

impl DeliveryAck {
    pub(crate) fn confirmed(strategy: DeliveryStrategy, chunks: usize) -> Self {
        Self {
            strategy,
            verification: Verification::Confirmed,
            chunks,
            undelivered_attachments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("{strategy} transport failed: {detail}")]
    TransportFailed {
        strategy: DeliveryStrategy,
        detail: String,
    },
    #[error("only {delivered} of {total} parts were delivered: {detail}")]
    PartialDelivery {
        delivered: usize,
        total: usize,
        detail: String,
    },
    #[error("missing configuration value {0}")]
    ConfigMissing(&'static str),
    #[error("attachment '{label}' encodes to {size} bytes, above the {ceiling} byte ceiling")]
    PayloadTooLarge {
        label: String,
        size: usize,
        ceiling: usize,
    },
}

impl DeliveryError {
    pub const fn code(&self) -> &'static str {
        match self {
            DeliveryError::TransportFailed { .. } => "TRANSPORT_FAILED",
            DeliveryError::PartialDelivery { .. } => "PARTIAL_DELIVERY",
            DeliveryError::ConfigMissing(_) => "CONFIG_MISSING",
            DeliveryError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
        }
    }

    pub(crate) fn transport(strategy: DeliveryStrategy, detail: impl fmt::Display) -> Self {
        DeliveryError::TransportFailed {
            strategy,
            detail: detail.to_string(),
        }
    }

    pub(crate) fn config_missing(variable: &'static str) -> Self {
        error!(variable, "required delivery configuration is missing");
        DeliveryError::ConfigMissing(variable)
    }
}

/// A transport able to carry a composed message.
#[async_trait]
pub trait DeliveryGateway: Send + Sync {
    fn strategy(&self) -> DeliveryStrategy;

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryAck, DeliveryError>;
}

/// Builds the configured strategy, wrapped with the configured fallback.
pub fn build_gateway(config: &MailConfig) -> Result<Arc<dyn DeliveryGateway>, DeliveryError> {
    let primary = build_strategy(config.strategy, config)?;
    match config.fallback {
        Some(fallback) if fallback != config.strategy => {
            let secondary = build_strategy(fallback, config)?;
            Ok(Arc::new(FallbackGateway::new(primary, secondary)))
        }
        _ => Ok(primary),
    }
}

fn build_strategy(
    strategy: DeliveryStrategy,
    config: &MailConfig,
) -> Result<Arc<dyn DeliveryGateway>, DeliveryError> {
    match strategy {
        DeliveryStrategy::Relay => {
            let endpoint = config
                .relay_endpoint
                .clone()
                .ok_or_else(|| DeliveryError::config_missing("MAIL_RELAY_ENDPOINT"))?;
            Ok(Arc::new(RelayGateway::new(endpoint, config.timeout)?))
        }
        DeliveryStrategy::MailApi => {
            let api = &config.mail_api;
            let credentials = MailApiCredentials {
                service_id: api
                    .service_id
                    .clone()
                    .ok_or_else(|| DeliveryError::config_missing("MAIL_API_SERVICE_ID"))?,
                template_id: api
                    .template_id
                    .clone()
                    .ok_or_else(|| DeliveryError::config_missing("MAIL_API_TEMPLATE_ID"))?,
                public_key: api
                    .public_key
                    .clone()
                    .ok_or_else(|| DeliveryError::config_missing("MAIL_API_PUBLIC_KEY"))?,
            };
            Ok(Arc::new(MailApiGateway::new(
                api.endpoint.clone(),
                credentials,
                api.payload_ceiling,
                config.timeout,
            )?))
        }
        DeliveryStrategy::Mailto => {
            let gateway: Arc<dyn DeliveryGateway> = match config.mail_client {
                MailClientKind::System => Arc::new(MailtoGateway::new(SystemMailClient)),
                MailClientKind::LogOnly => Arc::new(MailtoGateway::new(LogOnlyLauncher)),
            };
            Ok(gateway)
        }
    }
}
