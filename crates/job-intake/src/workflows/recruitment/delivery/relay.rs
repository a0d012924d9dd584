use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use super::super::compose::OutboundMessage;
use super::{DeliveryAck, DeliveryError, DeliveryGateway, DeliveryStrategy};

const USER_AGENT: &str = concat!("job-intake/", env!("CARGO_PKG_VERSION"));

/// Posts the whole message, attachments included, to a mail relay service
/// in a single JSON request.
#[derive(Debug, Clone)]
pub struct RelayGateway {
    client: Client,
    endpoint: String,
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    to: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<&'a str>,
    #[serde(rename = "fromName")]
    from_name: &'a str,
    subject: &'a str,
    body: &'a str,
    html: &'a str,
    attachments: Vec<RelayAttachment<'a>>,
}

#[derive(Serialize)]
struct RelayAttachment<'a> {
    name: &'a str,
    label: &'a str,
    #[serde(rename = "contentType")]
    content_type: &'a str,
    data: String,
}

impl RelayGateway {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| DeliveryError::transport(DeliveryStrategy::Relay, err))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DeliveryGateway for RelayGateway {
    fn strategy(&self) -> DeliveryStrategy {
        DeliveryStrategy::Relay
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryAck, DeliveryError> {
        let request = RelayRequest {
            to: &message.to,
            from: message.reply_to.as_deref(),
            from_name: &message.sender_name,
            subject: &message.subject,
            body: &message.body,
            html: &message.html_body,
            attachments: message
                .attachments
                .iter()
                .map(|attachment| RelayAttachment {
                    name: &attachment.file.file_name,
                    label: &attachment.label,
                    content_type: &attachment.file.content_type,
                    data: attachment.file.base64(),
                })
                .collect(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                warn!(endpoint = %self.endpoint, error = %err, "relay request failed");
                DeliveryError::transport(DeliveryStrategy::Relay, err)
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(endpoint = %self.endpoint, %status, "relay rejected message");
            return Err(DeliveryError::transport(
                DeliveryStrategy::Relay,
                format!("relay responded with {status}: {}", detail.trim()),
            ));
        }

        info!(
            subject = %message.subject,
            attachments = message.attachments.len(),
            "message delivered through relay"
        );
        Ok(DeliveryAck::confirmed(DeliveryStrategy::Relay, 1))
    }
}
