use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::super::compose::{LabeledAttachment, OutboundMessage};
use super::{DeliveryAck, DeliveryError, DeliveryGateway, DeliveryStrategy};

const CONTINUED_MARKER: &str = "Continued from previous message";

/// Identifiers issued by the hosted mail service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailApiCredentials {
    pub service_id: String,
    pub template_id: String,
    pub public_key: String,
}

/// One send call worth of the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageChunk<'a> {
    pub index: usize,
    pub total: usize,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<&'a LabeledAttachment>,
}

/// Splits the attachments of `message` into ordered chunks whose combined
/// encoded size stays within `ceiling`. A message without attachments is a
/// single chunk.
pub fn plan_chunks(
    message: &OutboundMessage,
    ceiling: usize,
) -> Result<Vec<MessageChunk<'_>>, DeliveryError> {
    let mut groups: Vec<Vec<&LabeledAttachment>> = Vec::new();
    let mut current: Vec<&LabeledAttachment> = Vec::new();
    let mut current_size = 0usize;

    for attachment in &message.attachments {
        let size = attachment.file.encoded_len();
        if size > ceiling {
            return Err(DeliveryError::PayloadTooLarge {
                label: attachment.label.clone(),
                size,
                ceiling,
            });
        }
        if !current.is_empty() && current_size + size > ceiling {
            groups.push(std::mem::take(&mut current));
            current_size = 0;
        }
        current_size += size;
        current.push(attachment);
    }
    if !current.is_empty() || groups.is_empty() {
        groups.push(current);
    }

    let total = groups.len();
    Ok(groups
        .into_iter()
        .enumerate()
        .map(|(position, attachments)| {
            let index = position + 1;
            let (subject, body) = if total == 1 {
                (message.subject.clone(), message.body.clone())
            } else if index == 1 {
                (
                    format!("{} [1/{total}]", message.subject),
                    message.body.clone(),
                )
            } else {
                (
                    format!("{} (Continued) [{index}/{total}]", message.subject),
                    continuation_body(message, &attachments),
                )
            };
            MessageChunk {
                index,
                total,
                subject,
                body,
                attachments,
            }
        })
        .collect())
}

fn continuation_body(message: &OutboundMessage, attachments: &[&LabeledAttachment]) -> String {
    let mut body = format!(
        "{CONTINUED_MARKER} ({}).\n\nApplicant: {}\n\nAttachments in this part:\n",
        message.subject, message.sender_name
    );
    for attachment in attachments {
        body.push_str(&format!("- {}\n", attachment.label));
    }
    body
}

/// Sends through a hosted mail API that caps the payload of each call.
#[derive(Debug, Clone)]
pub struct MailApiGateway {
    client: Client,
    endpoint: String,
    credentials: MailApiCredentials,
    ceiling: usize,
}

#[derive(Serialize)]
struct MailApiRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: TemplateParams<'a>,
}

#[derive(Serialize)]
struct TemplateParams<'a> {
    to_email: &'a str,
    from_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    from_email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    subject: &'a str,
    message: &'a str,
    attachments: Vec<TemplateAttachment>,
}

#[derive(Serialize)]
struct TemplateAttachment {
    name: String,
    label: String,
    data: String,
}

impl MailApiGateway {
    pub fn new(
        endpoint: impl Into<String>,
        credentials: MailApiCredentials,
        ceiling: usize,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DeliveryError::transport(DeliveryStrategy::MailApi, err))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            credentials,
            ceiling,
        })
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    async fn send_chunk(
        &self,
        message: &OutboundMessage,
        chunk: &MessageChunk<'_>,
    ) -> Result<(), String> {
        let request = MailApiRequest {
            service_id: &self.credentials.service_id,
            template_id: &self.credentials.template_id,
            user_id: &self.credentials.public_key,
            template_params: TemplateParams {
                to_email: &message.to,
                from_name: &message.sender_name,
                from_email: message.reply_to.as_deref(),
                reply_to: message.reply_to.as_deref(),
                subject: &chunk.subject,
                message: &chunk.body,
                attachments: chunk
                    .attachments
                    .iter()
                    .map(|attachment| TemplateAttachment {
                        name: attachment.file.file_name.clone(),
                        label: attachment.label.clone(),
                        data: attachment.file.data_uri(),
                    })
                    .collect(),
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| err.to_string())?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let detail = response.text().await.unwrap_or_default();
            Err(format!("mail api responded with {status}: {}", detail.trim()))
        }
    }
}

#[async_trait]
impl DeliveryGateway for MailApiGateway {
    fn strategy(&self) -> DeliveryStrategy {
        DeliveryStrategy::MailApi
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryAck, DeliveryError> {
        let chunks = plan_chunks(message, self.ceiling).inspect_err(|err| {
            warn!(error = %err, "message cannot be split under the mail api ceiling");
        })?;
        let total = chunks.len();

        for chunk in &chunks {
            debug!(
                chunk = chunk.index,
                total,
                attachments = chunk.attachments.len(),
                "dispatching mail api chunk"
            );
            if let Err(detail) = self.send_chunk(message, chunk).await {
                let delivered = chunk.index - 1;
                if delivered == 0 {
                    warn!(endpoint = %self.endpoint, %detail, "mail api request failed");
                    return Err(DeliveryError::transport(DeliveryStrategy::MailApi, detail));
                }
                error!(
                    delivered,
                    total,
                    applicant = %message.sender_name,
                    %detail,
                    "mail api delivery stopped part way"
                );
                return Err(DeliveryError::PartialDelivery {
                    delivered,
                    total,
                    detail,
                });
            }
        }

        info!(
            subject = %message.subject,
            chunks = total,
            "message delivered through mail api"
        );
        Ok(DeliveryAck::confirmed(DeliveryStrategy::MailApi, total))
    }
}
