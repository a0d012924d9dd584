use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, warn};

use super::super::compose::OutboundMessage;
use super::{DeliveryAck, DeliveryError, DeliveryGateway, DeliveryStrategy};

/// Tries `primary`, and only on a transport failure retries with `secondary`.
pub struct FallbackGateway {
    primary: Arc<dyn DeliveryGateway>,
    secondary: Arc<dyn DeliveryGateway>,
}

impl FallbackGateway {
    pub fn new(primary: Arc<dyn DeliveryGateway>, secondary: Arc<dyn DeliveryGateway>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl DeliveryGateway for FallbackGateway {
    fn strategy(&self) -> DeliveryStrategy {
        self.primary.strategy()
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryAck, DeliveryError> {
        match self.primary.send(message).await {
            Err(DeliveryError::TransportFailed { strategy, detail }) => {
                warn!(
                    failed = %strategy,
                    fallback = %self.secondary.strategy(),
                    %detail,
                    "primary transport failed, engaging fallback"
                );
                self.secondary.send(message).await
            }
            Err(err @ DeliveryError::ConfigMissing(_)) => {
                error!(error = %err, "delivery is misconfigured");
                Err(err)
            }
            other => other,
        }
    }
}
