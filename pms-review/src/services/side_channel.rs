//! Out-of-band (email) delivery
//!
//! [`SideChannelGateway`] is the transport seam. [`BestEffortMailer`] wraps
//! a gateway for the workflow engine and the reminder sweeper: failures are
//! logged and reported as `false`, never propagated.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::messages::MailContent;

/// One rendered email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub tenant_id: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Transport failure
#[derive(Debug, Error)]
pub enum SideChannelError {
    #[error("Mail relay request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Mail relay rejected message: HTTP {status}")]
    Rejected { status: u16 },

    #[error("Mail delivery failed: {0}")]
    Other(String),
}

/// Email transport
#[async_trait]
pub trait SideChannelGateway: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<(), SideChannelError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Posts each message as JSON to an HTTP mail relay
#[derive(Debug, Clone)]
pub struct HttpMailGateway {
    client: reqwest::Client,
    relay_url: String,
}

impl HttpMailGateway {
    pub fn new(relay_url: impl Into<String>, timeout: Duration) -> Result<Self, SideChannelError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            relay_url: relay_url.into(),
        })
    }
}

#[async_trait]
impl SideChannelGateway for HttpMailGateway {
    async fn send(&self, message: &OutboundMessage) -> Result<(), SideChannelError> {
        let response = self
            .client
            .post(&self.relay_url)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SideChannelError::Rejected {
                status: status.as_u16(),
            });
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "http-relay"
    }
}

/// Writes messages to the log instead of sending them
///
/// Used when no relay is configured.
#[derive(Debug, Clone, Default)]
pub struct LogOnlyGateway;

#[async_trait]
impl SideChannelGateway for LogOnlyGateway {
    async fn send(&self, message: &OutboundMessage) -> Result<(), SideChannelError> {
        info!(
            "Mail (log only) to {} [{}]: {}",
            message.to, message.tenant_id, message.subject
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log-only"
    }
}

/// Fire-and-log email sender
#[derive(Clone)]
pub struct BestEffortMailer {
    gateway: Arc<dyn SideChannelGateway>,
    from_address: String,
}

impl BestEffortMailer {
    pub fn new(gateway: Arc<dyn SideChannelGateway>, from_address: impl Into<String>) -> Self {
        Self {
            gateway,
            from_address: from_address.into(),
        }
    }

    /// Send `content` to `to`; returns whether the gateway accepted it
    ///
    /// A missing address is skipped silently (returns `false`).
    pub async fn deliver(&self, tenant_id: &str, to: Option<&str>, content: MailContent) -> bool {
        let Some(to) = to.filter(|address| !address.trim().is_empty()) else {
            debug!("No email address, skipping \"{}\"", content.subject);
            return false;
        };

        let message = OutboundMessage {
            tenant_id: tenant_id.to_string(),
            from: self.from_address.clone(),
            to: to.to_string(),
            subject: content.subject,
            html_body: content.html_body,
        };

        match self.gateway.send(&message).await {
            Ok(()) => {
                debug!("Mail \"{}\" sent to {} via {}", message.subject, to, self.gateway.name());
                true
            }
            Err(e) => {
                warn!(
                    "Mail \"{}\" to {} via {} failed: {}",
                    message.subject,
                    to,
                    self.gateway.name(),
                    e
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for BestEffortMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BestEffortMailer")
            .field("gateway", &self.gateway.name())
            .field("from_address", &self.from_address)
            .finish()
    }
}
