//! Side-channel test doubles

use async_trait::async_trait;
use pms_review::services::{OutboundMessage, SideChannelError, SideChannelGateway};
use std::sync::Mutex;

/// Records every message; optionally fails every send
#[derive(Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<OutboundMessage>>,
    fail: bool,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway whose every send fails (after recording the attempt)
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn messages_to(&self, address: &str) -> Vec<OutboundMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.to == address)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl SideChannelGateway for RecordingGateway {
    async fn send(&self, message: &OutboundMessage) -> Result<(), SideChannelError> {
        self.sent.lock().unwrap().push(message.clone());
        if self.fail {
            return Err(SideChannelError::Rejected { status: 503 });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
