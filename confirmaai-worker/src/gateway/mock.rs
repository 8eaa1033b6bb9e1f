/// In-memory gateway
///
/// Records every message instead of sending it. Tests can make it fail all
/// sends, or only sends to specific phones.

use super::{GatewayError, GatewayResult, MessageGateway};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub phone: String,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct MockGateway {
    sent: Mutex<Vec<SentMessage>>,
    fail_all: bool,
    failing_phones: HashSet<String>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway that refuses every message
    pub fn failing() -> Self {
        MockGateway {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Refuses messages to `phone` only
    pub fn fail_for(mut self, phone: impl Into<String>) -> Self {
        self.failing_phones.insert(phone.into());
        self
    }

    /// Messages delivered so far, in send order
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessageGateway for MockGateway {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send_text(&self, phone: &str, text: &str) -> GatewayResult<()> {
        if self.fail_all || self.failing_phones.contains(phone) {
            return Err(GatewayError::Rejected(format!("mock refused message to {}", phone)));
        }

        tracing::info!(%phone, %text, "Mock WhatsApp message");

        let mut sent = self
            .sent
            .lock()
            .map_err(|_| GatewayError::Rejected("mock gateway lock poisoned".to_string()))?;
        sent.push(SentMessage {
            phone: phone.to_string(),
            text: text.to_string(),
        });

        Ok(())
    }
}
