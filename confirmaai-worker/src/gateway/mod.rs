/// Outbound WhatsApp gateways
///
/// The scheduler only talks to the `MessageGateway` trait. Which
/// implementation backs it is picked at startup from `WHATSAPP_GATEWAY`:
///
/// - **Evolution**: the Evolution API `sendText` endpoint
/// - **Mock**: records messages in memory, for tests and local runs
/// - **Disabled**: stands in for Evolution when its settings are missing
///   and fails every send

pub mod evolution;
pub mod mock;

pub use evolution::EvolutionGateway;
pub use mock::{MockGateway, SentMessage};

use crate::config::{GatewayConfig, GatewayKind};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Gateway settings are missing or unusable
    #[error("Gateway not configured: {0}")]
    NotConfigured(String),

    /// Request never got a response (connect error, timeout)
    #[error("Gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway answered with a non-2xx status
    #[error("Gateway returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Send refused without reaching a gateway
    #[error("Message rejected: {0}")]
    Rejected(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Sends a text message to a `+55...` phone number
    async fn send_text(&self, phone: &str, text: &str) -> GatewayResult<()>;
}

/// Fails every send; used when the Evolution settings are incomplete
#[derive(Debug, Clone)]
pub struct DisabledGateway {
    reason: String,
}

impl DisabledGateway {
    pub fn new(reason: impl Into<String>) -> Self {
        DisabledGateway {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl MessageGateway for DisabledGateway {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn send_text(&self, _phone: &str, _text: &str) -> GatewayResult<()> {
        Err(GatewayError::NotConfigured(self.reason.clone()))
    }
}

/// Builds the gateway selected by the configuration
///
/// # Errors
///
/// Returns an error if the HTTP client can't be built.
pub fn build_gateway(config: &GatewayConfig) -> GatewayResult<Arc<dyn MessageGateway>> {
    match config.kind {
        GatewayKind::Mock => {
            tracing::info!("Using mock WhatsApp gateway; no messages will leave this process");
            Ok(Arc::new(MockGateway::new()))
        }
        GatewayKind::Evolution => match &config.evolution {
            Some(evolution) => {
                let gateway = EvolutionGateway::new(
                    evolution.clone(),
                    Duration::from_secs(config.timeout_secs),
                )?;
                tracing::info!(
                    base_url = %evolution.base_url,
                    instance = %evolution.instance_name,
                    "Using Evolution API gateway"
                );
                Ok(Arc::new(gateway))
            }
            None => {
                let reason = "EVOLUTION_API_URL, EVOLUTION_API_KEY and EVOLUTION_INSTANCE_NAME must all be set";
                tracing::warn!(reason, "WhatsApp gateway disabled; every send will fail");
                Ok(Arc::new(DisabledGateway::new(reason)))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvolutionConfig;

    #[tokio::test]
    async fn test_disabled_gateway_fails_every_send() {
        let gateway = DisabledGateway::new("missing settings");
        let err = gateway.send_text("+5511999998888", "oi").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotConfigured(_)));
        assert_eq!(err.to_string(), "Gateway not configured: missing settings");
    }

    #[test]
    fn test_build_gateway_selection() {
        let mut config = GatewayConfig {
            kind: GatewayKind::Evolution,
            evolution: None,
            timeout_secs: 15,
        };
        assert_eq!(build_gateway(&config).unwrap().name(), "disabled");

        config.evolution = Some(EvolutionConfig {
            base_url: "http://localhost:8081".to_string(),
            api_key: "key".to_string(),
            instance_name: "clinica".to_string(),
        });
        assert_eq!(build_gateway(&config).unwrap().name(), "evolution");

        config.kind = GatewayKind::Mock;
        assert_eq!(build_gateway(&config).unwrap().name(), "mock");
    }
}
