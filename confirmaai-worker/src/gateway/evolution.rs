/// Evolution API gateway
///
/// Sends `POST {base_url}/message/sendText/{instance}` with the `apikey`
/// header and a `{"number", "text"}` body. Any 2xx counts as delivered.

use super::{GatewayError, GatewayResult, MessageGateway};
use crate::config::EvolutionConfig;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct SendTextRequest<'a> {
    number: &'a str,
    text: &'a str,
}

pub struct EvolutionGateway {
    client: reqwest::Client,
    config: EvolutionConfig,
}

impl EvolutionGateway {
    /// # Errors
    ///
    /// Returns an error if the HTTP client can't be built.
    pub fn new(config: EvolutionConfig, timeout: Duration) -> GatewayResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(EvolutionGateway { client, config })
    }

    pub fn send_text_url(&self) -> String {
        format!(
            "{}/message/sendText/{}",
            self.config.base_url, self.config.instance_name
        )
    }
}

#[async_trait]
impl MessageGateway for EvolutionGateway {
    fn name(&self) -> &str {
        "evolution"
    }

    async fn send_text(&self, phone: &str, text: &str) -> GatewayResult<()> {
        let url = self.send_text_url();

        tracing::debug!(%phone, "Sending WhatsApp message through Evolution API");

        let resp = self
            .client
            .post(&url)
            .header("apikey", &self.config.api_key)
            .json(&SendTextRequest {
                number: phone,
                text,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %message, "Evolution API error");
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_text_url() {
        let gateway = EvolutionGateway::new(
            EvolutionConfig {
                base_url: "https://evolution.example.com".to_string(),
                api_key: "key".to_string(),
                instance_name: "clinica-sorriso".to_string(),
            },
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(
            gateway.send_text_url(),
            "https://evolution.example.com/message/sendText/clinica-sorriso"
        );
    }

    #[test]
    fn test_request_body() {
        let body = serde_json::to_value(SendTextRequest {
            number: "+5511999998888",
            text: "Olá",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "number": "+5511999998888", "text": "Olá" }));
    }
}
