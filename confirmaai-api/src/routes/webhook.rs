/// WhatsApp inbound webhook
///
/// `POST /api/webhook/whatsapp` receives Evolution API `messages.upsert`
/// events. A patient answering a confirmation message with one of the
/// known replies confirms or cancels their upcoming appointment.
///
/// The gateway authenticates with the `apikey` (or `x-api-key`) header.
/// Past authentication the endpoint always answers `200 {"received": true}`,
/// even on internal errors, so the gateway never retries a message forever.

use crate::app::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use confirmaai_shared::{
    models::appointment::{Appointment, AppointmentStatus},
    replies::{parse_response, phone_from_remote_jid},
};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub data: Option<WebhookData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookData {
    #[serde(default)]
    pub key: Option<MessageKey>,

    #[serde(default)]
    pub message: Option<MessageContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    #[serde(default)]
    pub remote_jid: Option<String>,

    /// Set on messages the clinic's own number sent
    #[serde(default)]
    pub from_me: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageContent {
    #[serde(default)]
    pub conversation: Option<String>,

    #[serde(default)]
    pub extended_text_message: Option<ExtendedText>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExtendedText {
    #[serde(default)]
    pub text: Option<String>,
}

/// Sender phone and text of an inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundReply {
    pub phone: String,
    pub text: String,
}

/// What the webhook did with a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Ignored(&'static str),
    Applied {
        appointment_id: Uuid,
        status: AppointmentStatus,
    },
}

/// Pulls the sender and text out of a payload
///
/// Returns the reason when the message isn't a patient text message.
pub fn extract_reply(payload: &WebhookPayload) -> Result<InboundReply, &'static str> {
    let data = payload.data.as_ref().ok_or("missing data")?;
    let key = data.key.as_ref().ok_or("missing key")?;

    let remote_jid = key
        .remote_jid
        .as_deref()
        .filter(|jid| !jid.trim().is_empty())
        .ok_or("missing remoteJid")?;

    if key.from_me {
        return Err("sent by the clinic");
    }

    let message = data.message.as_ref().ok_or("missing message")?;
    let text = message
        .conversation
        .as_deref()
        .filter(|t| !t.is_empty())
        .or_else(|| {
            message
                .extended_text_message
                .as_ref()
                .and_then(|e| e.text.as_deref())
                .filter(|t| !t.is_empty())
        })
        .ok_or("no text")?;

    Ok(InboundReply {
        phone: phone_from_remote_jid(remote_jid),
        text: text.to_string(),
    })
}

/// Compares SHA-256 digests without short-circuiting
fn api_key_matches(provided: &str, expected: &str) -> bool {
    let provided = Sha256::digest(provided.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());

    provided
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Checks the gateway key; an unconfigured key rejects everything
pub fn is_authorized(headers: &HeaderMap, expected: Option<&str>) -> bool {
    let Some(expected) = expected else {
        return false;
    };

    let provided = ["apikey", "x-api-key"]
        .into_iter()
        .filter_map(|name| headers.get(name))
        .filter_map(|value| value.to_str().ok())
        .find(|value| !value.is_empty());

    provided.is_some_and(|key| api_key_matches(key, expected))
}

async fn handle_reply(state: &AppState, reply: &InboundReply) -> Result<WebhookOutcome, sqlx::Error> {
    let Some(intent) = parse_response(&reply.text) else {
        return Ok(WebhookOutcome::Ignored("unrecognized reply"));
    };

    let now = Utc::now();
    let Some(appointment) = Appointment::find_awaiting_reply(&state.db, &reply.phone, now).await?
    else {
        return Ok(WebhookOutcome::Ignored("no appointment awaiting a reply"));
    };

    let status = intent.target_status();
    match Appointment::apply_reply(&state.db, appointment.id, status, &reply.text, now).await? {
        Some(updated) => Ok(WebhookOutcome::Applied {
            appointment_id: updated.id,
            status: updated.status,
        }),
        None => Ok(WebhookOutcome::Ignored("appointment vanished")),
    }
}

fn received() -> Response {
    Json(json!({ "received": true })).into_response()
}

pub async fn whatsapp_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !is_authorized(&headers, state.config.webhook.api_key.as_deref()) {
        tracing::warn!("Webhook call with a missing or wrong API key");
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response();
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, "Unparseable webhook body");
            return received();
        }
    };

    let reply = match extract_reply(&payload) {
        Ok(reply) => reply,
        Err(reason) => {
            tracing::debug!(reason, "Webhook message ignored");
            return received();
        }
    };

    match handle_reply(&state, &reply).await {
        Ok(WebhookOutcome::Applied {
            appointment_id,
            status,
        }) => {
            tracing::info!(%appointment_id, %status, "Patient reply applied");
        }
        Ok(WebhookOutcome::Ignored(reason)) => {
            tracing::debug!(reason, phone = %reply.phone, "Webhook message ignored");
        }
        Err(e) => {
            tracing::error!(error = %e, phone = %reply.phone, "Failed to apply patient reply");
        }
    }

    received()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn payload(value: serde_json::Value) -> WebhookPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_extract_conversation_text() {
        let reply = extract_reply(&payload(json!({
            "event": "messages.upsert",
            "data": {
                "key": { "remoteJid": "5511999998888@s.whatsapp.net", "fromMe": false },
                "message": { "conversation": "Sim" }
            }
        })))
        .unwrap();

        assert_eq!(
            reply,
            InboundReply {
                phone: "+5511999998888".to_string(),
                text: "Sim".to_string(),
            }
        );
    }

    #[test]
    fn test_extract_extended_text_when_conversation_empty() {
        let reply = extract_reply(&payload(json!({
            "data": {
                "key": { "remoteJid": "5511999998888@s.whatsapp.net" },
                "message": {
                    "conversation": "",
                    "extendedTextMessage": { "text": "2" }
                }
            }
        })))
        .unwrap();

        assert_eq!(reply.text, "2");
    }

    #[test]
    fn test_ignored_messages() {
        assert_eq!(extract_reply(&payload(json!({}))), Err("missing data"));

        assert_eq!(
            extract_reply(&payload(json!({
                "data": { "key": {}, "message": { "conversation": "sim" } }
            }))),
            Err("missing remoteJid")
        );

        assert_eq!(
            extract_reply(&payload(json!({
                "data": {
                    "key": { "remoteJid": "5511999998888@s.whatsapp.net", "fromMe": true },
                    "message": { "conversation": "sim" }
                }
            }))),
            Err("sent by the clinic")
        );

        assert_eq!(
            extract_reply(&payload(json!({
                "data": {
                    "key": { "remoteJid": "5511999998888@s.whatsapp.net" },
                    "message": { "imageMessage": {} }
                }
            }))),
            Err("no text")
        );
    }

    #[test]
    fn test_authorization_headers() {
        let mut headers = HeaderMap::new();
        assert!(!is_authorized(&headers, Some("secret")));

        headers.insert("x-api-key", HeaderValue::from_static("secret"));
        assert!(is_authorized(&headers, Some("secret")));
        assert!(!is_authorized(&headers, Some("other")));
        assert!(!is_authorized(&headers, None));

        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_static("secret"));
        assert!(is_authorized(&headers, Some("secret")));
    }
}
