/// Patient reply parsing
///
/// Replies arrive through the WhatsApp webhook as free text. Only a short,
/// exact vocabulary is understood; anything else is ignored so a chatty
/// patient never cancels an appointment by accident.

use crate::models::appointment::AppointmentStatus;

const CONFIRM_WORDS: [&str; 6] = ["1", "sim", "confirmo", "ok", "yes", "s"];
const CANCEL_WORDS: [&str; 7] = ["2", "não", "nao", "cancelo", "cancelar", "cancel", "n"];

const WHATSAPP_JID_SUFFIX: &str = "@s.whatsapp.net";

/// What the patient meant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyIntent {
    Confirmed,
    Canceled,
}

impl ReplyIntent {
    /// Appointment status the reply moves the appointment to
    pub fn target_status(&self) -> AppointmentStatus {
        match self {
            ReplyIntent::Confirmed => AppointmentStatus::Confirmed,
            ReplyIntent::Canceled => AppointmentStatus::Canceled,
        }
    }
}

/// Parses a reply by exact match after trimming and lowercasing
///
/// # Example
///
/// ```
/// use confirmaai_shared::replies::{parse_response, ReplyIntent};
///
/// assert_eq!(parse_response("  SIM "), Some(ReplyIntent::Confirmed));
/// assert_eq!(parse_response("Não"), Some(ReplyIntent::Canceled));
/// assert_eq!(parse_response("sim, obrigado"), None);
/// ```
pub fn parse_response(text: &str) -> Option<ReplyIntent> {
    let normalized = text.trim().to_lowercase();

    if CONFIRM_WORDS.contains(&normalized.as_str()) {
        Some(ReplyIntent::Confirmed)
    } else if CANCEL_WORDS.contains(&normalized.as_str()) {
        Some(ReplyIntent::Canceled)
    } else {
        None
    }
}

/// Turns a WhatsApp JID (`5511999998888@s.whatsapp.net`) into `+5511999998888`
pub fn phone_from_remote_jid(jid: &str) -> String {
    let number = jid.trim().trim_end_matches(WHATSAPP_JID_SUFFIX);

    if number.starts_with('+') {
        number.to_string()
    } else {
        format!("+{}", number)
    }
}
