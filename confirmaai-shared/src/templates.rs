/// WhatsApp message templates
///
/// Clinics write their own confirmation and reminder texts using four
/// placeholders:
///
/// | Placeholder | Replaced with                                   |
/// |-------------|-------------------------------------------------|
/// | `{nome}`    | patient name                                    |
/// | `{data}`    | long pt-BR date, e.g. `terça-feira, 17 de fevereiro` |
/// | `{hora}`    | 24-hour time, e.g. `14:30`                      |
/// | `{clinica}` | clinic name                                     |
///
/// # Example
///
/// ```
/// use confirmaai_shared::templates::{format_message, MessageData};
///
/// let text = format_message(
///     "Olá {nome}, até {data} às {hora}!",
///     &MessageData {
///         patient_name: "Maria".into(),
///         date: "terça-feira, 17 de fevereiro".into(),
///         time: "14:30".into(),
///         clinic_name: "Clínica Sorriso".into(),
///     },
/// );
/// assert_eq!(text, "Olá Maria, até terça-feira, 17 de fevereiro às 14:30!");
/// ```

use chrono::{DateTime, Datelike, TimeZone, Timelike};

/// Default confirmation text for new clinics
pub const DEFAULT_CONFIRMATION_MESSAGE: &str = "Olá {nome}! Você tem consulta agendada em {clinica} no dia {data} às {hora}. Confirma sua presença? Responda SIM ou NÃO.";

/// Default reminder text for new clinics
pub const DEFAULT_REMINDER_MESSAGE: &str = "Oi {nome}! Ainda não recebemos sua confirmação para a consulta de amanhã ({data} às {hora}). Confirma sua presença? Responda SIM ou NÃO.";

const WEEKDAYS: [&str; 7] = [
    "domingo",
    "segunda-feira",
    "terça-feira",
    "quarta-feira",
    "quinta-feira",
    "sexta-feira",
    "sábado",
];

const MONTHS: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

/// Values substituted into a template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageData {
    pub patient_name: String,
    pub date: String,
    pub time: String,
    pub clinic_name: String,
}

impl MessageData {
    /// Builds the substitution values for an appointment at `at`
    ///
    /// `at` should already be in the clinic's timezone.
    pub fn for_appointment<Tz: TimeZone>(
        patient_name: &str,
        clinic_name: &str,
        at: &DateTime<Tz>,
    ) -> Self {
        Self {
            patient_name: patient_name.to_string(),
            date: format_appointment_date(at),
            time: format_appointment_time(at),
            clinic_name: clinic_name.to_string(),
        }
    }
}

/// Replaces every placeholder occurrence; unknown placeholders stay as-is
pub fn format_message(template: &str, data: &MessageData) -> String {
    template
        .replace("{nome}", &data.patient_name)
        .replace("{data}", &data.date)
        .replace("{hora}", &data.time)
        .replace("{clinica}", &data.clinic_name)
}

/// Long pt-BR date: `<weekday>, <day> de <month>`
pub fn format_appointment_date<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    let weekday = WEEKDAYS[at.weekday().num_days_from_sunday() as usize];
    let month = MONTHS[at.month0() as usize];

    format!("{}, {} de {}", weekday, at.day(), month)
}

/// Zero-padded 24-hour `HH:mm`
pub fn format_appointment_time<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    format!("{:02}:{:02}", at.hour(), at.minute())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn brasilia(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
        FixedOffset::west_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
    }

    fn sample() -> MessageData {
        MessageData {
            patient_name: "João Silva".to_string(),
            date: "terça-feira, 17 de fevereiro".to_string(),
            time: "14:30".to_string(),
            clinic_name: "Clínica Saúde".to_string(),
        }
    }

    #[test]
    fn test_format_message_replaces_all_placeholders() {
        let text = format_message(DEFAULT_CONFIRMATION_MESSAGE, &sample());

        assert_eq!(
            text,
            "Olá João Silva! Você tem consulta agendada em Clínica Saúde no dia terça-feira, 17 de fevereiro às 14:30. Confirma sua presença? Responda SIM ou NÃO."
        );
    }

    #[test]
    fn test_format_message_repeated_placeholder() {
        assert_eq!(
            format_message("{nome}, {nome}!", &sample()),
            "João Silva, João Silva!"
        );
    }

    #[test]
    fn test_format_message_keeps_unknown_placeholders() {
        assert_eq!(
            format_message("{nome} {telefone}", &sample()),
            "João Silva {telefone}"
        );
    }

    #[test]
    fn test_format_message_empty_values() {
        assert_eq!(
            format_message("[{nome}][{clinica}]", &MessageData::default()),
            "[][]"
        );
    }

    #[test]
    fn test_format_appointment_date() {
        assert_eq!(
            format_appointment_date(&brasilia(2026, 2, 17, 14, 30)),
            "terça-feira, 17 de fevereiro"
        );
        assert_eq!(
            format_appointment_date(&brasilia(2026, 1, 1, 9, 0)),
            "quinta-feira, 1 de janeiro"
        );
        assert_eq!(
            format_appointment_date(&brasilia(2025, 12, 31, 18, 0)),
            "quarta-feira, 31 de dezembro"
        );
        assert_eq!(
            format_appointment_date(&brasilia(2026, 3, 7, 8, 0)),
            "sábado, 7 de março"
        );
    }

    #[test]
    fn test_format_appointment_time_is_zero_padded() {
        assert_eq!(format_appointment_time(&brasilia(2026, 2, 17, 9, 5)), "09:05");
        assert_eq!(format_appointment_time(&brasilia(2026, 2, 17, 23, 59)), "23:59");
    }

    #[test]
    fn test_for_appointment_uses_given_timezone() {
        // 02:00 UTC on the 18th is 23:00 on the 17th in Brasília
        let utc = Utc.with_ymd_and_hms(2026, 2, 18, 2, 0, 0).unwrap();
        let local = utc.with_timezone(&FixedOffset::west_opt(3 * 3600).unwrap());

        let data = MessageData::for_appointment("Ana", "Clínica", &local);
        assert_eq!(data.date, "terça-feira, 17 de fevereiro");
        assert_eq!(data.time, "23:00");
    }
}
