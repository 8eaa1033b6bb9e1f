/// API route handlers, one module per resource

pub mod appointments;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod patients;
pub mod settings;
pub mod webhook;

use crate::error::{validation_details, ApiError, ApiResult, ValidationErrorDetail};
use serde::{Deserialize, Deserializer};
use validator::Validate;

/// Runs the derived validations plus hand-written checks, reporting all failures together
pub(crate) fn validate_all<T: Validate>(
    req: &T,
    extra: impl IntoIterator<Item = ValidationErrorDetail>,
) -> ApiResult<()> {
    let mut details = match req.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => validation_details(&errors),
    };
    details.extend(extra);

    if details.is_empty() {
        return Ok(());
    }

    details.sort_by(|a, b| a.field.cmp(&b.field));
    Err(ApiError::ValidationError(details))
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`)
///
/// Use with `#[serde(default, deserialize_with = "nullable")]`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trims surrounding whitespace so length checks see the stored value
pub(crate) fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|s| s.trim().to_string())
}

/// `trimmed` for optional fields; needs `#[serde(default)]`
pub(crate) fn trimmed_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(|s| s.map(|s| s.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        notes: Option<Option<String>>,
    }

    #[test]
    fn test_nullable_distinguishes_null_from_absent() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.notes, None);

        let cleared: Patch = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        assert_eq!(cleared.notes, Some(None));

        let set: Patch = serde_json::from_str(r#"{"notes": "retorno"}"#).unwrap();
        assert_eq!(set.notes, Some(Some("retorno".to_string())));
    }
}
