//! Request body of `PUT /stream/:key`.
//!
//! Each field distinguishes "absent" (leave unchanged) from explicit `null`
//! (clear the column) from a value.

use crate::models::{FieldUpdate, ScanState, StreamUpdate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use service_core::error::AppError;
use validator::{Validate, ValidationError, ValidationErrors};

const MAX_TEXT_LEN: usize = 512;

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamUpdateRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub state: Option<Option<ScanState>>,
    #[serde(default, deserialize_with = "double_option")]
    pub display_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub external_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub external_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub enabled: Option<Option<bool>>,
    #[serde(default, deserialize_with = "double_option")]
    pub scan_cursor: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub scanned_at: Option<Option<DateTime<Utc>>>,
}

fn check_text(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: &Option<Option<String>>,
) {
    if let Some(Some(text)) = value {
        let len = text.chars().count();
        if len == 0 || len > MAX_TEXT_LEN {
            let mut error = ValidationError::new("length");
            error.add_param("min".into(), &1);
            error.add_param("max".into(), &MAX_TEXT_LEN);
            errors.add(field, error);
        }
    }
}

impl Validate for StreamUpdateRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_text(&mut errors, "displayName", &self.display_name);
        check_text(&mut errors, "externalType", &self.external_type);
        check_text(&mut errors, "externalId", &self.external_id);
        check_text(&mut errors, "scanCursor", &self.scan_cursor);

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl StreamUpdateRequest {
    /// Validate and convert into a store update.
    pub fn into_update(self) -> Result<StreamUpdate, AppError> {
        self.validate()?;

        let enabled = match self.enabled {
            Some(None) => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "enabled cannot be null"
                )))
            }
            other => FieldUpdate::from(other),
        };

        Ok(StreamUpdate {
            state: self.state.into(),
            display_name: self.display_name.into(),
            external_type: self.external_type.into(),
            external_id: self.external_id.into(),
            enabled,
            scan_cursor: self.scan_cursor.into(),
            scanned_at: self.scanned_at.into(),
        })
    }
}
