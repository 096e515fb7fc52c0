use crate::models::SecurityDescriptor;
use crate::security::registry::{Entity, EntityType};
use crate::services::store::UpdateSpec;
use chrono::{DateTime, Utc};
use mongodb::bson::{self, Bson, Document};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scan lifecycle of a stream.
///
/// A stream with no recorded state has never been scanned. Any state may be
/// written directly; only the `* -> ScanQueued` transition is event driven.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanState {
    ScanQueued,
    ScanRequested,
    ScanComplete,
}

impl ScanState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanState::ScanQueued => "SCAN_QUEUED",
            ScanState::ScanRequested => "SCAN_REQUESTED",
            ScanState::ScanComplete => "SCAN_COMPLETE",
        }
    }
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub source_id: String,
    pub security: SecurityDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ScanState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_cursor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanned_at: Option<bson::DateTime>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub deleted: bool,
    pub updated_at: bson::DateTime,
}

impl Stream {
    pub fn new(
        source_id: impl Into<String>,
        name: impl Into<String>,
        security: SecurityDescriptor,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            source_id: source_id.into(),
            security,
            state: None,
            display_name: None,
            external_type: None,
            external_id: None,
            scan_cursor: None,
            scanned_at: None,
            enabled: true,
            deleted: false,
            updated_at: bson::DateTime::now(),
        }
    }

    pub fn scanned_at_utc(&self) -> Option<DateTime<Utc>> {
        self.scanned_at.map(|at| at.to_chrono())
    }
}

impl Entity for Stream {
    const ENTITY: EntityType = EntityType::Stream;
    const COLLECTION: &'static str = "streams";
    const PROTECTED: bool = true;
}

/// One column of a partial update.
///
/// `Unchanged` leaves the stored value alone, which is distinct from
/// `Cleared` (remove the value) and from `Set` with an empty value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate<T> {
    Unchanged,
    Set(T),
    Cleared,
}

impl<T> Default for FieldUpdate<T> {
    fn default() -> Self {
        FieldUpdate::Unchanged
    }
}

impl<T> FieldUpdate<T> {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, FieldUpdate::Unchanged)
    }
}

/// `None` = absent, `Some(None)` = explicit null, `Some(Some(v))` = value.
impl<T> From<Option<Option<T>>> for FieldUpdate<T> {
    fn from(value: Option<Option<T>>) -> Self {
        match value {
            None => FieldUpdate::Unchanged,
            Some(None) => FieldUpdate::Cleared,
            Some(Some(v)) => FieldUpdate::Set(v),
        }
    }
}

/// Partial update of the scan-related columns of a stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamUpdate {
    pub state: FieldUpdate<ScanState>,
    pub display_name: FieldUpdate<String>,
    pub external_type: FieldUpdate<String>,
    pub external_id: FieldUpdate<String>,
    pub enabled: FieldUpdate<bool>,
    pub scan_cursor: FieldUpdate<String>,
    pub scanned_at: FieldUpdate<DateTime<Utc>>,
}

impl StreamUpdate {
    /// The update written when a scan-request event is consumed.
    pub fn queued() -> Self {
        Self {
            state: FieldUpdate::Set(ScanState::ScanQueued),
            ..Default::default()
        }
    }

    /// Build the store update. `updatedAt` is always stamped with `now`.
    pub fn to_update_spec(&self, now: DateTime<Utc>) -> UpdateSpec {
        let mut set = Document::new();
        let mut unset = Vec::new();

        apply(&mut set, &mut unset, "state", &self.state, |s| {
            Bson::String(s.as_str().to_string())
        });
        apply(&mut set, &mut unset, "displayName", &self.display_name, |v| {
            Bson::String(v.clone())
        });
        apply(&mut set, &mut unset, "externalType", &self.external_type, |v| {
            Bson::String(v.clone())
        });
        apply(&mut set, &mut unset, "externalId", &self.external_id, |v| {
            Bson::String(v.clone())
        });
        apply(&mut set, &mut unset, "enabled", &self.enabled, |v| Bson::Boolean(*v));
        apply(&mut set, &mut unset, "scanCursor", &self.scan_cursor, |v| {
            Bson::String(v.clone())
        });
        apply(&mut set, &mut unset, "scannedAt", &self.scanned_at, |v| {
            Bson::DateTime(bson::DateTime::from_chrono(*v))
        });

        set.insert("updatedAt", Bson::DateTime(bson::DateTime::from_chrono(now)));

        UpdateSpec { set, unset }
    }
}

fn apply<T>(
    set: &mut Document,
    unset: &mut Vec<String>,
    field: &str,
    update: &FieldUpdate<T>,
    to_bson: impl Fn(&T) -> Bson,
) {
    match update {
        FieldUpdate::Unchanged => {}
        FieldUpdate::Set(value) => {
            set.insert(field, to_bson(value));
        }
        FieldUpdate::Cleared => unset.push(field.to_string()),
    }
}
