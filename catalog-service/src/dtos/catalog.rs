use crate::models::{ContentItem, PreviewAsset, ScanState, SecurityDescriptor, Source, Stream};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceResponse {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub security: SecurityDescriptor,
}

impl From<Source> for SourceResponse {
    fn from(source: Source) -> Self {
        Self {
            id: source.id,
            name: source.name,
            display_name: source.display_name,
            security: source.security,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamResponse {
    pub id: String,
    pub name: String,
    pub source_id: String,
    pub security: SecurityDescriptor,
    pub state: Option<ScanState>,
    pub display_name: Option<String>,
    pub external_type: Option<String>,
    pub external_id: Option<String>,
    pub scan_cursor: Option<String>,
    pub scanned_at: Option<String>,
    pub enabled: bool,
    pub deleted: bool,
    pub updated_at: String,
}

impl From<Stream> for StreamResponse {
    fn from(stream: Stream) -> Self {
        let scanned_at = stream.scanned_at_utc().map(|at| at.to_rfc3339());
        Self {
            id: stream.id,
            name: stream.name,
            source_id: stream.source_id,
            security: stream.security,
            state: stream.state,
            display_name: stream.display_name,
            external_type: stream.external_type,
            external_id: stream.external_id,
            scan_cursor: stream.scan_cursor,
            scanned_at,
            enabled: stream.enabled,
            deleted: stream.deleted,
            updated_at: stream.updated_at.to_chrono().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItemResponse {
    pub id: String,
    pub stream_id: String,
    pub name: String,
    pub security: SecurityDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    pub preview_assets: Vec<PreviewAsset>,
}

impl From<ContentItem> for ContentItemResponse {
    fn from(item: ContentItem) -> Self {
        Self {
            id: item.id,
            stream_id: item.stream_id,
            name: item.name,
            security: item.security,
            external_ref: item.external_ref,
            preview_assets: item.preview_assets,
        }
    }
}
