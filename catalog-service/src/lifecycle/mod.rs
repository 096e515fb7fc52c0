pub mod scan_request;
pub mod staleness;

pub use scan_request::{
    ScanLifecycle, ScanRequestEvent, SCAN_QUEUE_GROUP, STREAM_SCAN_REQUEST_SUBJECT,
};
pub use staleness::{is_eligible, stale_filter, STALENESS_TTL_HOURS};
