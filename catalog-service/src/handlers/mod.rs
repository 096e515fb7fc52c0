pub mod health;
pub mod items;
pub mod sources;
pub mod streams;

pub use health::{health_check, metrics_endpoint, readiness_check};
pub use items::get_item;
pub use sources::{get_source, list_source_streams, list_sources};
pub use streams::{list_stale_streams, list_stream_items, update_stream};
