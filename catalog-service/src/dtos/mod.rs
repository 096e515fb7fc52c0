pub mod catalog;
pub mod stream_update;

pub use catalog::{ContentItemResponse, SourceResponse, StreamResponse};
pub use stream_update::StreamUpdateRequest;
