pub mod content_item;
pub mod security;
pub mod source;
pub mod stream;
pub mod user;

pub use content_item::{AssetType, ContentItem, PreviewAsset};
pub use security::SecurityDescriptor;
pub use source::Source;
pub use stream::{FieldUpdate, ScanState, Stream, StreamUpdate};
pub use user::User;
