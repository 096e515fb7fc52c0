pub mod context;
pub mod interceptor;
pub mod registry;
pub mod secured;

pub use context::{AccessContext, USER_HEADER};
pub use interceptor::{secure_filter, with_security, ReadOperation};
pub use registry::{Entity, EntityType, SchemaError, SchemaRegistry};
pub use secured::SecuredStore;
