pub mod database;
pub mod items;
pub mod metrics;
pub mod sources;
pub mod store;
pub mod streams;

pub use database::MongoDb;
pub use metrics::{get_metrics, init_metrics};
pub use store::{DocumentStore, MemoryStore, UpdateSpec};
