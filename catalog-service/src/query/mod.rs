pub mod filter;

pub use filter::{to_query, Condition, FilterTree, Predicate};
