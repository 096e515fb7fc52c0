//! Row-level security for read operations.
//!
//! For a non-privileged caller reading a protected model, the caller's filter
//! tree is rewritten to `existing AND security.protected == false`. The
//! rewrite never distributes the security predicate into OR or NOT branches:
//! those nodes are wrapped whole.

use crate::query::{FilterTree, Predicate};
use crate::security::registry::{EntityType, SchemaError, SchemaRegistry};
use crate::services::metrics::SECURITY_FILTER_APPLIED;

pub const SECURITY_FIELD: &str = "security.protected";

/// Read operations subject to interception. Writes are never rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOperation {
    FindMany,
    FindUnique,
    FindUniqueOrFail,
}

impl ReadOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadOperation::FindMany => "findMany",
            ReadOperation::FindUnique => "findUnique",
            ReadOperation::FindUniqueOrFail => "findUniqueOrThrow",
        }
    }
}

pub fn security_predicate() -> Predicate {
    Predicate::eq(SECURITY_FIELD, false)
}

/// Combine `filter` with the security predicate so the result is always
/// `filter AND security`.
pub fn with_security(filter: Option<FilterTree>) -> FilterTree {
    match filter {
        None => FilterTree::field(security_predicate()),
        Some(FilterTree::Fields(mut predicates)) => {
            predicates.push(security_predicate());
            FilterTree::Fields(predicates)
        }
        Some(FilterTree::And(mut children)) => {
            children.push(FilterTree::field(security_predicate()));
            FilterTree::And(children)
        }
        Some(node @ (FilterTree::Or(_) | FilterTree::Not(_))) => {
            FilterTree::And(vec![node, FilterTree::field(security_predicate())])
        }
    }
}

/// Decide whether `filter` needs the security predicate and rewrite it if so.
///
/// Privileged callers and unprotected models get `filter` back unchanged.
/// An entity missing from the registry is a [`SchemaError`] regardless of
/// privilege.
pub fn secure_filter(
    registry: &SchemaRegistry,
    entity: EntityType,
    operation: ReadOperation,
    filter: Option<FilterTree>,
    privileged: bool,
) -> Result<Option<FilterTree>, SchemaError> {
    if !registry.is_protected(entity)? {
        tracing::debug!(
            entity = %entity,
            operation = operation.as_str(),
            "Not extending query because model is not protected"
        );
        return Ok(filter);
    }

    if privileged {
        tracing::debug!(
            entity = %entity,
            operation = operation.as_str(),
            "Not extending query with security filter because user is privileged"
        );
        return Ok(filter);
    }

    tracing::debug!(
        entity = %entity,
        operation = operation.as_str(),
        "Extending query with security filter"
    );
    let rewritten = with_security(filter);
    tracing::trace!(filter = ?rewritten, "Rewritten filter");
    metrics::counter!(SECURITY_FILTER_APPLIED, "entity" => entity.name()).increment(1);

    Ok(Some(rewritten))
}
