//! Per-request access context.
//!
//! The caller is named by the `x-user` header. The header value is looked up
//! in the user registry and the resulting [`AccessContext`] travels with the
//! request into every secured read.

use crate::models::User;
use crate::query::{FilterTree, Predicate};
use crate::security::registry::Entity;
use crate::services::store::DocumentStore;
use crate::startup::AppState;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use mongodb::bson;
use service_core::error::AppError;

pub const USER_HEADER: &str = "x-user";

/// Identity and privilege of whoever is performing an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessContext {
    pub user: Option<User>,
    pub privileged: bool,
}

impl AccessContext {
    /// Context for internal work such as event handling and scheduled jobs.
    pub fn system() -> Self {
        Self {
            user: None,
            privileged: true,
        }
    }

    pub fn for_user(user: &User) -> Self {
        Self {
            user: Some(user.clone()),
            privileged: user.privileged,
        }
    }

    pub fn user_name(&self) -> &str {
        self.user.as_ref().map_or("system", |u| u.name.as_str())
    }
}

/// Resolve a user claim to an access context.
///
/// A missing claim or a name that is not registered is `Unauthenticated`;
/// a store failure is propagated as is.
pub async fn resolve(
    store: &dyn DocumentStore,
    claim: Option<&str>,
) -> Result<AccessContext, AppError> {
    let name = claim
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::Unauthenticated(anyhow::anyhow!("No user specified")))?;

    let filter = FilterTree::field(Predicate::eq("name", name));
    let document = store
        .find_one(User::COLLECTION, &filter)
        .await?
        .ok_or_else(|| {
            tracing::debug!(user = %name, "Rejecting request for unknown user");
            AppError::Unauthenticated(anyhow::anyhow!("User not found"))
        })?;

    let user: User = bson::from_document(document)?;
    Ok(AccessContext::for_user(&user))
}

#[async_trait]
impl FromRequestParts<AppState> for AccessContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claim = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok());

        let context = resolve(state.store.as_ref(), claim).await?;

        let span = tracing::Span::current();
        span.record("user", context.user_name());
        span.record("privileged", context.privileged);

        Ok(context)
    }
}
