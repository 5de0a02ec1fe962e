use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sqlx::types::Uuid;

use crate::error::AppError;

/// Caller identity forwarded by the upstream gateway as `X-User-Id`.
/// Authentication happens before requests reach this service; ownership
/// checks against this id are composed from the `authz` predicates.
#[derive(Debug, Clone, Copy)]
pub struct ActorId(pub Uuid);

impl<S> FromRequestParts<S> for ActorId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("missing X-User-Id header".to_string()))?;
        let id = header
            .parse::<Uuid>()
            .map_err(|_| AppError::Authentication("invalid X-User-Id header".to_string()))?;
        Ok(ActorId(id))
    }
}
