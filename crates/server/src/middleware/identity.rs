//! Actor extraction from identity headers.
//!
//! Authentication happens upstream. The fronting identity provider forwards
//! the authenticated user as trusted headers:
//!
//! - `x-actor-id` - numeric user id (required)
//! - `x-actor-superuser` - `true`/`1` for superusers
//! - `x-actor-staff` - `true`/`1` for holders of the ticket-management permission

use axum::{extract::FromRequestParts, http::request::Parts};

use helpdesk_core::{Actor, UserId};

use crate::error::{AppError, set_sentry_user};

/// Header carrying the user id.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
/// Header carrying the superuser flag.
pub const ACTOR_SUPERUSER_HEADER: &str = "x-actor-superuser";
/// Header carrying the staff permission flag.
pub const ACTOR_STAFF_HEADER: &str = "x-actor-staff";

/// Extractor that requires an identified actor.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentActor(actor): CurrentActor) -> impl IntoResponse {
///     format!("Hello, user {}!", actor.id)
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CurrentActor(pub Actor);

impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, ACTOR_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized(format!("missing {ACTOR_ID_HEADER}")))?
            .parse::<i32>()
            .map_err(|_| AppError::Unauthorized(format!("malformed {ACTOR_ID_HEADER}")))?;

        let actor = Actor {
            id: UserId::new(id),
            is_superuser: flag(parts, ACTOR_SUPERUSER_HEADER),
            has_staff_permission: flag(parts, ACTOR_STAFF_HEADER),
        };

        tracing::Span::current().record("actor", id);
        set_sentry_user(&actor.id);

        Ok(Self(actor))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
}

fn flag(parts: &Parts, name: &str) -> bool {
    header(parts, name).is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(request: Request<()>) -> Result<CurrentActor, AppError> {
        let (mut parts, ()) = request.into_parts();
        CurrentActor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_extracts_flags() {
        let request = Request::builder()
            .header(ACTOR_ID_HEADER, "42")
            .header(ACTOR_STAFF_HEADER, "TRUE")
            .body(())
            .unwrap();
        let CurrentActor(actor) = extract(request).await.unwrap();
        assert_eq!(actor, Actor::staff(UserId::new(42)));
    }

    #[tokio::test]
    async fn test_missing_or_malformed_id_rejected() {
        let request = Request::builder().body(()).unwrap();
        assert!(matches!(extract(request).await, Err(AppError::Unauthorized(_))));

        let request = Request::builder()
            .header(ACTOR_ID_HEADER, "bob")
            .body(())
            .unwrap();
        assert!(matches!(extract(request).await, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_unknown_flag_values_are_false() {
        let request = Request::builder()
            .header(ACTOR_ID_HEADER, "7")
            .header(ACTOR_SUPERUSER_HEADER, "yes please")
            .body(())
            .unwrap();
        let CurrentActor(actor) = extract(request).await.unwrap();
        assert!(!actor.is_it_staff());
    }
}
