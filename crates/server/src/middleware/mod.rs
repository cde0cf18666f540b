//! HTTP middleware and extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//!
//! Handlers obtain the acting user through the [`CurrentActor`] extractor.

pub mod identity;
pub mod request_id;

pub use identity::{ACTOR_ID_HEADER, ACTOR_STAFF_HEADER, ACTOR_SUPERUSER_HEADER, CurrentActor};
pub use request_id::request_id_middleware;
