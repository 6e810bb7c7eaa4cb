//! HTTP middleware for Shopdesk.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (`http_request` span with status and latency)
//! 3. Request ID (`x-request-id`, recorded on the span)
//! 4. Admin guard (only on `/api/admin/*`)

pub mod auth;
pub mod request_id;

pub use auth::{USER_ID_HEADER, require_admin, resolve_caller};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
