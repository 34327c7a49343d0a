//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (`http_request` span)
//! 3. Request ID (record on span, echo on response)
//! 4. Security headers
//! 5. Timeout body (turn a bare 408 into a JSON error)
//! 6. `TimeoutLayer` (per-request deadline)

pub mod request_id;
pub mod security_headers;
pub mod timeout;

pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use timeout::timeout_body_middleware;
