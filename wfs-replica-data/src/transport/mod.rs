//! HTTP access and retry classification.
//!
//! [`HttpSource`] is the seam between the client and the network: one call is
//! one round trip. [`RetryingTransport`] wraps a source and applies the
//! backoff policy to transient failures.

mod error;
mod retry;
mod source;

pub use error::TransportError;
pub use retry::{Disposition, RetryError, RetryingTransport, classify_status, retry_with};
pub use source::{DEFAULT_USER_AGENT, HttpReply, HttpSource, ReqwestSource};
