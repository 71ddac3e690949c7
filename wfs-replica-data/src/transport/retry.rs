use std::fmt;
use std::future::Future;
use std::time::Instant;

use log::{debug, error, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use url::Url;
use wfs_replica_core::RetryPolicy;

use super::{HttpReply, HttpSource, TransportError};

/// How a failed attempt should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Worth retrying after a backoff.
    Transient,
    /// Retrying cannot succeed.
    Permanent,
}

/// Outcome of [`retry_with`] when no attempt succeeded.
#[derive(Debug)]
pub enum RetryError<E> {
    /// An attempt failed permanently.
    Permanent {
        /// Error from the failing attempt.
        last: E,
        /// Number of attempts made.
        attempts: u32,
    },
    /// Transient failures continued until the deadline.
    Exhausted {
        /// Error from the final attempt.
        last: E,
        /// Number of attempts made.
        attempts: u32,
    },
}

/// Classify an HTTP status.
///
/// `500`, `502`, `503` and `504` are transient; every other non-2xx status,
/// including `400`, `401` and `404`, is permanent.
#[must_use]
pub const fn classify_status(status: u16) -> Disposition {
    match status {
        500 | 502 | 503 | 504 => Disposition::Transient,
        _ => Disposition::Permanent,
    }
}

/// Run `operation` until it succeeds, fails permanently, or `policy`'s
/// deadline passes.
///
/// `operation` receives the 1-based attempt number; `classify` decides
/// whether each error is retried.
pub async fn retry_with<T, E, Op, Fut, C>(
    policy: &RetryPolicy,
    mut operation: Op,
    classify: C,
) -> Result<T, RetryError<E>>
where
    E: fmt::Display,
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> Disposition,
{
    let started = Instant::now();
    let mut rng = StdRng::from_entropy();
    let mut attempt: u32 = 1;
    loop {
        let err = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if classify(&err) == Disposition::Permanent {
            return Err(RetryError::Permanent {
                last: err,
                attempts: attempt,
            });
        }
        let Some(wait) = policy.next_wait(attempt, started.elapsed(), &mut rng) else {
            return Err(RetryError::Exhausted {
                last: err,
                attempts: attempt,
            });
        };
        warn!("attempt {attempt} failed: {err}; retrying in {wait:?}");
        tokio::time::sleep(wait).await;
        attempt = attempt.saturating_add(1);
    }
}

/// Why a single attempt should be retried.
#[derive(Debug)]
enum AttemptFailure {
    Status(HttpReply),
    Network(TransportError),
}

impl AttemptFailure {
    fn into_exhausted(self, url: &Url, attempts: u32) -> TransportError {
        let (status, message) = match self {
            Self::Status(reply) => (Some(reply.status), format!("status {}", reply.status)),
            Self::Network(err) => (None, err.to_string()),
        };
        TransportError::TransientService {
            url: url.to_string(),
            status,
            attempts,
            message,
        }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(reply) => write!(f, "service responded with status {}", reply.status),
            Self::Network(err) => err.fmt(f),
        }
    }
}

/// [`HttpSource`] wrapper applying a [`RetryPolicy`] to transient failures.
#[derive(Debug)]
pub struct RetryingTransport<S> {
    source: S,
    policy: RetryPolicy,
}

impl<S: HttpSource> RetryingTransport<S> {
    /// Wrap `source`.
    pub const fn new(source: S, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    /// Underlying source.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Backoff policy in use.
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch `url`, returning only 2xx replies.
    ///
    /// Statuses other than `500`, `502`, `503` and `504` fail at once.
    pub async fn get(&self, url: &Url) -> Result<HttpReply, TransportError> {
        let outcome = retry_with(
            &self.policy,
            |attempt| async move {
                debug!("GET {url} (attempt {attempt})");
                match self.source.get(url).await {
                    Ok(reply) if classify_status(reply.status) == Disposition::Transient => {
                        debug!(
                            "{url} answered {}; headers: {:?}; body: {}",
                            reply.status, reply.headers, reply.body
                        );
                        Err(AttemptFailure::Status(reply))
                    }
                    Ok(reply) => Ok(reply),
                    Err(err) => Err(AttemptFailure::Network(err)),
                }
            },
            |_| Disposition::Transient,
        )
        .await;
        let reply = match outcome {
            Ok(reply) => reply,
            Err(
                RetryError::Permanent { last, attempts } | RetryError::Exhausted { last, attempts },
            ) => return Err(last.into_exhausted(url, attempts)),
        };
        if reply.is_success() {
            return Ok(reply);
        }
        error!(
            "request to {url} failed with status {}; headers: {:?}; body: {}",
            reply.status, reply.headers, reply.body
        );
        Err(TransportError::ServiceRequest {
            url: url.to_string(),
            status: reply.status,
            body: reply.body,
        })
    }
}
