//! Bounded retries for listing pages and media streams
//!
//! [`fetch_with_retry`] re-runs a request while it keeps failing with a transient
//! error (timeouts, refused connections, HTTP 5xx/408/429). The pause between
//! requests starts at `initial_delay`, is multiplied by `backoff_multiplier` after
//! each retry and is capped at `max_delay`; with `jitter` on, each pause is
//! stretched by a random factor in `[1, 2]` so parallel stripes do not hit the
//! API in lockstep. A cancelled run stops waiting immediately.
//!
//! # Example
//!
//! ```no_run
//! use vsco_dl::config::RetryConfig;
//! use vsco_dl::retry::fetch_with_retry;
//! use vsco_dl::{ApiClient, Config, RemoteSource};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> vsco_dl::Result<()> {
//! let config = Config::default();
//! let client = ApiClient::new(&config)?;
//! let cancel = CancellationToken::new();
//! let query = [("site_id", "123".to_string()), ("page", "1".to_string())];
//!
//! let page = fetch_with_retry(&config.retry, &cancel, || {
//!     client.fetch_json("http://vsco.co/api/2.0/medias", &query)
//! })
//! .await?;
//! println!("{page}");
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::config::RetryConfig;
use crate::error::Error;

/// Whether a failed request is worth repeating
pub trait IsRetryable {
    /// `true` for failures that may clear up on their own (timeouts, overloaded server)
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => e.is_timeout() || e.is_connect() || e.is_body(),
            Error::Http { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            Error::Io(e) | Error::Filesystem { source: e, .. } => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::UnexpectedEof
            ),
            Error::MalformedResponse { .. }
            | Error::Serialization(_)
            | Error::Config { .. }
            | Error::InvalidUrl(_)
            | Error::Cancelled
            | Error::Other(_) => false,
        }
    }
}

/// Pause schedule between successive requests
#[derive(Debug)]
struct Backoff {
    next: Duration,
    max: Duration,
    multiplier: f64,
    jitter: bool,
}

impl Backoff {
    fn new(config: &RetryConfig) -> Self {
        Self {
            next: config.initial_delay.min(config.max_delay),
            max: config.max_delay,
            multiplier: config.backoff_multiplier,
            jitter: config.jitter,
        }
    }

    /// The pause to take now; advances the schedule
    fn pause(&mut self) -> Duration {
        let current = self.next;
        // An unusable multiplier (negative, NaN, overflowing) pins the schedule at the cap
        self.next = Duration::try_from_secs_f64(current.as_secs_f64() * self.multiplier)
            .map_or(self.max, |grown| grown.min(self.max));
        if self.jitter {
            add_jitter(current)
        } else {
            current
        }
    }
}

/// Run `request` until it succeeds, fails permanently, or runs out of retries
///
/// `config.max_attempts` is the number of retries, so `request` is called at most
/// `max_attempts + 1` times. The error handed back is always the last one seen,
/// including when `cancel` fires during a pause.
pub async fn fetch_with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut request: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut backoff = Backoff::new(config);
    let mut retries = 0;

    loop {
        let error = match request().await {
            Ok(value) => {
                if retries > 0 {
                    tracing::info!(retries, "Request succeeded after retrying");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !error.is_retryable() {
            tracing::debug!(error = %error, "Request failed permanently");
            return Err(error);
        }
        if retries >= config.max_attempts {
            tracing::warn!(error = %error, retries, "Request still failing, giving up");
            return Err(error);
        }

        retries += 1;
        let pause = backoff.pause();
        tracing::warn!(
            error = %error,
            retry = retries,
            max_retries = config.max_attempts,
            pause_ms = pause.as_millis(),
            "Request failed, retrying"
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(error = %error, "Run cancelled during retry pause");
                return Err(error);
            }
            _ = tokio::time::sleep(pause) => {}
        }
    }
}

/// Stretch `delay` by a random factor in `[1, 2]`
fn add_jitter(delay: Duration) -> Duration {
    let factor: f64 = rand::thread_rng().gen_range(1.0..=2.0);
    delay.mul_f64(factor)
}
