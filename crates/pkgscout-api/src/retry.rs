// Retry logic with rate-limit awareness
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ApiError, Result};
use crate::http::{HttpError, HttpResponse};

/// Wait between attempts when the server doesn't tell us otherwise
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Anything below 1 counts as 1.
    pub max_attempts: u32,
    pub default_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            default_backoff: DEFAULT_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, default_backoff: Duration) -> Self {
        Self {
            max_attempts,
            default_backoff,
        }
    }
}

/// Run `attempt` until it yields a 2xx response, a terminal error, or the
/// attempt budget runs out.
///
/// Every wait (and every in-flight attempt) races `cancel`, so a cancelled
/// run gets `ApiError::Cancelled` back promptly instead of a retry error.
pub async fn execute_with_retry<F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut attempt: F,
) -> Result<HttpResponse>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<HttpResponse, HttpError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        attempts += 1;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ApiError::Cancelled),
            outcome = attempt() => outcome,
        };

        let (err, wait) = match outcome {
            Ok(resp) if resp.is_success() => {
                if attempts > 1 {
                    debug!("Request succeeded after {} attempts", attempts);
                }
                return Ok(resp);
            }
            // The response is consumed here; its connection is gone before we sleep
            Ok(resp) => classify_status(resp, policy.default_backoff),
            Err(e) => classify_transport(&e, policy.default_backoff),
        };

        let Some(wait) = wait else {
            return Err(err);
        };

        if attempts >= max_attempts {
            warn!("Request failed after {} attempts: {}", attempts, err);
            return Err(ApiError::RetryLimitExceeded {
                attempts,
                last: Box::new(err),
            });
        }

        warn!(
            "Request failed (attempt {}/{}): {}. Retrying in {}ms...",
            attempts,
            max_attempts,
            err,
            wait.as_millis()
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ApiError::Cancelled),
            _ = sleep(wait) => {}
        }
    }
}

/// Turn a non-2xx response into an error plus an optional retry delay
fn classify_status(resp: HttpResponse, default_backoff: Duration) -> (ApiError, Option<Duration>) {
    let status = resp.status;
    if status == 429 {
        let retry_after_secs = retry_after(&resp);
        let wait = retry_after_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(default_backoff);
        return (ApiError::RateLimited { retry_after_secs }, Some(wait));
    }
    if status >= 500 {
        return (ApiError::Server { status }, Some(default_backoff));
    }
    (ApiError::Client { status }, None)
}

fn classify_transport(err: &HttpError, default_backoff: Duration) -> (ApiError, Option<Duration>) {
    let msg = err.message().to_string();
    if is_non_retryable_transport(&msg) {
        (ApiError::NonRetryableTransport(msg), None)
    } else {
        (ApiError::Transport(msg), Some(default_backoff))
    }
}

/// Redirect loops, bad schemes and untrusted certs won't fix themselves
pub fn is_non_retryable_transport(msg: &str) -> bool {
    let msg = msg.to_lowercase();

    let redirect_loop = msg.contains("too many redirects")
        || (msg.contains("stopped after") && msg.contains("redirects"));
    let bad_scheme =
        msg.contains("unsupported protocol scheme") || msg.contains("scheme is not allowed");
    let bad_cert = msg.contains("certificate is not trusted")
        || msg.contains("untrusted certificate")
        || msg.contains("invalid peer certificate");

    redirect_loop || bad_scheme || bad_cert
}

/// `Retry-After` as whole seconds. HTTP-date values aren't supported.
pub fn retry_after(resp: &HttpResponse) -> Option<u64> {
    resp.header("Retry-After")?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Instant;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_retry_succeeds_immediately() {
        let call_count = AtomicU32::new(0);
        let cancel = CancellationToken::new();

        let result = execute_with_retry(&fast_policy(3), &cancel, || async {
            call_count.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::new(200).with_body("ok"))
        })
        .await;

        assert_eq!(result.unwrap().text(), "ok");
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let call_count = AtomicU32::new(0);
        let cancel = CancellationToken::new();

        let result = execute_with_retry(&fast_policy(3), &cancel, || async {
            let count = call_count.fetch_add(1, Ordering::SeqCst) + 1;
            if count < 3 {
                Err(HttpError::Transport("connection reset by peer".into()))
            } else {
                Ok(HttpResponse::new(200))
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_server_errors_exhaust_budget() {
        let call_count = AtomicU32::new(0);
        let cancel = CancellationToken::new();

        let result = execute_with_retry(&fast_policy(3), &cancel, || async {
            call_count.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::new(503))
        })
        .await;

        assert_eq!(call_count.load(Ordering::SeqCst), 3);
        match result {
            Err(ApiError::RetryLimitExceeded { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, ApiError::Server { status: 503 }));
            }
            other => panic!("expected retry limit error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let call_count = AtomicU32::new(0);
        let cancel = CancellationToken::new();

        let result = execute_with_retry(&fast_policy(3), &cancel, || async {
            call_count.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::new(404))
        })
        .await;

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        let err = result.unwrap_err();
        assert!(matches!(err, ApiError::Client { status: 404 }));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_redirect_loop_fails_fast() {
        let call_count = AtomicU32::new(0);
        let cancel = CancellationToken::new();

        let result = execute_with_retry(&fast_policy(5), &cancel, || async {
            call_count.fetch_add(1, Ordering::SeqCst);
            Err(HttpError::Transport(
                "error following redirect: stopped after 10 redirects".into(),
            ))
        })
        .await;

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ApiError::NonRetryableTransport(_))));
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let call_count = AtomicU32::new(0);
        let cancel = CancellationToken::new();

        let result = execute_with_retry(&fast_policy(0), &cancel, || async {
            call_count.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::new(500))
        })
        .await;

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result,
            Err(ApiError::RetryLimitExceeded { attempts: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_honours_retry_after() {
        let cancel = CancellationToken::new();
        let policy = RetryPolicy::new(2, Duration::from_secs(30));
        let seen = Mutex::new(Vec::new());

        let result = execute_with_retry(&policy, &cancel, || async {
            let mut seen = seen.lock().unwrap();
            seen.push(Instant::now());
            if seen.len() == 1 {
                Ok(HttpResponse::new(429).with_header("Retry-After", "1"))
            } else {
                Ok(HttpResponse::new(200))
            }
        })
        .await;

        assert!(result.is_ok());
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let gap = seen[1] - seen[0];
        // 1s from the header, nowhere near the 30s default
        assert!(gap >= Duration::from_millis(900));
        assert!(gap < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_cancel_during_backoff_returns_promptly() {
        let cancel = CancellationToken::new();
        let policy = RetryPolicy::new(3, Duration::from_secs(60));

        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            execute_with_retry(&policy, &cancel, || async { Ok(HttpResponse::new(503)) }),
        )
        .await
        .expect("retry loop ignored cancellation");

        assert!(matches!(result, Err(ApiError::Cancelled)));
    }

    #[tokio::test]
    async fn test_already_cancelled_skips_attempt() {
        let call_count = AtomicU32::new(0);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = execute_with_retry(&fast_policy(3), &cancel, || async {
            call_count.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::new(200))
        })
        .await;

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(call_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_non_retryable_messages() {
        assert!(is_non_retryable_transport(
            "Get \"x\": stopped after 10 redirects"
        ));
        assert!(is_non_retryable_transport(
            "error following redirect for url: too many redirects"
        ));
        assert!(is_non_retryable_transport(
            "unsupported protocol scheme \"ftp\""
        ));
        assert!(is_non_retryable_transport(
            "builder error: URL scheme is not allowed"
        ));
        assert!(is_non_retryable_transport(
            "error sending request: invalid peer certificate: UnknownIssuer"
        ));

        assert!(!is_non_retryable_transport("connection refused"));
        assert!(!is_non_retryable_transport("operation timed out"));
    }

    #[test]
    fn test_retry_after_parsing() {
        assert_eq!(
            retry_after(&HttpResponse::new(429).with_header("Retry-After", "12")),
            Some(12)
        );
        assert_eq!(
            retry_after(&HttpResponse::new(429).with_header("Retry-After", "soon")),
            None
        );
        assert_eq!(retry_after(&HttpResponse::new(429)), None);
    }

    #[test]
    fn test_status_classification() {
        let backoff = Duration::from_millis(500);

        let (err, wait) = classify_status(HttpResponse::new(429), backoff);
        assert!(matches!(err, ApiError::RateLimited { retry_after_secs: None }));
        assert_eq!(wait, Some(backoff));

        let (err, wait) = classify_status(
            HttpResponse::new(429).with_header("Retry-After", "3"),
            backoff,
        );
        assert!(matches!(
            err,
            ApiError::RateLimited {
                retry_after_secs: Some(3)
            }
        ));
        assert_eq!(wait, Some(Duration::from_secs(3)));

        let (err, wait) = classify_status(HttpResponse::new(502), backoff);
        assert!(matches!(err, ApiError::Server { status: 502 }));
        assert_eq!(wait, Some(backoff));

        let (err, wait) = classify_status(HttpResponse::new(403), backoff);
        assert!(matches!(err, ApiError::Client { status: 403 }));
        assert_eq!(wait, None);
    }
}
