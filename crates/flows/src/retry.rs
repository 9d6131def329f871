use std::time::Duration;

use flowbridge_core::{Error, Result};
use tracing::{info, warn};

/// Run `attempt` up to `attempts` times, sleeping `delay` between tries.
///
/// Validation and not-found outcomes are terminal and pass through on the
/// attempt that produced them; everything else counts as transient. Once the
/// bound is exhausted the last error surfaces as a store failure.
pub async fn with_retry<T, F>(attempts: u32, delay: Duration, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut last_err: Option<Error> = None;

    for attempt_no in 1..=attempts {
        match attempt() {
            Ok(value) => return Ok(value),
            Err(e @ (Error::Validation(_) | Error::NotFound(_))) => return Err(e),
            Err(e) => {
                warn!(attempt = attempt_no, error = %e, "Store access failed");
                last_err = Some(e);
                if attempt_no < attempts {
                    info!(delay_secs = delay.as_secs(), "Retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(Error::Store(
        last_err.map(|e| e.to_string()).unwrap_or_else(|| "no attempts made".to_string()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_attempt_success() {
        let mut calls = 0;
        let out = with_retry(2, Duration::ZERO, || {
            calls += 1;
            Ok(42)
        })
        .await
        .unwrap();
        assert_eq!(out, 42);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_second_attempt_success() {
        let mut calls = 0;
        let out = with_retry(2, Duration::ZERO, || {
            calls += 1;
            if calls < 2 {
                Err(Error::Store("locked".to_string()))
            } else {
                Ok("ok")
            }
        })
        .await
        .unwrap();
        assert_eq!(out, "ok");
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_bound_is_two_not_open_ended() {
        // Fails twice, would succeed on the third try; the bound still wins.
        let mut calls = 0;
        let err = with_retry(2, Duration::ZERO, || {
            calls += 1;
            if calls <= 2 {
                Err(Error::Store(format!("failure {}", calls)))
            } else {
                Ok(())
            }
        })
        .await
        .unwrap_err();

        assert_eq!(calls, 2);
        match err {
            Error::Store(msg) => assert!(msg.contains("failure 2")),
            other => panic!("expected Store, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let mut calls = 0;
        let err = with_retry(2, Duration::ZERO, || -> Result<()> {
            calls += 1;
            Err(Error::NotFound("missing".to_string()))
        })
        .await
        .unwrap_err();

        assert_eq!(calls, 1);
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_validation_is_not_retried() {
        let mut calls = 0;
        let err = with_retry(2, Duration::ZERO, || -> Result<()> {
            calls += 1;
            Err(Error::Validation("empty".to_string()))
        })
        .await
        .unwrap_err();

        assert_eq!(calls, 1);
        assert!(matches!(err, Error::Validation(_)));
    }
}
