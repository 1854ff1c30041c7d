//! Per-tile results.

use std::time::Duration;

use thiserror::Error;

use crate::http::{TileResponse, TransportError};
use crate::retry::Retried;

/// Final result of one tile after its retries settled.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    pub url: String,
    /// Status of the final attempt, `None` if no response was received.
    pub status: Option<u16>,
    /// Body size of the final attempt.
    pub bytes: Option<u64>,
    /// Duration of the final attempt only.
    pub response_time: Duration,
    /// Attempts made, including the first.
    pub attempts: u32,
    /// Why the final attempt failed.
    pub error: Option<String>,
}

impl RequestOutcome {
    /// True iff the final status is 2xx.
    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(status) if (200..300).contains(&status))
    }

    pub(crate) fn from_retried(url: String, retried: Retried<Exchange, AttemptError>) -> Self {
        let attempts = retried.attempts;
        match retried.result {
            Ok(exchange) => Self {
                url,
                status: Some(exchange.response.status),
                bytes: Some(exchange.response.bytes),
                response_time: exchange.elapsed,
                attempts,
                error: None,
            },
            Err(error) => {
                let message = error.to_string();
                match error {
                    AttemptError::Status {
                        status,
                        bytes,
                        elapsed,
                    } => Self {
                        url,
                        status: Some(status),
                        bytes: Some(bytes),
                        response_time: elapsed,
                        attempts,
                        error: Some(message),
                    },
                    AttemptError::Transport { elapsed, .. } => Self {
                        url,
                        status: None,
                        bytes: None,
                        response_time: elapsed,
                        attempts,
                        error: Some(message),
                    },
                }
            }
        }
    }
}

/// A successful request with its timing.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Exchange {
    pub response: TileResponse,
    pub elapsed: Duration,
}

/// A failed attempt. Both variants are retried.
#[derive(Debug, Clone, Error)]
pub(crate) enum AttemptError {
    #[error("HTTP {status}")]
    Status {
        status: u16,
        bytes: u64,
        elapsed: Duration,
    },

    #[error("{error}")]
    Transport {
        error: TransportError,
        elapsed: Duration,
    },
}

impl AttemptError {
    /// Classifies a client result: transport failures and non-2xx statuses
    /// are errors.
    pub(crate) fn classify(
        result: Result<TileResponse, TransportError>,
        elapsed: Duration,
    ) -> Result<Exchange, Self> {
        match result {
            Ok(response) if response.is_success() => Ok(Exchange { response, elapsed }),
            Ok(response) => Err(Self::Status {
                status: response.status,
                bytes: response.bytes,
                elapsed,
            }),
            Err(error) => Err(Self::Transport { error, elapsed }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_classify_statuses() {
        let ok = AttemptError::classify(Ok(TileResponse { status: 204, bytes: 0 }), ms(5));
        assert!(ok.is_ok());

        let not_modified = AttemptError::classify(Ok(TileResponse { status: 304, bytes: 0 }), ms(5));
        assert!(matches!(
            not_modified,
            Err(AttemptError::Status { status: 304, .. })
        ));
    }

    #[test]
    fn test_outcome_from_status_failure() {
        let retried = Retried {
            result: AttemptError::classify(Ok(TileResponse { status: 503, bytes: 12 }), ms(40)),
            attempts: 3,
        };
        let outcome = RequestOutcome::from_retried("http://t/1/2/3".to_string(), retried);

        assert!(!outcome.is_success());
        assert_eq!(outcome.status, Some(503));
        assert_eq!(outcome.bytes, Some(12));
        assert_eq!(outcome.response_time, ms(40));
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.error.as_deref(), Some("HTTP 503"));
    }

    #[test]
    fn test_outcome_from_transport_failure() {
        let retried = Retried {
            result: AttemptError::classify(
                Err(TransportError::Connect("refused".to_string())),
                ms(1),
            ),
            attempts: 1,
        };
        let outcome = RequestOutcome::from_retried("u".to_string(), retried);

        assert_eq!(outcome.status, None);
        assert_eq!(outcome.bytes, None);
        assert_eq!(outcome.error.as_deref(), Some("Connection failed: refused"));
    }

    #[test]
    fn test_outcome_success() {
        let retried = Retried {
            result: AttemptError::classify(Ok(TileResponse { status: 200, bytes: 9 }), ms(7)),
            attempts: 2,
        };
        let outcome = RequestOutcome::from_retried("u".to_string(), retried);

        assert!(outcome.is_success());
        assert_eq!(outcome.bytes, Some(9));
        assert!(outcome.error.is_none());
    }
}
