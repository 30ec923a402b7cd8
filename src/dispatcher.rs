//! Runs one transport request under a [`RetryPolicy`].

use crate::retry::RetryPolicy;
use crate::transport::{RawResponse, Transport, TransportRequest};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;

/// A successful dispatch: the transport's response plus how many attempts it took.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub response: RawResponse,
    pub attempts: usize,
}

/// Retries a transport call with exponential backoff.
///
/// The dispatcher holds no per-call state and never reports through the
/// client's logger; failures are retried and the last one is returned as-is.
#[derive(Clone)]
pub struct RequestDispatcher {
    transport: Arc<dyn Transport>,
}

impl RequestDispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Sends `request`, retrying failures until the policy runs out of attempts.
    ///
    /// # Errors
    ///
    /// Returns the error from the final attempt, unchanged.
    pub async fn execute(
        &self,
        request: &TransportRequest,
        policy: &RetryPolicy,
    ) -> Result<Dispatched> {
        let mut failures = 0;

        loop {
            tracing::debug!(
                method = %request.method,
                url = %request.url,
                attempt = failures + 1,
                "Executing HTTP request"
            );

            match self.transport.send(request).await {
                Ok(response) => {
                    return Ok(Dispatched {
                        response,
                        attempts: failures + 1,
                    })
                }
                Err(e) => {
                    failures += 1;

                    let Some(delay) = policy.delay_after_failure(failures) else {
                        return Err(e);
                    };

                    tracing::debug!(
                        error = %e,
                        attempt = failures,
                        delay_ms = millis(delay),
                        "Retrying request after delay"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

fn millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}
