use reqwest::Client;
use std::time::Duration;
use tracing::warn;

/// Build the shared HTTP client for remote service calls.
///
/// No retries and no timeout beyond this client-level one; callers needing
/// bounded latency impose their own layer.
pub fn build_http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Failed to build HTTP client, using default");
            Client::new()
        })
}
