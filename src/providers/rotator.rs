//! Provider rotation with bounded fallback.
//!
//! Holds an ordered list of interchangeable read endpoints for a single
//! logical ledger client. Exactly one active `RpcClient` exists at a time,
//! lazily constructed and swapped atomically behind a mutex so a rotation
//! triggered by one in-flight request never races another request's read.
//!
//! Ledger reads are idempotent, so blind retry-with-rotation is safe without
//! idempotency keys. Retry cost is bounded to one pass over the provider
//! list per call.

use eyre::Result;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::models::AppError;
use crate::providers::rpc::{ProviderEndpoint, RpcClient};

pub struct ProviderRotator {
    endpoints: Vec<ProviderEndpoint>,
    active: AtomicUsize,
    client: Mutex<Option<Arc<RpcClient>>>,
    timeout: Duration,
}

impl ProviderRotator {
    /// Build a rotator over the given endpoints, ordered by priority.
    pub fn new(mut endpoints: Vec<ProviderEndpoint>, timeout: Duration) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(AppError::no_endpoints().into());
        }
        endpoints.sort_by_key(|e| e.priority);
        Ok(Self {
            endpoints,
            active: AtomicUsize::new(0),
            client: Mutex::new(None),
            timeout,
        })
    }

    pub fn provider_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Name of the endpoint currently selected
    pub fn active_provider(&self) -> &str {
        &self.endpoints[self.active.load(Ordering::Relaxed) % self.endpoints.len()].name
    }

    /// Return the active client, constructing it lazily on first use
    pub async fn get_client(&self) -> Result<Arc<RpcClient>> {
        let mut guard = self.client.lock().await;
        if let Some(client) = guard.as_ref() {
            return Ok(Arc::clone(client));
        }
        let endpoint = &self.endpoints[self.active.load(Ordering::Relaxed) % self.endpoints.len()];
        let client = Arc::new(RpcClient::new(endpoint, self.timeout)?);
        info!("🔌 Provider client ready: {} ({})", endpoint.name, client.masked_url());
        *guard = Some(Arc::clone(&client));
        Ok(client)
    }

    /// Advance to the next endpoint and discard the cached client.
    /// The swap happens under the client mutex so concurrent readers see
    /// either the old client or none, never a half-updated state.
    pub async fn rotate(&self) {
        let mut guard = self.client.lock().await;
        let next = (self.active.load(Ordering::Relaxed) + 1) % self.endpoints.len();
        self.active.store(next, Ordering::Relaxed);
        *guard = None;
        warn!("🔄 Rotated to provider: {}", self.endpoints[next].name);
    }

    /// Run `operation` against the current client, rotating and retrying on
    /// failure, up to one attempt per configured provider. Raises a terminal
    /// provider-exhausted error when every endpoint has failed.
    pub async fn with_fallback<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn(Arc<RpcClient>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = None;
        for _ in 0..self.endpoints.len() {
            let client = match self.get_client().await {
                Ok(c) => c,
                Err(e) => {
                    warn!("⚠️ Client construction failed: {}", e);
                    last_error = Some(e);
                    self.rotate().await;
                    continue;
                }
            };
            match operation(Arc::clone(&client)).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!("⚠️ Provider {} failed: {}", client.name(), e);
                    last_error = Some(e);
                    self.rotate().await;
                }
            }
        }
        Err(AppError::provider_exhausted(format!(
            "All {} providers failed (last: {})",
            self.endpoints.len(),
            last_error.map(|e| e.to_string()).unwrap_or_else(|| "none".into()),
        ))
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::eyre;

    fn test_endpoints() -> Vec<ProviderEndpoint> {
        vec![
            ProviderEndpoint::new("secondary", "http://127.0.0.1:1/b", 1),
            ProviderEndpoint::new("primary", "http://127.0.0.1:1/a", 0),
            ProviderEndpoint::new("tertiary", "http://127.0.0.1:1/c", 2),
        ]
    }

    #[test]
    fn test_empty_endpoints_rejected() {
        assert!(ProviderRotator::new(vec![], Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_priority_ordering() {
        let rotator = ProviderRotator::new(test_endpoints(), Duration::from_secs(1)).unwrap();
        assert_eq!(rotator.active_provider(), "primary");
        rotator.rotate().await;
        assert_eq!(rotator.active_provider(), "secondary");
        rotator.rotate().await;
        assert_eq!(rotator.active_provider(), "tertiary");
        rotator.rotate().await;
        // Wraps back around
        assert_eq!(rotator.active_provider(), "primary");
    }

    #[tokio::test]
    async fn test_with_fallback_first_success() {
        let rotator = ProviderRotator::new(test_endpoints(), Duration::from_secs(1)).unwrap();
        let result: Result<u32> = rotator.with_fallback(|_client| async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(rotator.active_provider(), "primary");
    }

    #[tokio::test]
    async fn test_with_fallback_exhausts_all_providers() {
        let rotator = ProviderRotator::new(test_endpoints(), Duration::from_secs(1)).unwrap();
        let attempts = AtomicUsize::new(0);
        let result: Result<u32> = rotator
            .with_fallback(|_client| {
                attempts.fetch_add(1, Ordering::Relaxed);
                async { Err(eyre!("simulated outage")) }
            })
            .await;
        assert!(result.is_err());
        // Exactly one attempt per provider, never an unbounded loop
        assert_eq!(attempts.load(Ordering::Relaxed), 3);
        assert!(result.unwrap_err().to_string().contains("All 3 providers failed"));
    }

    #[tokio::test]
    async fn test_with_fallback_recovers_on_second_provider() {
        let rotator = ProviderRotator::new(test_endpoints(), Duration::from_secs(1)).unwrap();
        let attempts = AtomicUsize::new(0);
        let result: Result<&str> = rotator
            .with_fallback(|_client| {
                let n = attempts.fetch_add(1, Ordering::Relaxed);
                async move {
                    if n == 0 {
                        Err(eyre!("primary down"))
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(rotator.active_provider(), "secondary");
    }
}
