//! Health-aware, task-based provider selection (§4.2).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use forge_protocol::agent::TaskType;
use tokio::sync::RwLock;

use crate::adapter::{Adapter, AdapterError, CompletionRequest, CompletionResponse};

#[derive(Debug, Clone, Default)]
struct ProviderStats {
    attempts: u64,
    successes: u64,
    failures: u64,
    consecutive_failures: u32,
    /// Running average latency in milliseconds.
    avg_latency_ms: f64,
    /// Refreshed on every failure once `consecutive_failures` is at or
    /// past the circuit-breaker threshold, so a reprobe that fails again
    /// keeps the breaker open for another `reprobe` window instead of
    /// leaving it permanently re-openable; cleared by a successful probe.
    broken_since: Option<Instant>,
}

impl ProviderStats {
    fn record_success(&mut self, latency: Duration) {
        self.attempts += 1;
        self.successes += 1;
        self.consecutive_failures = 0;
        self.broken_since = None;
        let latency_ms = latency.as_secs_f64() * 1000.0;
        self.avg_latency_ms = if self.attempts == 1 {
            latency_ms
        } else {
            // Exponential moving average keeps recent latency dominant
            // without storing a full history.
            self.avg_latency_ms * 0.8 + latency_ms * 0.2
        };
    }

    fn record_failure(&mut self, threshold: u32) {
        self.attempts += 1;
        self.failures += 1;
        self.consecutive_failures += 1;
        if self.consecutive_failures >= threshold {
            self.broken_since = Some(Instant::now());
        }
    }

    fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            // Unproven providers rank behind proven ones but are still
            // selectable — this is not the same as being circuit-broken.
            0.5
        } else {
            self.successes as f64 / self.attempts as f64
        }
    }

    fn is_circuit_broken(&self, threshold: u32, reprobe: Duration) -> bool {
        if self.consecutive_failures < threshold {
            return false;
        }
        match self.broken_since {
            Some(since) => since.elapsed() < reprobe,
            None => false,
        }
    }
}

/// Entry in the Router's static priority map: for a given task, the
/// ordered list of preferred adapter ids (§4.2 "static priority map").
pub struct RouterConfig {
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_reprobe: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            circuit_breaker_threshold: 3,
            circuit_breaker_reprobe: Duration::from_secs(60),
        }
    }
}

/// Picks the best available [`Adapter`] for a task type, tracking
/// per-provider health (§4.2).
pub struct Router {
    adapters: Vec<Arc<dyn Adapter>>,
    stats: RwLock<HashMap<&'static str, ProviderStats>>,
    config: RouterConfig,
}

impl Router {
    pub fn new(adapters: Vec<Arc<dyn Adapter>>, config: RouterConfig) -> Self {
        let stats = adapters
            .iter()
            .map(|a| (a.id(), ProviderStats::default()))
            .collect();
        Self {
            adapters,
            stats: RwLock::new(stats),
            config,
        }
    }

    /// Selection policy (§4.2): among providers whose availability
    /// predicate holds and whose `consecutive_failures` is below
    /// threshold, order first by whether the adapter's metadata prefers
    /// this task, then by success rate, tie-broken by lower average
    /// latency. Falls back to any provider supporting the task if no
    /// preferred one is available. Returns `None` only when every
    /// candidate is unavailable or circuit-broken (§8 "Router liveness").
    pub async fn select(&self, task: TaskType, requires_vision: bool) -> Option<Arc<dyn Adapter>> {
        let stats = self.stats.read().await;
        let mut candidates: Vec<&Arc<dyn Adapter>> = self
            .adapters
            .iter()
            .filter(|a| a.has_credentials())
            .filter(|a| !requires_vision || a.metadata().supports_vision)
            .filter(|a| {
                stats
                    .get(a.id())
                    .map(|s| {
                        !s.is_circuit_broken(
                            self.config.circuit_breaker_threshold,
                            self.config.circuit_breaker_reprobe,
                        )
                    })
                    .unwrap_or(true)
            })
            .collect();

        if candidates.is_empty() {
            return None;
        }

        candidates.sort_by(|a, b| {
            let a_prefers = a.metadata().preferred_for.contains(&task);
            let b_prefers = b.metadata().preferred_for.contains(&task);
            let a_stats = stats.get(a.id()).cloned().unwrap_or_default();
            let b_stats = stats.get(b.id()).cloned().unwrap_or_default();
            b_prefers
                .cmp(&a_prefers)
                .then_with(|| {
                    b_stats
                        .success_rate()
                        .partial_cmp(&a_stats.success_rate())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| {
                    a_stats
                        .avg_latency_ms
                        .partial_cmp(&b_stats.avg_latency_ms)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        });
        Some(candidates.into_iter().next().cloned()?)
    }

    /// Invoke the selected adapter for `task`, updating health statistics
    /// on completion (§4.1 "records latency and emits a boolean success").
    #[tracing::instrument(skip(self, request), fields(task = ?task))]
    pub async fn complete(
        &self,
        task: TaskType,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, RouterError> {
        let requires_vision = request.image_data.is_some();
        let adapter = self.select(task, requires_vision).await.ok_or_else(|| {
            tracing::warn!(?task, "no provider available");
            RouterError::NoProvider { task }
        })?;

        let result = adapter.complete(request).await;
        let mut stats = self.stats.write().await;
        let entry = stats.entry(adapter.id()).or_default();
        match &result {
            Ok(response) => {
                tracing::debug!(provider = adapter.id(), latency_ms = %response.latency.as_millis(), "completion succeeded");
                entry.record_success(response.latency);
            }
            Err(error) => {
                tracing::warn!(provider = adapter.id(), %error, "completion failed");
                entry.record_failure(self.config.circuit_breaker_threshold);
            }
        }
        drop(stats);

        result.map_err(|error| RouterError::Adapter {
            provider: adapter.id().to_string(),
            error,
        })
    }

    /// Forces a provider's statistics to reset, as if an external health
    /// check had just confirmed it — the manual counterpart to the
    /// automatic re-probe interval (§4.2).
    pub async fn reset_provider(&self, adapter_id: &str) {
        if let Some(stats) = self.stats.write().await.get_mut(adapter_id) {
            *stats = ProviderStats::default();
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("no provider available for task {task:?}")]
    NoProvider { task: TaskType },
    #[error("provider {provider} failed: {error}")]
    Adapter {
        provider: String,
        error: AdapterError,
    },
}

impl RouterError {
    pub fn into_forge_error(self) -> forge_protocol::ForgeError {
        use forge_protocol::ForgeError;
        match self {
            RouterError::NoProvider { task } => ForgeError::ProviderUnavailable { task },
            RouterError::Adapter { provider, error } => {
                if error.is_retryable() {
                    ForgeError::ProviderTransient {
                        provider,
                        message: error.to_string(),
                    }
                } else {
                    ForgeError::ProviderFatal {
                        provider,
                        message: error.to_string(),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::adapter::{AdapterMetadata, CompletionRequest};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyAdapter {
        id: &'static str,
        fail_times: AtomicU32,
    }

    #[async_trait]
    impl Adapter for FlakyAdapter {
        fn id(&self) -> &'static str {
            self.id
        }
        fn model_id(&self) -> &'static str {
            "flaky-model"
        }
        fn metadata(&self) -> AdapterMetadata {
            AdapterMetadata {
                max_context_tokens: 1000,
                supports_streaming: false,
                supports_vision: false,
                preferred_for: &[],
            }
        }
        fn has_credentials(&self) -> bool {
            true
        }
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, AdapterError> {
            if self.fail_times.fetch_sub(1, Ordering::SeqCst) > 0 {
                Err(AdapterError::Transient("boom".to_string()))
            } else {
                Ok(CompletionResponse {
                    text: "ok".to_string(),
                    latency: Duration::from_millis(5),
                })
            }
        }
    }

    #[tokio::test]
    async fn circuit_breaker_trips_after_threshold_failures() {
        let adapter = Arc::new(FlakyAdapter {
            id: "flaky",
            fail_times: AtomicU32::new(10),
        });
        let router = Router::new(
            vec![adapter],
            RouterConfig {
                circuit_breaker_threshold: 3,
                circuit_breaker_reprobe: Duration::from_secs(60),
            },
        );

        for _ in 0..3 {
            let _ = router
                .complete(TaskType::Code, CompletionRequest::new("hi", "sys"))
                .await;
        }

        let result = router
            .complete(TaskType::Code, CompletionRequest::new("hi", "sys"))
            .await;
        assert!(matches!(result, Err(RouterError::NoProvider { .. })));
    }

    #[tokio::test]
    async fn succeeds_once_failures_stop() {
        let adapter = Arc::new(FlakyAdapter {
            id: "flaky",
            fail_times: AtomicU32::new(1),
        });
        let router = Router::new(vec![adapter], RouterConfig::default());
        let _ = router
            .complete(TaskType::Code, CompletionRequest::new("hi", "sys"))
            .await;
        let result = router
            .complete(TaskType::Code, CompletionRequest::new("hi", "sys"))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn no_provider_returns_none_when_empty() {
        let router = Router::new(vec![], RouterConfig::default());
        let selected = router.select(TaskType::Reasoning, false).await;
        assert!(selected.is_none());
    }
}
