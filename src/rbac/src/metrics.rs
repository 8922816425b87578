//! Decision and write metrics for the RBAC facade

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Maximum latency samples kept for percentile calculation
const MAX_SAMPLES: usize = 10_000;

/// Snapshot of collected metrics
#[derive(Debug, Clone, Default)]
pub struct RbacMetrics {
    /// Total number of authorization decisions
    pub total_decisions: u64,

    pub allowed_decisions: u64,

    pub denied_decisions: u64,

    /// Facade write calls (allow, forbid, assign, allow_role, forbid_role),
    /// one per call however many rows it inserted
    pub writes: u64,

    /// Links removed by revoke/retract/unforbid/detach
    pub removals: u64,

    /// Latency figures over the sample window, computed at snapshot time
    pub avg_latency_ms: f64,
    pub latency_p50_ms: f64,
    pub latency_p99_ms: f64,
}

impl RbacMetrics {
    /// Fraction of decisions that allowed
    pub fn allow_rate(&self) -> f64 {
        if self.total_decisions == 0 {
            0.0
        } else {
            self.allowed_decisions as f64 / self.total_decisions as f64
        }
    }
}

/// Metrics collector
#[derive(Clone, Default)]
pub struct MetricsCollector {
    metrics: Arc<RwLock<RbacMetrics>>,

    /// Latency samples (oldest dropped first)
    latency_samples: Arc<RwLock<Vec<f64>>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an authorization decision and its latency
    pub async fn record_decision(&self, allowed: bool, latency: Duration) {
        {
            let mut metrics = self.metrics.write().await;
            metrics.total_decisions += 1;
            if allowed {
                metrics.allowed_decisions += 1;
            } else {
                metrics.denied_decisions += 1;
            }
        }

        self.record_latency(latency).await;
    }

    pub async fn record_write(&self) {
        self.metrics.write().await.writes += 1;
    }

    pub async fn record_removals(&self, count: usize) {
        self.metrics.write().await.removals += count as u64;
    }

    async fn record_latency(&self, latency: Duration) {
        let latency_ms = latency.as_secs_f64() * 1000.0;

        let mut samples = self.latency_samples.write().await;
        samples.push(latency_ms);
        if samples.len() > MAX_SAMPLES {
            let excess = samples.len() - MAX_SAMPLES;
            samples.drain(0..excess);
        }
    }

    /// Current metrics
    pub async fn snapshot(&self) -> RbacMetrics {
        let mut metrics = self.metrics.read().await.clone();

        let mut sorted = self.latency_samples.read().await.clone();
        if sorted.is_empty() {
            return metrics;
        }
        sorted.sort_by(|a, b| a.total_cmp(b));

        metrics.avg_latency_ms = sorted.iter().sum::<f64>() / sorted.len() as f64;
        metrics.latency_p50_ms = Self::percentile(&sorted, 0.50);
        metrics.latency_p99_ms = Self::percentile(&sorted, 0.99);
        metrics
    }

    /// Reset all metrics
    pub async fn reset(&self) {
        *self.metrics.write().await = RbacMetrics::default();
        self.latency_samples.write().await.clear();
    }

    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }

        let index = ((sorted.len() as f64 - 1.0) * p).round() as usize;
        sorted[index.min(sorted.len() - 1)]
    }
}
