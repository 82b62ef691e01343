//! Per-iteration timing records and the end-of-run summary.

use crate::bench::ResetPolicy;
use anyhow::{Context, Result};
use nmtbench_decoder::DecodeTimings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: u64,
    /// Checkpoint load time; absent when the call ran warm.
    pub load_ms: Option<f64>,
    pub decode_ms: f64,
    /// Wall-clock time of the whole translate call, reset excluded.
    pub wall_ms: f64,
}

impl IterationRecord {
    pub fn new(iteration: u64, timings: &DecodeTimings, wall: Duration) -> Self {
        Self {
            iteration,
            load_ms: timings.load.map(as_ms),
            decode_ms: as_ms(timings.decode),
            wall_ms: as_ms(wall),
        }
    }

    pub fn is_cold(&self) -> bool {
        self.load_ms.is_some()
    }
}

fn as_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1e3
}

/// Samples kept for percentile estimates. Below this many iterations the
/// percentiles are exact.
pub const RESERVOIR_CAPACITY: usize = 8192;

/// Streaming wall-clock statistics with bounded memory: running
/// min/max/sum plus a uniform sample reservoir for percentiles.
#[derive(Debug)]
pub struct TimingRecorder {
    reservoir: Vec<f64>,
    capacity: usize,
    count: u64,
    cold: u64,
    sum_ms: f64,
    min_ms: f64,
    max_ms: f64,
}

impl Default for TimingRecorder {
    fn default() -> Self {
        Self::with_capacity(RESERVOIR_CAPACITY)
    }
}

impl TimingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            reservoir: Vec::with_capacity(capacity.min(RESERVOIR_CAPACITY)),
            capacity,
            count: 0,
            cold: 0,
            sum_ms: 0.0,
            min_ms: f64::INFINITY,
            max_ms: f64::NEG_INFINITY,
        }
    }

    pub fn record(&mut self, record: &IterationRecord) {
        let wall_ms = record.wall_ms;
        self.count += 1;
        if record.is_cold() {
            self.cold += 1;
        }
        self.sum_ms += wall_ms;
        self.min_ms = self.min_ms.min(wall_ms);
        self.max_ms = self.max_ms.max(wall_ms);

        // Algorithm R: every sample seen so far is retained with equal probability
        if self.reservoir.len() < self.capacity {
            self.reservoir.push(wall_ms);
        } else {
            let slot = fastrand::u64(..self.count) as usize;
            if slot < self.capacity {
                self.reservoir[slot] = wall_ms;
            }
        }
    }

    /// Iterations recorded.
    pub fn len(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Samples currently held for percentile estimation.
    pub fn retained(&self) -> usize {
        self.reservoir.len()
    }

    pub fn summary(&self, policy: ResetPolicy) -> BenchSummary {
        let mut sorted = self.reservoir.clone();
        sorted.sort_by(f64::total_cmp);

        let (min_ms, mean_ms, max_ms) = if self.count == 0 {
            (0.0, 0.0, 0.0)
        } else {
            (self.min_ms, self.sum_ms / self.count as f64, self.max_ms)
        };

        BenchSummary {
            policy,
            iterations: self.count,
            cold_iterations: self.cold,
            min_ms,
            mean_ms,
            p50_ms: percentile(&sorted, 0.50),
            p95_ms: percentile(&sorted, 0.95),
            max_ms,
            generated_at_unix_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
        }
    }
}

/// Nearest-rank percentile over ascending samples.
fn percentile(sorted: &[f64], quantile: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (quantile * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchSummary {
    pub policy: ResetPolicy,
    pub iterations: u64,
    pub cold_iterations: u64,
    pub min_ms: f64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub max_ms: f64,
    pub generated_at_unix_ms: u128,
}

impl BenchSummary {
    pub fn log(&self) {
        info!(
            policy = ?self.policy,
            iterations = self.iterations,
            cold = self.cold_iterations,
            min_ms = self.min_ms,
            mean_ms = self.mean_ms,
            p50_ms = self.p50_ms,
            p95_ms = self.p95_ms,
            max_ms = self.max_ms,
            "benchmark summary"
        );
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("failed to write report {}", path.display()))
    }
}
