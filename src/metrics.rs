// SPDX-License-Identifier: Apache-2.0

//! Process-wide guard counters.
//!
//! Unlike the query log these survive `clear_logs` and eviction: they count
//! everything the process has intercepted or blocked since start.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use serde::Serialize;

use crate::interceptor::RiskLevel;

#[derive(Default)]
struct GuardMetrics {
    intercepted: AtomicU64,
    failed: AtomicU64,
    blocked: AtomicU64,
    slow: AtomicU64,
    /// Indexed by `RiskLevel as usize`
    by_risk: [AtomicU64; 5],
    duration_total_ms: AtomicU64,
    duration_max_ms: AtomicU64,
}

static GUARD_METRICS: OnceLock<GuardMetrics> = OnceLock::new();

fn metrics() -> &'static GuardMetrics {
    GUARD_METRICS.get_or_init(GuardMetrics::default)
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Records one intercepted call
pub fn record_query(duration_ms: f64, success: bool, risk: RiskLevel) {
    let metrics = metrics();
    let duration_ms = duration_ms.max(0.0).round() as u64;

    bump(&metrics.intercepted);
    bump(&metrics.by_risk[risk as usize]);
    if !success {
        bump(&metrics.failed);
    }

    metrics
        .duration_total_ms
        .fetch_add(duration_ms, Ordering::Relaxed);
    metrics
        .duration_max_ms
        .fetch_max(duration_ms, Ordering::Relaxed);
}

/// Records a bulk mutation refused before reaching the store
pub fn record_blocked() {
    bump(&metrics().blocked);
}

pub fn record_slow() {
    bump(&metrics().slow);
}

#[derive(Debug, Clone, Serialize)]
pub struct GuardMetricsSnapshot {
    pub intercepted: u64,
    pub failed: u64,
    pub blocked: u64,
    pub slow: u64,
    /// Intercepted calls per risk level, every level present
    pub by_risk: BTreeMap<String, u64>,
    pub avg_ms: Option<f64>,
    pub max_ms: Option<u64>,
}

impl GuardMetricsSnapshot {
    pub fn risk_count(&self, level: RiskLevel) -> u64 {
        self.by_risk.get(level.as_str()).copied().unwrap_or(0)
    }
}

pub fn snapshot() -> GuardMetricsSnapshot {
    let metrics = metrics();
    let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);

    let intercepted = load(&metrics.intercepted);
    let by_risk = RiskLevel::ALL
        .iter()
        .map(|level| {
            (
                level.as_str().to_string(),
                load(&metrics.by_risk[*level as usize]),
            )
        })
        .collect();

    let avg_ms = (intercepted > 0)
        .then(|| load(&metrics.duration_total_ms) as f64 / intercepted as f64);
    let max_ms = Some(load(&metrics.duration_max_ms)).filter(|ms| *ms > 0);

    GuardMetricsSnapshot {
        intercepted,
        failed: load(&metrics.failed),
        blocked: load(&metrics.blocked),
        slow: load(&metrics.slow),
        by_risk,
        avg_ms,
        max_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_move_forward() {
        // Other tests record concurrently; only lower bounds hold.
        let initial = snapshot();

        record_query(10.0, true, RiskLevel::None);
        record_query(5.0, false, RiskLevel::Critical);
        record_blocked();
        record_slow();

        let after = snapshot();
        assert!(after.intercepted >= initial.intercepted + 2);
        assert!(after.failed >= initial.failed + 1);
        assert!(after.risk_count(RiskLevel::Critical) >= initial.risk_count(RiskLevel::Critical) + 1);
        assert!(after.risk_count(RiskLevel::None) >= initial.risk_count(RiskLevel::None) + 1);
        assert!(after.blocked >= initial.blocked + 1);
        assert!(after.slow >= initial.slow + 1);
        assert!(after.avg_ms.is_some());
    }

    #[test]
    fn test_snapshot_lists_every_risk_level() {
        let snap = snapshot();
        assert_eq!(snap.by_risk.len(), RiskLevel::ALL.len());
    }

    #[test]
    fn test_max_duration_only_grows() {
        record_query(99_999.0, true, RiskLevel::Low);
        record_query(1.0, true, RiskLevel::Low);
        assert!(snapshot().max_ms.unwrap_or(0) >= 99_999);
    }
}
