// SPDX-License-Identifier: Apache-2.0

//! Query Log Store
//!
//! Fixed-capacity in-memory ring of query events. The interceptor is the
//! single writer; the admin surface and the report generator read copies.
//! Nothing is persisted.

use std::collections::VecDeque;

use parking_lot::RwLock;
use tracing::{debug, info};

use super::types::{LogStats, QueryEvent, QueryLogFilter, RiskLevel};

/// Bounded FIFO of query events
pub struct QueryLogStore {
    entries: RwLock<VecDeque<QueryEvent>>,
    capacity: usize,
}

impl QueryLogStore {
    /// Creates a store holding at most `capacity` events (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        debug!("Query log store created with capacity {}", capacity);
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Appends an event, evicting the oldest one when full
    pub fn append(&self, event: QueryEvent) {
        let mut entries = self.entries.write();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(event);
    }

    /// Matching events, most recent first
    pub fn query(&self, filter: &QueryLogFilter) -> Vec<QueryEvent> {
        let entries = self.entries.read();

        entries
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .skip(filter.offset.unwrap_or(0))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Copy of the whole buffer in insertion order
    pub fn snapshot(&self) -> Vec<QueryEvent> {
        self.entries.read().iter().cloned().collect()
    }

    /// Aggregate statistics, optionally restricted to one tenant
    pub fn stats(&self, tenant_id: Option<&str>) -> LogStats {
        let entries = self.entries.read();

        let mut stats = LogStats::default();
        for level in RiskLevel::ALL {
            stats.counts_by_risk.insert(level.as_str().to_string(), 0);
        }

        let mut duration_total = 0.0;

        for entry in entries.iter() {
            if let Some(tenant) = tenant_id {
                if entry.tenant_id.as_deref() != Some(tenant) {
                    continue;
                }
            }

            stats.total += 1;
            duration_total += entry.duration_ms;

            if entry.is_violation() {
                stats.violation_count += 1;
            }

            if !entry.success {
                stats.failed_count += 1;
            }

            *stats
                .counts_by_risk
                .entry(entry.risk_level.as_str().to_string())
                .or_insert(0) += 1;

            *stats
                .counts_by_entity
                .entry(entry.entity.clone())
                .or_insert(0) += 1;
        }

        if stats.total > 0 {
            stats.avg_duration_ms = duration_total / stats.total as f64;
        }

        stats
    }

    /// Drops every event
    pub fn clear(&self) {
        self.entries.write().clear();
        info!("Query log cleared");
    }

    /// Export all events as pretty JSON, oldest first
    pub fn export(&self) -> String {
        let entries = self.snapshot();
        serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".to_string())
    }
}

impl Default for QueryLogStore {
    fn default() -> Self {
        Self::new(1000)
    }
}
