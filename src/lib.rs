// SPDX-License-Identifier: Apache-2.0

// Tenant Guard - tenant-isolation query interception and policy enforcement
// Core library

pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod guard;
pub mod interceptor;
pub mod metrics;
pub mod observability;
pub mod report;
pub mod schema;

use std::sync::Arc;

use tracing::{info, warn};

use config::GuardConfig;
use engine::DataStore;
use error::GuardResult;
use guard::GuardedClient;
use interceptor::{LogStats, QueryEvent, QueryInterceptor, QueryLogFilter, QueryLogStore};
use metrics::GuardMetricsSnapshot;
use report::{SecurityReport, SecurityReporter};
use schema::SchemaRegistry;

pub type SharedState = Arc<GuardState>;

/// Everything wired from one configuration and one store
pub struct GuardState {
    pub config: GuardConfig,
    pub registry: Arc<SchemaRegistry>,
    pub log: Arc<QueryLogStore>,
    pub interceptor: Arc<QueryInterceptor>,
    pub client: GuardedClient,
    pub reporter: SecurityReporter,
}

impl GuardState {
    /// Wires the guard around `store` using the built-in registry
    pub fn new(config: GuardConfig, store: Arc<dyn DataStore>) -> GuardResult<Self> {
        Self::with_registry(config, store, SchemaRegistry::shared())
    }

    pub fn with_registry(
        config: GuardConfig,
        store: Arc<dyn DataStore>,
        registry: Arc<SchemaRegistry>,
    ) -> GuardResult<Self> {
        if config.strict_schema {
            registry.ensure_consistent()?;
        } else {
            let consistency = registry.validate_consistency();
            if !consistency.valid {
                warn!(issues = ?consistency.issues, "Schema registry is inconsistent");
            }
        }

        let log = Arc::new(QueryLogStore::new(config.log_capacity));
        let interceptor = Arc::new(QueryInterceptor::new(
            store,
            Arc::clone(&registry),
            Arc::clone(&log),
            config.clone(),
        ));
        let client = GuardedClient::new(Arc::clone(&interceptor));
        let reporter = SecurityReporter::new(
            Arc::clone(&log),
            Arc::clone(&registry),
            config.entity_violation_threshold,
        );

        info!(
            store = interceptor.store_id(),
            log_capacity = log.capacity(),
            "Tenant guard initialized"
        );

        Ok(Self {
            config,
            registry,
            log,
            interceptor,
            client,
            reporter,
        })
    }

    // ==================== Admin surface ====================

    pub fn query_logs(&self, filter: &QueryLogFilter) -> Vec<QueryEvent> {
        self.log.query(filter)
    }

    pub fn query_stats(&self, tenant_id: Option<&str>) -> LogStats {
        self.log.stats(tenant_id)
    }

    pub fn generate_security_report(&self, tenant_id: Option<&str>) -> SecurityReport {
        self.reporter.generate_report(tenant_id)
    }

    pub fn clear_logs(&self) {
        self.log.clear();
    }

    pub fn export_logs(&self) -> String {
        self.log.export()
    }

    pub fn metrics_snapshot(&self) -> GuardMetricsSnapshot {
        metrics::snapshot()
    }
}
