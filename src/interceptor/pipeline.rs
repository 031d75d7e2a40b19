// SPDX-License-Identifier: Apache-2.0

//! Query Interceptor
//!
//! Orchestrates the interception workflow for every data-access call:
//! 1. Pre-execution: descriptor lookup, tenant extraction, risk classification
//! 2. Execution: the wrapped call, timed
//! 3. Post-execution: query event, diagnostics, metrics
//!
//! The wrapped call's result is handed back exactly as produced; failures
//! only add an observability side effect.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, error, warn};

use super::extract::extract_tenant;
use super::log_store::QueryLogStore;
use super::risk::{classify, RiskAssessment, RiskInput};
use super::types::{QueryEvent, RiskLevel};
use crate::config::GuardConfig;
use crate::engine::error::StoreResult;
use crate::engine::traits::DataStore;
use crate::engine::types::StoreRequest;
use crate::metrics;
use crate::observability::{redact_args, ArgShape};
use crate::schema::SchemaRegistry;

/// Pre-execution view of a call
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub request: StoreRequest,
    pub tenant_id: Option<String>,
    pub has_tenant_filter: bool,
    pub assessment: RiskAssessment,
}

/// Wraps a [`DataStore`] and logs every call into a [`QueryLogStore`]
pub struct QueryInterceptor {
    store: Arc<dyn DataStore>,
    registry: Arc<SchemaRegistry>,
    log: Arc<QueryLogStore>,
    config: GuardConfig,
}

impl QueryInterceptor {
    pub fn new(
        store: Arc<dyn DataStore>,
        registry: Arc<SchemaRegistry>,
        log: Arc<QueryLogStore>,
        config: GuardConfig,
    ) -> Self {
        Self {
            store,
            registry,
            log,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn log(&self) -> &Arc<QueryLogStore> {
        &self.log
    }

    pub fn store_id(&self) -> &'static str {
        self.store.store_id()
    }

    // ==================== Pre-execution ====================

    /// Resolves tenancy and classifies a request without executing it
    pub fn build_context(
        &self,
        request: &StoreRequest,
        expected_tenant: Option<&str>,
    ) -> QueryContext {
        let descriptor = self.registry.describe(&request.entity);
        let field = descriptor
            .and_then(|d| d.tenant_field)
            .unwrap_or(self.config.default_tenant_field.as_str());

        let extracted = extract_tenant(&request.args, field);
        let tenant_id = extracted.map(|e| e.tenant_id);
        let has_tenant_filter = tenant_id.is_some();

        let assessment = classify(&RiskInput {
            descriptor,
            kind: request.operation.kind(),
            has_tenant_filter,
            extracted_tenant: tenant_id.as_deref(),
            expected_tenant,
        });

        debug!(
            entity = %request.entity,
            operation = %request.operation,
            args = ?ArgShape(&request.args),
            risk = %assessment.level,
            "Intercepting query"
        );

        QueryContext {
            request: request.clone(),
            tenant_id,
            has_tenant_filter,
            assessment,
        }
    }

    // ==================== Execution ====================

    /// Wraps an arbitrary call. The call's output is returned untouched.
    pub async fn intercept<T, E, F, Fut>(
        &self,
        request: &StoreRequest,
        expected_tenant: Option<&str>,
        call: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let context = self.build_context(request, expected_tenant);

        let started = Instant::now();
        let outcome = call().await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let failure = outcome.as_ref().err().map(|e| e.to_string());
        self.post_execute(context, elapsed_ms, failure.as_deref());

        outcome
    }

    /// Executes a request against the wrapped store
    pub async fn execute(&self, request: &StoreRequest) -> StoreResult<Value> {
        self.execute_scoped(request, None).await
    }

    /// Executes a request on behalf of a known tenant
    pub async fn execute_scoped(
        &self,
        request: &StoreRequest,
        expected_tenant: Option<&str>,
    ) -> StoreResult<Value> {
        self.intercept(request, expected_tenant, || self.store.execute(request))
            .await
    }

    /// Executes a batch atomically through the store's transaction support.
    ///
    /// One event is logged per request. Each carries the duration of the whole
    /// transaction and, on failure, the transaction's error.
    pub async fn execute_transaction(
        &self,
        requests: &[StoreRequest],
        expected_tenant: Option<&str>,
    ) -> StoreResult<Vec<Value>> {
        let contexts: Vec<QueryContext> = requests
            .iter()
            .map(|r| self.build_context(r, expected_tenant))
            .collect();

        let started = Instant::now();
        let outcome = self.store.transaction(requests).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let failure = outcome.as_ref().err().map(|e| e.to_string());
        for context in contexts {
            self.post_execute(context, elapsed_ms, failure.as_deref());
        }

        outcome
    }

    // ==================== Post-execution ====================

    fn post_execute(&self, context: QueryContext, elapsed_ms: f64, failure: Option<&str>) {
        let QueryContext {
            request,
            tenant_id,
            has_tenant_filter,
            mut assessment,
        } = context;

        if let Some(reason) = failure {
            assessment.escalate_for_failure(reason);
        }

        let mut event = QueryEvent::new(&request.entity, request.operation);
        event.args = redact_args(&request.args, |key| self.config.is_redacted(key));
        event.duration_ms = elapsed_ms;
        event.tenant_id = tenant_id;
        event.has_tenant_filter = has_tenant_filter;
        event.risk_level = assessment.level;
        event.warnings = assessment.warnings;
        event.success = failure.is_none();
        event.error = failure.map(str::to_string);

        metrics::record_query(elapsed_ms, event.success, event.risk_level);

        if elapsed_ms >= self.config.slow_query_threshold_ms as f64 {
            metrics::record_slow();
            warn!(
                entity = %event.entity,
                operation = %event.operation,
                duration_ms = elapsed_ms,
                "Slow query"
            );
        }

        if self.config.diagnostics_enabled {
            self.emit_diagnostic(&event);
        }

        self.log.append(event);
    }

    fn emit_diagnostic(&self, event: &QueryEvent) {
        if let Some(reason) = &event.error {
            error!(
                entity = %event.entity,
                operation = %event.operation,
                tenant_id = ?event.tenant_id,
                risk = %event.risk_level,
                error = %reason,
                "Intercepted query failed"
            );
        } else if event.risk_level != RiskLevel::None {
            warn!(
                entity = %event.entity,
                operation = %event.operation,
                tenant_id = ?event.tenant_id,
                risk = %event.risk_level,
                warnings = ?event.warnings,
                "Risky query intercepted"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::StoreError;
    use crate::engine::memory::InMemoryStore;
    use crate::engine::types::{Operation, QueryArgs};
    use crate::interceptor::risk::{WARN_MISSING_TENANT_FILTER, WARN_RAW_QUERY};
    use crate::schema::Entity;
    use serde_json::json;

    fn setup() -> (Arc<InMemoryStore>, QueryInterceptor) {
        let store = Arc::new(InMemoryStore::new());
        let interceptor = QueryInterceptor::new(
            store.clone(),
            SchemaRegistry::shared(),
            Arc::new(QueryLogStore::new(100)),
            GuardConfig::default(),
        );
        (store, interceptor)
    }

    fn request(entity: Entity, operation: Operation, args: Value) -> StoreRequest {
        StoreRequest::new(entity, operation, QueryArgs::from_value(args))
    }

    #[tokio::test]
    async fn test_unscoped_read_is_logged_critical() {
        let (_, interceptor) = setup();
        interceptor
            .execute(&request(Entity::Player, Operation::FindMany, json!({ "where": {} })))
            .await
            .unwrap();

        let events = interceptor.log().snapshot();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].risk_level, RiskLevel::Critical);
        assert!(events[0].warnings.contains(&WARN_MISSING_TENANT_FILTER.to_string()));
        assert!(!events[0].has_tenant_filter);
        assert!(events[0].success);
    }

    #[tokio::test]
    async fn test_scoped_read_is_clean_and_records_tenant() {
        let (_, interceptor) = setup();
        interceptor
            .execute(&request(
                Entity::Player,
                Operation::FindMany,
                json!({ "where": { "tenantId": "t1" } }),
            ))
            .await
            .unwrap();

        let event = &interceptor.log().snapshot()[0];
        assert_eq!(event.risk_level, RiskLevel::None);
        assert_eq!(event.tenant_id.as_deref(), Some("t1"));
        assert!(event.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_returned_unchanged_and_escalated() {
        let (store, interceptor) = setup();
        let injected = StoreError::Timeout { timeout_ms: 250 };
        store.fail_next(injected.clone());

        let err = interceptor
            .execute(&request(
                Entity::Trial,
                Operation::FindFirst,
                json!({ "where": { "tenantId": "t1" } }),
            ))
            .await
            .unwrap_err();
        assert_eq!(err, injected);

        let event = &interceptor.log().snapshot()[0];
        assert_eq!(event.risk_level, RiskLevel::High);
        assert!(!event.success);
        assert_eq!(event.error.as_deref(), Some("Operation timed out after 250ms"));
        assert_eq!(
            event.warnings,
            vec!["query failed: Operation timed out after 250ms".to_string()]
        );
    }

    #[tokio::test]
    async fn test_intercept_passes_through_foreign_errors() {
        #[derive(Debug, PartialEq)]
        struct Custom(u32);
        impl std::fmt::Display for Custom {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "custom failure {}", self.0)
            }
        }

        let (_, interceptor) = setup();
        let req = request(Entity::User, Operation::FindMany, json!({}));
        let result: Result<(), Custom> =
            interceptor.intercept(&req, None, || async { Err(Custom(7)) }).await;

        assert_eq!(result, Err(Custom(7)));
        let event = &interceptor.log().snapshot()[0];
        assert_eq!(event.risk_level, RiskLevel::High);
        assert_eq!(event.error.as_deref(), Some("custom failure 7"));
    }

    #[tokio::test]
    async fn test_raw_query_is_medium_even_with_tenant() {
        let (_, interceptor) = setup();
        let req = StoreRequest::new(
            "avatars",
            Operation::QueryRaw,
            QueryArgs::raw("SELECT * FROM avatars WHERE tenant_id = 't1'"),
        );
        let _ = interceptor.execute(&req).await;

        let event = &interceptor.log().snapshot()[0];
        assert!(event.risk_level >= RiskLevel::Medium);
        assert!(event.warnings.contains(&WARN_RAW_QUERY.to_string()));
        assert_eq!(event.tenant_id.as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn test_snapshot_redacts_sensitive_fields() {
        let (_, interceptor) = setup();
        interceptor
            .execute(&request(
                Entity::User,
                Operation::Create,
                json!({ "data": { "email": "a@b.c", "password": "hunter2" } }),
            ))
            .await
            .unwrap();

        let event = &interceptor.log().snapshot()[0];
        assert_eq!(event.args["payload"]["password"], json!("***"));
        assert_eq!(event.args["payload"]["email"], json!("a@b.c"));
    }

    #[tokio::test]
    async fn test_expected_tenant_mismatch_is_flagged() {
        let (_, interceptor) = setup();
        interceptor
            .execute_scoped(
                &request(
                    Entity::Team,
                    Operation::FindMany,
                    json!({ "where": { "tenantId": "other" } }),
                ),
                Some("mine"),
            )
            .await
            .unwrap();

        let event = &interceptor.log().snapshot()[0];
        assert_eq!(event.risk_level, RiskLevel::Critical);
        assert!(event.warnings[0].starts_with("cross-tenant access"));
    }

    #[tokio::test]
    async fn test_transaction_logs_every_request() {
        let (store, interceptor) = setup();
        let requests = vec![
            request(
                Entity::Player,
                Operation::Create,
                json!({ "data": { "tenantId": "t1", "name": "A" } }),
            ),
            request(
                Entity::Player,
                Operation::Create,
                json!({ "data": { "tenantId": "t1", "name": "B" } }),
            ),
        ];

        let results = interceptor.execute_transaction(&requests, Some("t1")).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(store.count(Entity::Player), 2);

        let events = interceptor.log().snapshot();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.risk_level == RiskLevel::None && e.success));
    }
}
