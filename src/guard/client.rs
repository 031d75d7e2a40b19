// SPDX-License-Identifier: Apache-2.0

//! Guarded Data-Access Facade
//!
//! The only data-access API application code should hold. Single-record
//! operations get the caller's tenant merged into their filter (or payload,
//! for creates). Unscoped bulk mutations are refused outright; tenant-scoped
//! bulk variants exist for the cases that really need them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::engine::traits::TenantResolver;
use crate::engine::types::{Document, Operation, OperationKind, QueryArgs, StoreRequest};
use crate::error::{GuardError, GuardResult};
use crate::interceptor::QueryInterceptor;
use crate::metrics;
use crate::schema::EntityRef;

const BULK_LOG_TARGET: &str = "tenant_guard::bulk";

/// One step of a tenant-scoped transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopedOperation {
    pub entity: EntityRef,
    pub operation: Operation,
    #[serde(default)]
    pub args: QueryArgs,
}

impl ScopedOperation {
    pub fn new(entity: impl Into<EntityRef>, operation: Operation, args: QueryArgs) -> Self {
        Self {
            entity: entity.into(),
            operation,
            args,
        }
    }

    pub fn read(entity: impl Into<EntityRef>, args: QueryArgs) -> Self {
        Self::new(entity, Operation::FindFirst, args)
    }

    pub fn create(entity: impl Into<EntityRef>, args: QueryArgs) -> Self {
        Self::new(entity, Operation::Create, args)
    }

    pub fn update(entity: impl Into<EntityRef>, args: QueryArgs) -> Self {
        Self::new(entity, Operation::Update, args)
    }

    pub fn delete(entity: impl Into<EntityRef>, args: QueryArgs) -> Self {
        Self::new(entity, Operation::Delete, args)
    }
}

/// Tenant-enforcing wrapper around the intercepted store
#[derive(Clone)]
pub struct GuardedClient {
    interceptor: Arc<QueryInterceptor>,
}

impl GuardedClient {
    pub fn new(interceptor: Arc<QueryInterceptor>) -> Self {
        Self { interceptor }
    }

    pub fn interceptor(&self) -> &Arc<QueryInterceptor> {
        &self.interceptor
    }

    // ==================== Single-record operations ====================

    /// First record matching `args` within the tenant, or `null`
    pub async fn safe_read(
        &self,
        entity: impl Into<EntityRef>,
        args: QueryArgs,
        tenant_id: &str,
    ) -> GuardResult<Value> {
        self.run(entity.into(), Operation::FindFirst, args, tenant_id)
            .await
    }

    /// All records matching `args` within the tenant
    pub async fn safe_read_many(
        &self,
        entity: impl Into<EntityRef>,
        args: QueryArgs,
        tenant_id: &str,
    ) -> GuardResult<Value> {
        self.run(entity.into(), Operation::FindMany, args, tenant_id)
            .await
    }

    pub async fn safe_create(
        &self,
        entity: impl Into<EntityRef>,
        args: QueryArgs,
        tenant_id: &str,
    ) -> GuardResult<Value> {
        self.run(entity.into(), Operation::Create, args, tenant_id)
            .await
    }

    pub async fn safe_update(
        &self,
        entity: impl Into<EntityRef>,
        args: QueryArgs,
        tenant_id: &str,
    ) -> GuardResult<Value> {
        self.run(entity.into(), Operation::Update, args, tenant_id)
            .await
    }

    pub async fn safe_delete(
        &self,
        entity: impl Into<EntityRef>,
        args: QueryArgs,
        tenant_id: &str,
    ) -> GuardResult<Value> {
        self.run(entity.into(), Operation::Delete, args, tenant_id)
            .await
    }

    // ==================== Bulk operations ====================

    /// Always refused. Use [`safe_bulk_update`](Self::safe_bulk_update).
    pub fn bulk_update(&self, entity: impl Into<EntityRef>, _args: QueryArgs) -> GuardResult<Value> {
        Err(self.block(entity.into(), Operation::UpdateMany, "safe_bulk_update"))
    }

    /// Always refused. Use [`safe_bulk_delete`](Self::safe_bulk_delete).
    pub fn bulk_delete(&self, entity: impl Into<EntityRef>, _args: QueryArgs) -> GuardResult<Value> {
        Err(self.block(entity.into(), Operation::DeleteMany, "safe_bulk_delete"))
    }

    pub async fn safe_bulk_update(
        &self,
        entity: impl Into<EntityRef>,
        args: QueryArgs,
        tenant_id: &str,
    ) -> GuardResult<Value> {
        self.run_bulk(entity.into(), Operation::UpdateMany, args, tenant_id)
            .await
    }

    pub async fn safe_bulk_delete(
        &self,
        entity: impl Into<EntityRef>,
        args: QueryArgs,
        tenant_id: &str,
    ) -> GuardResult<Value> {
        self.run_bulk(entity.into(), Operation::DeleteMany, args, tenant_id)
            .await
    }

    // ==================== Transactions & raw ====================

    /// Runs every operation scoped to `tenant_id` as one atomic batch.
    ///
    /// Atomicity comes from the store's transaction support. Nothing is
    /// executed if any step fails validation.
    pub async fn safe_transaction(
        &self,
        operations: Vec<ScopedOperation>,
        tenant_id: &str,
    ) -> GuardResult<Vec<Value>> {
        let requests = operations
            .into_iter()
            .map(|op| {
                if op.operation.kind() == OperationKind::Raw {
                    return Err(GuardError::invalid_argument(
                        "raw queries cannot run inside a scoped transaction",
                    ));
                }
                self.scope(op.entity, op.operation, op.args, tenant_id)
            })
            .collect::<GuardResult<Vec<_>>>()?;

        debug!(
            tenant_id = %tenant_id,
            operations = requests.len(),
            "Running scoped transaction"
        );

        let results = self
            .interceptor
            .execute_transaction(&requests, Some(tenant_id))
            .await?;
        Ok(results)
    }

    /// Raw SQL goes through unmodified; it is logged and always reviewed
    pub async fn raw_query(
        &self,
        entity: Option<EntityRef>,
        sql: &str,
        tenant_id: Option<&str>,
    ) -> GuardResult<Value> {
        self.run_raw(entity, Operation::QueryRaw, sql, tenant_id)
            .await
    }

    /// Routes a loosely-typed request to the matching guarded operation.
    ///
    /// Unscoped bulk mutations are blocked; every other non-raw operation
    /// needs a tenant.
    pub async fn dispatch(
        &self,
        request: StoreRequest,
        tenant_id: Option<&str>,
    ) -> GuardResult<Value> {
        let StoreRequest {
            entity,
            operation,
            args,
        } = request;

        match (operation, tenant_id) {
            (Operation::UpdateMany, None) => {
                Err(self.block(entity, operation, "safe_bulk_update"))
            }
            (Operation::DeleteMany, None) => {
                Err(self.block(entity, operation, "safe_bulk_delete"))
            }
            (Operation::QueryRaw | Operation::ExecuteRaw, _) => {
                let sql = args.raw.unwrap_or_default();
                self.run_raw(Some(entity), operation, &sql, tenant_id)
                    .await
            }
            (Operation::CreateMany, _) => Err(GuardError::invalid_argument(
                "create_many is not available through the guarded client",
            )),
            (_, None) => Err(GuardError::invalid_argument(format!(
                "{} on '{}' requires a tenant id",
                operation, entity
            ))),
            (Operation::UpdateMany | Operation::DeleteMany, Some(tenant)) => {
                self.run_bulk(entity, operation, args, tenant).await
            }
            (_, Some(tenant)) => self.run(entity, operation, args, tenant).await,
        }
    }

    /// Resolves a tenant slug or id through the external directory
    pub async fn resolve_tenant(
        &self,
        resolver: &dyn TenantResolver,
        key: &str,
    ) -> GuardResult<String> {
        match resolver.resolve(key).await {
            Ok(Some(id)) => Ok(id),
            Ok(None) => Err(GuardError::tenant_resolution(key, "unknown tenant")),
            Err(message) => Err(GuardError::tenant_resolution(key, message)),
        }
    }

    // ==================== Internals ====================

    async fn run(
        &self,
        entity: EntityRef,
        operation: Operation,
        args: QueryArgs,
        tenant_id: &str,
    ) -> GuardResult<Value> {
        let request = self.scope(entity, operation, args, tenant_id)?;
        let result = self
            .interceptor
            .execute_scoped(&request, Some(tenant_id))
            .await?;
        Ok(result)
    }

    async fn run_raw(
        &self,
        entity: Option<EntityRef>,
        operation: Operation,
        sql: &str,
        tenant_id: Option<&str>,
    ) -> GuardResult<Value> {
        let entity = entity.unwrap_or_else(|| EntityRef::Unknown("raw".to_string()));
        let request = StoreRequest::new(entity, operation, QueryArgs::raw(sql));
        let result = self.interceptor.execute_scoped(&request, tenant_id).await?;
        Ok(result)
    }

    async fn run_bulk(
        &self,
        entity: EntityRef,
        operation: Operation,
        args: QueryArgs,
        tenant_id: &str,
    ) -> GuardResult<Value> {
        let request = self.scope(entity, operation, args, tenant_id)?;
        let result = self
            .interceptor
            .execute_scoped(&request, Some(tenant_id))
            .await?;

        warn!(
            target: BULK_LOG_TARGET,
            entity = %request.entity,
            operation = %operation,
            tenant_id = %tenant_id,
            affected = ?result.get("count"),
            "Tenant-scoped bulk mutation executed"
        );

        Ok(result)
    }

    fn block(&self, entity: EntityRef, operation: Operation, alternative: &'static str) -> GuardError {
        metrics::record_blocked();
        warn!(
            entity = %entity,
            operation = %operation,
            alternative = alternative,
            "Blocked unscoped bulk mutation"
        );
        GuardError::blocked(entity.name(), operation.as_str(), alternative)
    }

    /// Merges the tenant into the filter, or into the payload for creates
    fn scope(
        &self,
        entity: EntityRef,
        operation: Operation,
        mut args: QueryArgs,
        tenant_id: &str,
    ) -> GuardResult<StoreRequest> {
        if tenant_id.trim().is_empty() {
            return Err(GuardError::invalid_argument("tenant id must not be empty"));
        }

        let Some(field) = self.interceptor.registry().tenant_field_for(&entity) else {
            debug!(entity = %entity, "Entity has no tenant field; passing arguments through");
            return Ok(StoreRequest::new(entity, operation, args));
        };

        if operation == Operation::Create {
            let payload = args.payload.get_or_insert_with(Document::new);
            pin_tenant(payload, field, tenant_id, &entity, operation);
        } else {
            let filter = args.filter.get_or_insert_with(Document::new);
            pin_tenant(filter, field, tenant_id, &entity, operation);

            // Writes must not move a record into another tenant
            if matches!(
                operation,
                Operation::Update | Operation::Upsert | Operation::UpdateMany
            ) {
                if let Some(payload) = args.payload.as_mut() {
                    if payload.contains_key(field) {
                        pin_tenant(payload, field, tenant_id, &entity, operation);
                    }
                }
            }
        }

        Ok(StoreRequest::new(entity, operation, args))
    }
}

/// Sets `field` to the caller's tenant, warning when it replaces another value
fn pin_tenant(
    doc: &mut Document,
    field: &str,
    tenant_id: &str,
    entity: &EntityRef,
    operation: Operation,
) {
    let tenant = Value::String(tenant_id.to_string());
    if let Some(previous) = doc.insert(field.to_string(), tenant.clone()) {
        if previous != tenant {
            warn!(
                entity = %entity,
                operation = %operation,
                supplied = %previous,
                tenant_id = %tenant_id,
                "Overriding caller-supplied tenant value"
            );
        }
    }
}
