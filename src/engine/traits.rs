// SPDX-License-Identifier: Apache-2.0

//! Data-access collaborator traits
//!
//! The guard layer does not talk to a database itself. It wraps whatever
//! implements [`DataStore`] and resolves tenants through a [`TenantResolver`].

use async_trait::async_trait;
use serde_json::Value;

use crate::engine::error::StoreResult;
use crate::engine::types::StoreRequest;

/// Underlying data store wrapped by the interceptor
///
/// Implementations own connection handling, timeouts and cancellation. Any
/// failure they report surfaces to callers untouched.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Returns a short identifier for this store (e.g. "memory", "postgres")
    fn store_id(&self) -> &'static str;

    /// Executes a single request and returns its result document(s)
    async fn execute(&self, request: &StoreRequest) -> StoreResult<Value>;

    /// Executes a batch atomically
    ///
    /// Either every request is applied or none is. Rollback on failure is the
    /// store's responsibility.
    async fn transaction(&self, requests: &[StoreRequest]) -> StoreResult<Vec<Value>>;
}

/// External tenant directory (slug or id → canonical tenant id)
#[async_trait]
pub trait TenantResolver: Send + Sync {
    /// Returns the canonical tenant id, or `None` if the key is unknown
    async fn resolve(&self, key: &str) -> Result<Option<String>, String>;
}
