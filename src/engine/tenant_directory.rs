// SPDX-License-Identifier: Apache-2.0

//! Static tenant directory
//!
//! Maps tenant slugs (and ids) to canonical tenant ids. Stands in for the
//! application's real directory in tests and the demo binary.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::engine::traits::TenantResolver;

#[derive(Debug, Clone, Default)]
pub struct StaticTenantDirectory {
    by_key: HashMap<String, String>,
}

impl StaticTenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tenant; both the slug and the id resolve to `id`
    pub fn with_tenant(mut self, slug: &str, id: &str) -> Self {
        self.by_key.insert(slug.to_ascii_lowercase(), id.to_string());
        self.by_key.insert(id.to_ascii_lowercase(), id.to_string());
        self
    }
}

#[async_trait]
impl TenantResolver for StaticTenantDirectory {
    async fn resolve(&self, key: &str) -> Result<Option<String>, String> {
        Ok(self.by_key.get(&key.trim().to_ascii_lowercase()).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_slug_and_id_resolve() {
        let directory = StaticTenantDirectory::new().with_tenant("riverside-fc", "t-123");
        assert_eq!(directory.resolve("Riverside-FC").await, Ok(Some("t-123".to_string())));
        assert_eq!(directory.resolve("t-123").await, Ok(Some("t-123".to_string())));
        assert_eq!(directory.resolve("unknown").await, Ok(None));
    }
}
