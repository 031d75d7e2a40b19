// SPDX-License-Identifier: Apache-2.0

//! Error types for the guard layer
//!
//! Store failures are wrapped transparently: the inner [`StoreError`] is the
//! exact value the store produced.

use thiserror::Error;

use crate::engine::error::StoreError;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("Schema registry is inconsistent: {}", .issues.join("; "))]
    Configuration { issues: Vec<String> },

    #[error(
        "Blocked {operation} on '{entity}': unscoped bulk mutations are not allowed, use {alternative} with an explicit tenant id"
    )]
    Blocked {
        entity: String,
        operation: String,
        alternative: &'static str,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Tenant '{key}' could not be resolved: {message}")]
    TenantResolution { key: String, message: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Configuration file error: {message}")]
    Config { message: String },
}

impl GuardError {
    pub fn blocked(
        entity: impl Into<String>,
        operation: impl Into<String>,
        alternative: &'static str,
    ) -> Self {
        Self::Blocked {
            entity: entity.into(),
            operation: operation.into(),
            alternative,
        }
    }

    pub fn tenant_resolution(key: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::TenantResolution {
            key: key.into(),
            message: msg.into(),
        }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument { message: msg.into() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config { message: msg.into() }
    }

    /// Returns the underlying store error, if this is one
    pub fn as_store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}

/// Result type alias for guard operations
pub type GuardResult<T> = Result<T, GuardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_message_names_the_alternative() {
        let err = GuardError::blocked("player", "delete_many", "safe_bulk_delete");
        let message = err.to_string();
        assert!(message.contains("safe_bulk_delete"));
        assert!(message.contains("player"));
        assert!(err.is_blocked());
    }

    #[test]
    fn store_errors_pass_through_transparently() {
        let inner = StoreError::Timeout { timeout_ms: 500 };
        let err = GuardError::from(inner.clone());
        assert_eq!(err.to_string(), inner.to_string());
        assert_eq!(err.as_store_error(), Some(&inner));
    }
}
