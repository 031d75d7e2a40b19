// SPDX-License-Identifier: Apache-2.0

//! Normalized error types for the underlying data store
//!
//! Whatever the backing client raises is mapped onto these variants before it
//! reaches the guard layer. The guard never rewrites them: an error that goes
//! in through the interceptor comes out as the very same value.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for data store operations
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum StoreError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Query execution error: {message}")]
    ExecutionError { message: String },

    #[error("Record not found: {message}")]
    NotFound { message: String },

    #[error("Unique constraint violated: {message}")]
    Conflict { message: String },

    #[error("Operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Transaction error: {message}")]
    TransactionError { message: String },

    #[error("Feature not supported: {message}")]
    NotSupported { message: String },
}

impl StoreError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed { message: msg.into() }
    }

    pub fn execution_error(msg: impl Into<String>) -> Self {
        Self::ExecutionError { message: msg.into() }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound { message: msg.into() }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict { message: msg.into() }
    }

    pub fn transaction_error(msg: impl Into<String>) -> Self {
        Self::TransactionError { message: msg.into() }
    }

    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported { message: msg.into() }
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
