// SPDX-License-Identifier: Apache-2.0

//! Interceptor Types
//!
//! Type definitions shared by the classifier, the interceptor and the log store.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::engine::types::{Operation, OperationKind};
use crate::schema::EntityRef;

/// Five-point ordinal severity assigned to every intercepted query
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 5] = [
        RiskLevel::None,
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One intercepted data-access call. Immutable once appended to the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEvent {
    /// Unique identifier
    pub id: String,
    /// Completion time of the call
    pub timestamp: DateTime<Utc>,
    /// Canonical entity name (or the raw name for unknown entities)
    pub entity: String,
    pub operation: Operation,
    pub operation_kind: OperationKind,
    /// Redacted snapshot of the argument bag
    pub args: Value,
    /// Wall time spent in the underlying call
    pub duration_ms: f64,
    /// Tenant id found in the arguments, if any
    #[serde(default)]
    pub tenant_id: Option<String>,
    pub has_tenant_filter: bool,
    pub risk_level: RiskLevel,
    /// Rule warnings, in evaluation order
    #[serde(default)]
    pub warnings: Vec<String>,
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl QueryEvent {
    pub fn new(entity: &EntityRef, operation: Operation) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            entity: entity.name().to_string(),
            operation,
            operation_kind: operation.kind(),
            args: Value::Null,
            duration_ms: 0.0,
            tenant_id: None,
            has_tenant_filter: false,
            risk_level: RiskLevel::None,
            warnings: Vec::new(),
            success: true,
            error: None,
        }
    }

    pub fn is_violation(&self) -> bool {
        self.risk_level != RiskLevel::None
    }
}

/// Filter for log queries. All criteria are optional and combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryLogFilter {
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Exact risk level
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    /// Risk level or anything above it
    #[serde(default)]
    pub min_risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default)]
    pub operation_kind: Option<OperationKind>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

impl QueryLogFilter {
    pub fn for_tenant(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: Some(tenant_id.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, event: &QueryEvent) -> bool {
        if let Some(tenant) = &self.tenant_id {
            if event.tenant_id.as_deref() != Some(tenant.as_str()) {
                return false;
            }
        }

        if let Some(level) = self.risk_level {
            if event.risk_level != level {
                return false;
            }
        }

        if let Some(min) = self.min_risk_level {
            if event.risk_level < min {
                return false;
            }
        }

        if let Some(entity) = &self.entity {
            if EntityRef::parse(entity).name() != event.entity {
                return false;
            }
        }

        if let Some(kind) = self.operation_kind {
            if event.operation_kind != kind {
                return false;
            }
        }

        true
    }
}

/// Aggregate view over the log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogStats {
    pub total: u64,
    pub counts_by_risk: BTreeMap<String, u64>,
    pub counts_by_entity: BTreeMap<String, u64>,
    pub avg_duration_ms: f64,
    /// Events with a risk level above `none`
    pub violation_count: u64,
    pub failed_count: u64,
}
