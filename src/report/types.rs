// SPDX-License-Identifier: Apache-2.0

//! Security report types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::types::OperationKind;
use crate::interceptor::risk::{
    WARN_BULK_WITHOUT_FILTER, WARN_CROSS_TENANT, WARN_JUNCTION_ACCESS, WARN_MISSING_TENANT_FILTER,
    WARN_QUERY_FAILED, WARN_RAW_QUERY,
};
use crate::interceptor::RiskLevel;
use crate::schema::SchemaConsistency;

/// Category of a violation, derived from the warning text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationType {
    BulkRisk,
    MissingFilter,
    RawQuery,
    CrossTenant,
    QueryFailure,
    JunctionAccess,
    Other,
}

impl ViolationType {
    /// First matching pattern wins
    pub fn from_warning(warning: &str) -> Self {
        let warning = warning.to_ascii_lowercase();
        if warning.starts_with(WARN_BULK_WITHOUT_FILTER) {
            Self::BulkRisk
        } else if warning.starts_with(WARN_MISSING_TENANT_FILTER) {
            Self::MissingFilter
        } else if warning.starts_with(WARN_RAW_QUERY) {
            Self::RawQuery
        } else if warning.starts_with(WARN_CROSS_TENANT) {
            Self::CrossTenant
        } else if warning.starts_with(WARN_QUERY_FAILED) {
            Self::QueryFailure
        } else if warning.starts_with(WARN_JUNCTION_ACCESS) {
            Self::JunctionAccess
        } else {
            Self::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BulkRisk => "bulk-risk",
            Self::MissingFilter => "missing-filter",
            Self::RawQuery => "raw-query",
            Self::CrossTenant => "cross-tenant",
            Self::QueryFailure => "query-failure",
            Self::JunctionAccess => "junction-access",
            Self::Other => "other",
        }
    }

    /// Severity of the rule that produces this warning. `None` for `Other`,
    /// which takes the event's own level.
    pub fn base_severity(&self) -> Option<RiskLevel> {
        match self {
            Self::BulkRisk | Self::MissingFilter | Self::CrossTenant => Some(RiskLevel::Critical),
            Self::QueryFailure => Some(RiskLevel::High),
            Self::RawQuery => Some(RiskLevel::Medium),
            Self::JunctionAccess => Some(RiskLevel::Low),
            Self::Other => None,
        }
    }

    pub fn remediation_hint(&self) -> &'static str {
        match self {
            Self::BulkRisk => "Use safe_bulk_update/safe_bulk_delete with an explicit tenant id",
            Self::MissingFilter => "Route the call through the guarded client so the tenant filter is merged in",
            Self::RawQuery => "Review the SQL and add a tenant_id predicate, or replace it with a guarded operation",
            Self::CrossTenant => "Check how the caller resolves its tenant; the filter targets another tenant",
            Self::QueryFailure => "Inspect the store error; failed queries can hide partial writes",
            Self::JunctionAccess => "Filter junction rows through a tenant-scoped parent relation",
            Self::Other => "Review the query event manually",
        }
    }
}

/// One warning of one risky event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityViolation {
    pub id: String,
    pub violation_type: ViolationType,
    pub severity: RiskLevel,
    pub source_event_id: String,
    pub entity: String,
    pub operation_kind: OperationKind,
    pub tenant_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// The warning text this violation was derived from
    pub warning: String,
    pub remediation_hint: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_queries: usize,
    /// Events with at least one violation
    pub violating_queries: usize,
    pub violation_count: usize,
    pub critical_count: usize,
    pub high_count: usize,
    pub compliance_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityReport {
    /// Tenant the report was restricted to, if any
    pub tenant_scope: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub summary: ReportSummary,
    pub violations: Vec<SecurityViolation>,
    pub recommendations: Vec<String>,
    pub schema_consistency: SchemaConsistency,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_type_from_warning() {
        assert_eq!(
            ViolationType::from_warning(WARN_BULK_WITHOUT_FILTER),
            ViolationType::BulkRisk
        );
        assert_eq!(
            ViolationType::from_warning(WARN_MISSING_TENANT_FILTER),
            ViolationType::MissingFilter
        );
        assert_eq!(ViolationType::from_warning(WARN_RAW_QUERY), ViolationType::RawQuery);
        assert_eq!(
            ViolationType::from_warning("cross-tenant access: expected a, found b"),
            ViolationType::CrossTenant
        );
        assert_eq!(
            ViolationType::from_warning("query failed: timeout"),
            ViolationType::QueryFailure
        );
        assert_eq!(
            ViolationType::from_warning(WARN_JUNCTION_ACCESS),
            ViolationType::JunctionAccess
        );
        assert_eq!(ViolationType::from_warning("something odd"), ViolationType::Other);
    }

    #[test]
    fn test_violation_type_serializes_kebab_case() {
        let json = serde_json::to_string(&ViolationType::MissingFilter).unwrap();
        assert_eq!(json, "\"missing-filter\"");
        assert_eq!(ViolationType::JunctionAccess.as_str(), "junction-access");
    }
}
