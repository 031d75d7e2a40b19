// SPDX-License-Identifier: Apache-2.0

//! Risk Classifier
//!
//! Pure function from (entity descriptor, operation kind, tenant presence) to
//! a risk level plus warnings. Every rule is evaluated; the resulting level is
//! the maximum across the rules that fire.

use serde::{Deserialize, Serialize};

use super::types::RiskLevel;
use crate::engine::types::OperationKind;
use crate::schema::{EntityCategory, EntityDescriptor};

pub const WARN_MISSING_TENANT_FILTER: &str = "missing tenant filter";
pub const WARN_BULK_WITHOUT_FILTER: &str = "bulk operation without tenant filter";
pub const WARN_RAW_QUERY: &str = "raw query requires manual review";
pub const WARN_JUNCTION_ACCESS: &str = "junction access without direct tenant filter";
pub const WARN_CROSS_TENANT: &str = "cross-tenant access";
pub const WARN_QUERY_FAILED: &str = "query failed";

/// Everything the classifier looks at
#[derive(Debug, Clone, Copy)]
pub struct RiskInput<'a> {
    /// `None` for entities absent from the registry
    pub descriptor: Option<&'a EntityDescriptor>,
    pub kind: OperationKind,
    pub has_tenant_filter: bool,
    pub extracted_tenant: Option<&'a str>,
    /// Tenant the caller claims to act for, when known
    pub expected_tenant: Option<&'a str>,
}

impl RiskInput<'_> {
    fn is_tenant_scoped(&self) -> bool {
        self.descriptor.map(|d| d.is_tenant_scoped).unwrap_or(false)
    }

    fn is_junction(&self) -> bool {
        self.descriptor
            .map(|d| d.category == EntityCategory::Junction)
            .unwrap_or(false)
    }
}

/// A static classification rule
struct RiskRule {
    level: RiskLevel,
    warning: &'static str,
    applies: fn(&RiskInput<'_>) -> bool,
}

const BUILTIN_RULES: [RiskRule; 4] = [
    RiskRule {
        level: RiskLevel::Critical,
        warning: WARN_MISSING_TENANT_FILTER,
        applies: |input| input.is_tenant_scoped() && !input.has_tenant_filter,
    },
    RiskRule {
        level: RiskLevel::Critical,
        warning: WARN_BULK_WITHOUT_FILTER,
        applies: |input| {
            input.kind == OperationKind::BulkWrite
                && input.is_tenant_scoped()
                && !input.has_tenant_filter
        },
    },
    RiskRule {
        level: RiskLevel::Medium,
        warning: WARN_RAW_QUERY,
        applies: |input| input.kind == OperationKind::Raw,
    },
    RiskRule {
        level: RiskLevel::Low,
        warning: WARN_JUNCTION_ACCESS,
        applies: |input| input.is_junction() && !input.has_tenant_filter,
    },
];

/// Classification outcome
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub warnings: Vec<String>,
}

impl RiskAssessment {
    fn raise(&mut self, level: RiskLevel, warning: String) {
        self.level = self.level.max(level);
        self.warnings.push(warning);
    }

    /// Failed calls are never reported below `high`
    pub fn escalate_for_failure(&mut self, reason: &str) {
        self.raise(RiskLevel::High, format!("{}: {}", WARN_QUERY_FAILED, reason));
    }
}

pub fn classify(input: &RiskInput<'_>) -> RiskAssessment {
    let mut assessment = RiskAssessment::default();

    for rule in &BUILTIN_RULES {
        if (rule.applies)(input) {
            assessment.raise(rule.level, rule.warning.to_string());
        }
    }

    if let (Some(expected), Some(found)) = (input.expected_tenant, input.extracted_tenant) {
        if expected != found {
            assessment.raise(
                RiskLevel::Critical,
                format!("{}: expected {}, found {}", WARN_CROSS_TENANT, expected, found),
            );
        }
    }

    assessment
}
