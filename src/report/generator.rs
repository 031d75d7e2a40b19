// SPDX-License-Identifier: Apache-2.0

//! Security Report Generator
//!
//! Turns a snapshot of the query log plus the registry's self-check into a
//! compliance report. Apart from `generated_at`, the report depends only on
//! the events and the registry it is given.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::types::{ReportSummary, SecurityReport, SecurityViolation, ViolationType};
use crate::interceptor::{QueryEvent, QueryLogStore, RiskLevel};
use crate::schema::{SchemaConsistency, SchemaRegistry};

pub const RECOMMEND_URGENT: &str =
    "Critical tenant-isolation violations detected: escalate immediately and audit affected tenants";
pub const RECOMMEND_ALL_CLEAR: &str =
    "No tenant-isolation violations detected; continue monitoring query logs";

pub struct SecurityReporter {
    log: Arc<QueryLogStore>,
    registry: Arc<SchemaRegistry>,
    entity_violation_threshold: usize,
}

impl SecurityReporter {
    pub fn new(
        log: Arc<QueryLogStore>,
        registry: Arc<SchemaRegistry>,
        entity_violation_threshold: usize,
    ) -> Self {
        Self {
            log,
            registry,
            entity_violation_threshold,
        }
    }

    /// Builds a report over the current log, optionally for one tenant
    pub fn generate_report(&self, tenant_id: Option<&str>) -> SecurityReport {
        let events = self.log.snapshot();
        let consistency = self.registry.validate_consistency();
        let report = build_report(
            &events,
            tenant_id,
            consistency,
            self.entity_violation_threshold,
        );

        info!(
            tenant_scope = ?tenant_id,
            total = report.summary.total_queries,
            violations = report.summary.violation_count,
            compliance = report.summary.compliance_percent,
            "Generated security report"
        );

        report
    }
}

/// Pure report construction over an event slice
pub fn build_report(
    events: &[QueryEvent],
    tenant_id: Option<&str>,
    schema_consistency: SchemaConsistency,
    entity_violation_threshold: usize,
) -> SecurityReport {
    let scoped: Vec<&QueryEvent> = events
        .iter()
        .filter(|e| match tenant_id {
            Some(tenant) => e.tenant_id.as_deref() == Some(tenant),
            None => true,
        })
        .collect();

    let violations: Vec<SecurityViolation> = scoped
        .iter()
        .filter(|e| e.is_violation())
        .flat_map(|e| violations_for(e))
        .collect();

    let total = scoped.len();
    let violating = scoped.iter().filter(|e| e.is_violation()).count();
    let compliance_percent = if total == 0 {
        100.0
    } else {
        (total - violating) as f64 / total as f64 * 100.0
    };

    let summary = ReportSummary {
        total_queries: total,
        violating_queries: violating,
        violation_count: violations.len(),
        critical_count: count_severity(&violations, RiskLevel::Critical),
        high_count: count_severity(&violations, RiskLevel::High),
        compliance_percent,
    };

    let recommendations = recommend(
        &summary,
        &violations,
        &schema_consistency,
        entity_violation_threshold,
    );

    SecurityReport {
        tenant_scope: tenant_id.map(str::to_string),
        generated_at: Utc::now(),
        summary,
        violations,
        recommendations,
        schema_consistency,
    }
}

fn violations_for(event: &QueryEvent) -> Vec<SecurityViolation> {
    // A risky event without warnings still counts once
    let warnings: Vec<&str> = if event.warnings.is_empty() {
        vec![""]
    } else {
        event.warnings.iter().map(String::as_str).collect()
    };

    warnings
        .into_iter()
        .map(|warning| {
            let violation_type = ViolationType::from_warning(warning);
            SecurityViolation {
                id: Uuid::new_v4().to_string(),
                violation_type,
                severity: violation_type.base_severity().unwrap_or(event.risk_level),
                source_event_id: event.id.clone(),
                entity: event.entity.clone(),
                operation_kind: event.operation_kind,
                tenant_id: event.tenant_id.clone(),
                timestamp: event.timestamp,
                warning: warning.to_string(),
                remediation_hint: violation_type.remediation_hint().to_string(),
            }
        })
        .collect()
}

fn count_severity(violations: &[SecurityViolation], level: RiskLevel) -> usize {
    violations.iter().filter(|v| v.severity == level).count()
}

fn recommend(
    summary: &ReportSummary,
    violations: &[SecurityViolation],
    schema_consistency: &SchemaConsistency,
    entity_violation_threshold: usize,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if summary.critical_count > 0 {
        recommendations.push(RECOMMEND_URGENT.to_string());
    }

    let mut by_entity: BTreeMap<&str, usize> = BTreeMap::new();
    for violation in violations {
        *by_entity.entry(violation.entity.as_str()).or_insert(0) += 1;
    }
    for (entity, count) in by_entity {
        if count > entity_violation_threshold {
            recommendations.push(format!(
                "Entity '{}' has {} violations: review every data-access path touching it",
                entity, count
            ));
        }
    }

    if !schema_consistency.valid {
        recommendations.push(format!(
            "Fix the schema registry before relying on this report: {}",
            schema_consistency.issues.join("; ")
        ));
    }

    if violations.is_empty() {
        recommendations.push(RECOMMEND_ALL_CLEAR.to_string());
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::Operation;
    use crate::interceptor::risk::{WARN_MISSING_TENANT_FILTER, WARN_RAW_QUERY};
    use crate::schema::{Entity, EntityRef};

    fn consistent() -> SchemaConsistency {
        SchemaConsistency {
            valid: true,
            issues: Vec::new(),
        }
    }

    fn clean(entity: Entity, tenant: &str) -> QueryEvent {
        let mut event = QueryEvent::new(&EntityRef::from(entity), Operation::FindMany);
        event.tenant_id = Some(tenant.to_string());
        event.has_tenant_filter = true;
        event
    }

    fn unscoped(entity: Entity) -> QueryEvent {
        let mut event = QueryEvent::new(&EntityRef::from(entity), Operation::FindMany);
        event.risk_level = RiskLevel::Critical;
        event.warnings = vec![WARN_MISSING_TENANT_FILTER.to_string()];
        event
    }

    #[test]
    fn test_empty_log_is_fully_compliant() {
        let report = build_report(&[], None, consistent(), 5);
        assert_eq!(report.summary.compliance_percent, 100.0);
        assert!(report.violations.is_empty());
        assert_eq!(report.recommendations, vec![RECOMMEND_ALL_CLEAR.to_string()]);
    }

    #[test]
    fn test_unscoped_read_produces_missing_filter_violation() {
        let events = vec![unscoped(Entity::Player), clean(Entity::Player, "t1")];
        let report = build_report(&events, None, consistent(), 5);

        assert_eq!(report.summary.total_queries, 2);
        assert_eq!(report.summary.violation_count, 1);
        assert_eq!(report.summary.critical_count, 1);
        assert_eq!(report.summary.compliance_percent, 50.0);

        let violation = &report.violations[0];
        assert_eq!(violation.violation_type, ViolationType::MissingFilter);
        assert_eq!(violation.severity, RiskLevel::Critical);
        assert_eq!(violation.source_event_id, events[0].id);
        assert_eq!(report.recommendations[0], RECOMMEND_URGENT);
    }

    #[test]
    fn test_one_violation_per_warning() {
        let mut event = QueryEvent::new(&EntityRef::parse("avatars"), Operation::QueryRaw);
        event.risk_level = RiskLevel::High;
        event.warnings = vec![
            WARN_RAW_QUERY.to_string(),
            "query failed: syntax error".to_string(),
        ];

        let report = build_report(&[event], None, consistent(), 5);
        assert_eq!(report.summary.violation_count, 2);
        assert_eq!(report.summary.violating_queries, 1);
        assert_eq!(report.summary.high_count, 1);
        assert_eq!(report.summary.compliance_percent, 0.0);
        assert!(!report.recommendations.contains(&RECOMMEND_URGENT.to_string()));
    }

    #[test]
    fn test_compliance_never_increases_with_more_violations() {
        let mut events = vec![clean(Entity::Trial, "t1"); 4];
        let mut last = build_report(&events, None, consistent(), 5).summary.compliance_percent;

        for _ in 0..5 {
            events.push(unscoped(Entity::Trial));
            let next = build_report(&events, None, consistent(), 5).summary.compliance_percent;
            assert!(next <= last);
            last = next;
        }
    }

    #[test]
    fn test_tenant_scope_filters_events() {
        let events = vec![
            clean(Entity::Team, "t1"),
            clean(Entity::Team, "t2"),
            unscoped(Entity::Team),
        ];
        let report = build_report(&events, Some("t1"), consistent(), 5);
        assert_eq!(report.tenant_scope.as_deref(), Some("t1"));
        assert_eq!(report.summary.total_queries, 1);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn test_entity_threshold_recommendation() {
        let events = vec![unscoped(Entity::CalendarEvent); 3];
        let report = build_report(&events, None, consistent(), 2);
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.contains("'calendarEvent' has 3 violations")));

        let report = build_report(&events, None, consistent(), 3);
        assert!(!report.recommendations.iter().any(|r| r.contains("calendarEvent")));
    }

    #[test]
    fn test_inconsistent_schema_is_recommended_for_fixing() {
        let consistency = SchemaConsistency {
            valid: false,
            issues: vec!["player is missing".to_string()],
        };
        let report = build_report(&[], None, consistency, 5);
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.contains("player is missing")));
        assert!(!report.schema_consistency.valid);
    }

    #[test]
    fn test_reporter_reads_log() {
        let log = Arc::new(QueryLogStore::new(10));
        log.append(unscoped(Entity::Player));
        let reporter = SecurityReporter::new(log, SchemaRegistry::shared(), 5);

        let report = reporter.generate_report(None);
        assert_eq!(report.summary.total_queries, 1);
        assert!(report.schema_consistency.valid);
        assert!(serde_json::to_value(&report).is_ok());
    }
}
