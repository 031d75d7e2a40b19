use std::sync::Arc;

use tenant_guard::config::GuardConfig;
use tenant_guard::engine::InMemoryStore;
use tenant_guard::error::GuardError;
use tenant_guard::report::generator::RECOMMEND_ALL_CLEAR;
use tenant_guard::schema::{Entity, EntityDescriptor, SchemaRegistry};
use tenant_guard::GuardState;

#[tokio::test]
async fn test_guard_state_initialization() {
    // Verifies the state is wired from one config: shared log, shared
    // registry, and a report over an empty log.
    let config = GuardConfig {
        log_capacity: 25,
        ..Default::default()
    };
    let state = GuardState::new(config, Arc::new(InMemoryStore::new())).unwrap();

    assert_eq!(state.log.capacity(), 25);
    assert!(Arc::ptr_eq(state.interceptor.log(), &state.log));
    assert!(Arc::ptr_eq(state.interceptor.registry(), &state.registry));
    assert_eq!(state.interceptor.store_id(), "memory");

    let report = state.generate_security_report(None);
    assert_eq!(report.summary.total_queries, 0);
    assert_eq!(report.summary.compliance_percent, 100.0);
    assert!(report.schema_consistency.valid);
    assert_eq!(report.recommendations, vec![RECOMMEND_ALL_CLEAR.to_string()]);
}

#[test]
fn test_builtin_registry_passes_strict_startup() {
    let strict = GuardConfig {
        strict_schema: true,
        ..Default::default()
    };
    let state = GuardState::new(strict, Arc::new(InMemoryStore::new())).unwrap();
    let consistency = state.registry.validate_consistency();
    assert!(consistency.issues.is_empty(), "issues: {:?}", consistency.issues);
}

#[test]
fn test_strict_schema_refuses_inconsistent_registry() {
    // Player declared agnostic while it must be tenant-scoped
    let registry = Arc::new(SchemaRegistry::from_descriptors(vec![
        EntityDescriptor::agnostic(Entity::Player),
        EntityDescriptor::scoped(Entity::Trial),
        EntityDescriptor::scoped(Entity::CalendarEvent),
        EntityDescriptor::scoped(Entity::Team),
    ]));

    let strict = GuardConfig {
        strict_schema: true,
        ..Default::default()
    };
    let result = GuardState::with_registry(strict, Arc::new(InMemoryStore::new()), registry.clone());
    assert!(matches!(result, Err(GuardError::Configuration { .. })));

    // Lenient mode starts and surfaces the problem in reports instead
    let state =
        GuardState::with_registry(GuardConfig::default(), Arc::new(InMemoryStore::new()), registry)
            .unwrap();
    let report = state.generate_security_report(None);
    assert!(!report.schema_consistency.valid);
    assert!(report
        .recommendations
        .iter()
        .any(|r| r.starts_with("Fix the schema registry")));
}

#[test]
fn test_config_round_trip_through_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = GuardConfig {
        entity_violation_threshold: 2,
        redacted_fields: vec!["apiKey".to_string()],
        ..Default::default()
    };
    config.save(dir.path()).unwrap();

    let loaded = GuardConfig::load(dir.path()).unwrap();
    assert_eq!(loaded, config);
    assert!(loaded.is_redacted("APIKEY"));
    assert!(!loaded.is_redacted("password"));
}
