// SPDX-License-Identifier: Apache-2.0

//! Schema Registry
//!
//! Static table describing, per entity, whether it is tenant-scoped, which
//! field carries the tenant id and how it relates to tenants. Built once and
//! never mutated afterwards.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityRef};
use crate::error::{GuardError, GuardResult};

/// Field name used by every directly scoped entity
pub const TENANT_FIELD: &str = "tenantId";

/// Entities that must be present and tenant-scoped for the registry to be valid
pub const REQUIRED_TENANT_SCOPED: [Entity; 4] = [
    Entity::Player,
    Entity::Trial,
    Entity::CalendarEvent,
    Entity::Team,
];

/// Relationship of an entity to tenants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityCategory {
    TenantScoped,
    TenantAgnostic,
    Junction,
}

/// Per-entity tenancy metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub entity: Entity,
    pub is_tenant_scoped: bool,
    pub tenant_field: Option<&'static str>,
    pub category: EntityCategory,
    /// Tenant-scoped parents a junction row is reachable through
    pub scoped_through: &'static [Entity],
}

impl EntityDescriptor {
    pub const fn scoped(entity: Entity) -> Self {
        Self {
            entity,
            is_tenant_scoped: true,
            tenant_field: Some(TENANT_FIELD),
            category: EntityCategory::TenantScoped,
            scoped_through: &[],
        }
    }

    pub const fn agnostic(entity: Entity) -> Self {
        Self {
            entity,
            is_tenant_scoped: false,
            tenant_field: None,
            category: EntityCategory::TenantAgnostic,
            scoped_through: &[],
        }
    }

    pub const fn junction(entity: Entity, scoped_through: &'static [Entity]) -> Self {
        Self {
            entity,
            is_tenant_scoped: false,
            tenant_field: None,
            category: EntityCategory::Junction,
            scoped_through,
        }
    }
}

fn builtin_descriptors() -> Vec<EntityDescriptor> {
    vec![
        EntityDescriptor::agnostic(Entity::Tenant),
        EntityDescriptor::agnostic(Entity::User),
        EntityDescriptor::scoped(Entity::Player),
        EntityDescriptor::scoped(Entity::Trial),
        EntityDescriptor::scoped(Entity::CalendarEvent),
        EntityDescriptor::scoped(Entity::Team),
        EntityDescriptor::scoped(Entity::TrialEvaluation),
        EntityDescriptor::junction(Entity::PlayerTeam, &[Entity::Player, Entity::Team]),
        EntityDescriptor::junction(Entity::TenantMember, &[Entity::Tenant, Entity::User]),
    ]
}

/// Outcome of a registry self-check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConsistency {
    pub valid: bool,
    pub issues: Vec<String>,
}

/// Immutable table of entity descriptors
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    descriptors: Vec<EntityDescriptor>,
}

static BUILTIN: OnceLock<Arc<SchemaRegistry>> = OnceLock::new();

impl SchemaRegistry {
    /// Process-wide registry for the application's entities
    pub fn shared() -> Arc<SchemaRegistry> {
        Arc::clone(BUILTIN.get_or_init(|| Arc::new(Self::from_descriptors(builtin_descriptors()))))
    }

    /// Builds a registry from an explicit table
    pub fn from_descriptors(descriptors: Vec<EntityDescriptor>) -> Self {
        Self { descriptors }
    }

    pub fn descriptors(&self) -> &[EntityDescriptor] {
        &self.descriptors
    }

    pub fn describe(&self, entity: &EntityRef) -> Option<&EntityDescriptor> {
        let entity = entity.known()?;
        self.descriptors.iter().find(|d| d.entity == entity)
    }

    /// Unknown entities never require a filter
    pub fn requires_tenant_filter(&self, entity: &EntityRef) -> bool {
        self.describe(entity)
            .map(|d| d.is_tenant_scoped)
            .unwrap_or(false)
    }

    pub fn tenant_field_for(&self, entity: &EntityRef) -> Option<&'static str> {
        self.describe(entity).and_then(|d| d.tenant_field)
    }

    pub fn category_of(&self, entity: &EntityRef) -> Option<EntityCategory> {
        self.describe(entity).map(|d| d.category)
    }

    /// Checks the table for contradictions. Never fails; problems are listed.
    pub fn validate_consistency(&self) -> SchemaConsistency {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        for descriptor in &self.descriptors {
            let name = descriptor.entity.name();

            if !seen.insert(descriptor.entity) {
                issues.push(format!("{}: duplicate descriptor", name));
            }

            match (descriptor.is_tenant_scoped, descriptor.tenant_field) {
                (true, None) => {
                    issues.push(format!("{}: tenant-scoped but has no tenant field", name))
                }
                (false, Some(field)) => issues.push(format!(
                    "{}: declares tenant field '{}' but is not tenant-scoped",
                    name, field
                )),
                _ => {}
            }

            let category_scoped = descriptor.category == EntityCategory::TenantScoped;
            if descriptor.is_tenant_scoped != category_scoped {
                issues.push(format!(
                    "{}: scoped flag ({}) contradicts category {:?}",
                    name, descriptor.is_tenant_scoped, descriptor.category
                ));
            }

            if descriptor.category == EntityCategory::Junction {
                // The tenant entity anchors its own junctions
                let reachable = descriptor.scoped_through.iter().any(|parent| {
                    *parent == Entity::Tenant
                        || self
                            .descriptors
                            .iter()
                            .any(|d| d.entity == *parent && d.is_tenant_scoped)
                });
                if !reachable {
                    issues.push(format!(
                        "{}: junction is not reachable through any tenant-scoped entity",
                        name
                    ));
                }
            }
        }

        for required in REQUIRED_TENANT_SCOPED {
            match self.descriptors.iter().find(|d| d.entity == required) {
                None => issues.push(format!(
                    "{}: required tenant-scoped entity is missing",
                    required.name()
                )),
                Some(d) if !d.is_tenant_scoped => issues.push(format!(
                    "{}: required entity is not tenant-scoped",
                    required.name()
                )),
                Some(_) => {}
            }
        }

        SchemaConsistency {
            valid: issues.is_empty(),
            issues,
        }
    }

    /// Like [`validate_consistency`](Self::validate_consistency), but as an error
    pub fn ensure_consistent(&self) -> GuardResult<()> {
        let consistency = self.validate_consistency();
        if consistency.valid {
            Ok(())
        } else {
            Err(GuardError::Configuration {
                issues: consistency.issues,
            })
        }
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::from_descriptors(builtin_descriptors())
    }
}
