// SPDX-License-Identifier: Apache-2.0

//! Entity schema: the closed set of entities and their tenancy metadata.

pub mod entity;
pub mod registry;

pub use entity::{Entity, EntityRef};
pub use registry::{
    EntityCategory, EntityDescriptor, SchemaConsistency, SchemaRegistry, REQUIRED_TENANT_SCOPED,
    TENANT_FIELD,
};
