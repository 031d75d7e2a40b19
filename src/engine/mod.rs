// SPDX-License-Identifier: Apache-2.0

// Data-access layer
// Store abstraction wrapped by the guard, plus in-memory collaborators

pub mod error;
pub mod memory;
pub mod tenant_directory;
pub mod traits;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use tenant_directory::StaticTenantDirectory;
pub use traits::{DataStore, TenantResolver};
pub use types::*;
