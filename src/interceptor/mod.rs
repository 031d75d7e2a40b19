// SPDX-License-Identifier: Apache-2.0

//! Tenant-isolation Query Interceptor
//!
//! Every data-access call passes through here:
//! - **Extraction**: finds the tenant id a call is scoped to, if any
//! - **Classification**: assigns a risk level and warnings
//! - **Logging**: keeps a bounded in-memory buffer of query events
//!
//! Enforcement (blocking, filter injection) lives in [`crate::guard`].

pub mod extract;
pub mod log_store;
pub mod pipeline;
pub mod risk;
pub mod types;

pub use extract::{extract_tenant, ExtractedTenant, TenantSource};
pub use log_store::QueryLogStore;
pub use pipeline::{QueryContext, QueryInterceptor};
pub use risk::{classify, RiskAssessment, RiskInput};
pub use types::*;
