// SPDX-License-Identifier: Apache-2.0

//! Compliance reporting over the query log.

pub mod generator;
pub mod types;

pub use generator::{build_report, SecurityReporter};
pub use types::{ReportSummary, SecurityReport, SecurityViolation, ViolationType};
