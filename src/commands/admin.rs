// SPDX-License-Identifier: Apache-2.0

//! Admin Commands
//!
//! Read-mostly operations over the query log, reports and metrics, plus a
//! JSON dispatcher for driving them from outside the process.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::interceptor::QueryLogFilter;
use crate::GuardState;

/// Envelope returned for every admin command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AdminResponse {
    fn ok(data: Option<Value>) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum AdminCommand {
    QueryLogs {
        #[serde(default)]
        filter: QueryLogFilter,
    },
    QueryStats {
        #[serde(default)]
        tenant_id: Option<String>,
    },
    GenerateSecurityReport {
        #[serde(default)]
        tenant_id: Option<String>,
    },
    ClearLogs,
    ExportLogs,
    MetricsSnapshot,
}

// ==================== Dispatch ====================

/// Runs one admin command and wraps its payload in an [`AdminResponse`]
pub fn dispatch(state: &GuardState, command: AdminCommand) -> AdminResponse {
    debug!(command = ?command, "Dispatching admin command");

    let data = match command {
        AdminCommand::QueryLogs { filter } => serde_json::to_value(state.query_logs(&filter)),
        AdminCommand::QueryStats { tenant_id } => {
            serde_json::to_value(state.query_stats(tenant_id.as_deref()))
        }
        AdminCommand::GenerateSecurityReport { tenant_id } => {
            serde_json::to_value(state.generate_security_report(tenant_id.as_deref()))
        }
        AdminCommand::ClearLogs => {
            state.clear_logs();
            return AdminResponse::ok(None);
        }
        AdminCommand::ExportLogs => Ok(Value::String(state.export_logs())),
        AdminCommand::MetricsSnapshot => serde_json::to_value(state.metrics_snapshot()),
    };

    match data {
        Ok(value) => AdminResponse::ok(Some(value)),
        Err(e) => AdminResponse::failed(format!("Failed to serialize response: {}", e)),
    }
}

/// Parses a JSON command such as `{"command": "query_stats", "tenant_id": "t1"}`
pub fn dispatch_json(state: &GuardState, raw: &str) -> AdminResponse {
    match serde_json::from_str::<AdminCommand>(raw) {
        Ok(command) => dispatch(state, command),
        Err(e) => {
            warn!("Rejected admin command: {}", e);
            AdminResponse::failed(format!("Invalid admin command: {}", e))
        }
    }
}
