// SPDX-License-Identifier: Apache-2.0

// Tenant Guard demo
//
// Replays a JSON file of data-access requests against the in-memory store,
// through the guard, and prints the resulting security report.
//
// usage: tenant-guard <requests.json> [data-dir]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{info, warn};

use tenant_guard::config::GuardConfig;
use tenant_guard::engine::{InMemoryStore, StoreRequest};
use tenant_guard::error::{GuardError, GuardResult};
use tenant_guard::{observability, GuardState};

const REPLAY_CONCURRENCY: usize = 4;

/// How a replayed request reaches the store
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ReplayMode {
    /// Through the guarded client, with tenant enforcement
    #[default]
    Guarded,
    /// Straight through the interceptor: observed, not enforced
    Direct,
}

#[derive(Debug, Deserialize)]
struct ReplayStep {
    #[serde(flatten)]
    request: StoreRequest,
    #[serde(default)]
    tenant: Option<String>,
    #[serde(default)]
    mode: ReplayMode,
}

#[tokio::main]
async fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let Some(requests_path) = args.next().map(PathBuf::from) else {
        eprintln!("usage: tenant-guard <requests.json> [data-dir]");
        return ExitCode::from(2);
    };
    let data_dir = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(observability::data_directory);

    observability::init_tracing(Some(data_dir.join("logs")));

    match run(&requests_path, &data_dir).await {
        Ok(report) => {
            println!("{}", report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("tenant-guard: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(requests_path: &Path, data_dir: &Path) -> GuardResult<String> {
    let config = GuardConfig::load(data_dir)?;
    let state = GuardState::new(config, Arc::new(InMemoryStore::new()))?;

    let content = tokio::fs::read_to_string(requests_path)
        .await
        .map_err(|e| GuardError::config(format!("Failed to read {:?}: {}", requests_path, e)))?;
    let steps: Vec<ReplayStep> = serde_json::from_str(&content)
        .map_err(|e| GuardError::config(format!("Failed to parse requests: {}", e)))?;

    info!(steps = steps.len(), "Replaying requests");

    let failures = stream::iter(steps)
        .map(|step| replay(&state, step))
        .buffer_unordered(REPLAY_CONCURRENCY)
        .filter(|ok| futures::future::ready(!ok))
        .count()
        .await;

    if failures > 0 {
        warn!(failures, "Some replayed requests failed");
    }

    let report = state.generate_security_report(None);
    serde_json::to_string_pretty(&report)
        .map_err(|e| GuardError::config(format!("Failed to serialize report: {}", e)))
}

async fn replay(state: &GuardState, step: ReplayStep) -> bool {
    let outcome = match step.mode {
        ReplayMode::Guarded => {
            state
                .client
                .dispatch(step.request, step.tenant.as_deref())
                .await
        }
        ReplayMode::Direct => state
            .interceptor
            .execute_scoped(&step.request, step.tenant.as_deref())
            .await
            .map_err(GuardError::from),
    };

    match outcome {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, "Replayed request failed");
            false
        }
    }
}
