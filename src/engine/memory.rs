// SPDX-License-Identifier: Apache-2.0

//! In-memory data store
//!
//! A small document store implementing [`DataStore`], used by the demo binary
//! and tests. Filters support plain equality, `equals`, `in`, and `AND`/`OR`
//! arrays. Raw SQL is not supported.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use crate::engine::error::{StoreError, StoreResult};
use crate::engine::traits::DataStore;
use crate::engine::types::{Document, Operation, StoreRequest};
use crate::schema::EntityRef;

type Tables = HashMap<String, Vec<Document>>;

pub struct InMemoryStore {
    tables: Mutex<Tables>,
    calls: AtomicUsize,
    pending_failure: Mutex<Option<StoreError>>,
    latency: Option<Duration>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            pending_failure: Mutex::new(None),
            latency: None,
        }
    }

    /// Delays every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes the next call (single or transaction) fail with `error`
    pub fn fail_next(&self, error: StoreError) {
        *self.pending_failure.lock() = Some(error);
    }

    /// Number of `execute`/`transaction` invocations so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn count(&self, entity: impl Into<EntityRef>) -> usize {
        let entity = entity.into();
        self.tables
            .lock()
            .get(entity.name())
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn records(&self, entity: impl Into<EntityRef>) -> Vec<Document> {
        let entity = entity.into();
        self.tables
            .lock()
            .get(entity.name())
            .cloned()
            .unwrap_or_default()
    }

    /// Inserts records directly, bypassing any interception
    pub fn seed(&self, entity: impl Into<EntityRef>, records: Vec<Document>) {
        let entity = entity.into();
        self.tables
            .lock()
            .entry(entity.name().to_string())
            .or_default()
            .extend(records);
    }

    async fn begin_call(&self) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self.pending_failure.lock().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataStore for InMemoryStore {
    fn store_id(&self) -> &'static str {
        "memory"
    }

    async fn execute(&self, request: &StoreRequest) -> StoreResult<Value> {
        self.begin_call().await?;
        let mut tables = self.tables.lock();
        apply(&mut tables, request)
    }

    async fn transaction(&self, requests: &[StoreRequest]) -> StoreResult<Vec<Value>> {
        self.begin_call().await?;
        let mut tables = self.tables.lock();
        let checkpoint = tables.clone();

        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            match apply(&mut tables, request) {
                Ok(value) => results.push(value),
                Err(e) => {
                    *tables = checkpoint;
                    debug!("Transaction rolled back after {} operations", results.len());
                    return Err(e);
                }
            }
        }
        Ok(results)
    }
}

fn apply(tables: &mut Tables, request: &StoreRequest) -> StoreResult<Value> {
    let name = request.entity.name().to_string();
    let empty = Document::new();
    let filter = request.args.filter.as_ref().unwrap_or(&empty);
    let rows = tables.entry(name.clone()).or_default();

    match request.operation {
        Operation::FindUnique | Operation::FindFirst => Ok(rows
            .iter()
            .find(|r| matches(r, filter))
            .map(|r| Value::Object(r.clone()))
            .unwrap_or(Value::Null)),
        Operation::FindMany => Ok(Value::Array(
            rows.iter()
                .filter(|r| matches(r, filter))
                .map(|r| Value::Object(r.clone()))
                .collect(),
        )),
        Operation::Count => Ok(json!(rows.iter().filter(|r| matches(r, filter)).count())),
        Operation::Aggregate => Ok(json!({
            "_count": rows.iter().filter(|r| matches(r, filter)).count()
        })),
        Operation::Create => {
            let payload = request
                .args
                .payload
                .clone()
                .ok_or_else(|| StoreError::execution_error("create requires data"))?;
            insert(rows, &name, payload)
        }
        Operation::CreateMany => Err(StoreError::not_supported(
            "create_many is not supported by the in-memory store",
        )),
        Operation::Update => {
            let payload = request.args.payload.as_ref().unwrap_or(&empty);
            let row = rows
                .iter_mut()
                .find(|r| matches(r, filter))
                .ok_or_else(|| StoreError::not_found(format!("no {} matches filter", name)))?;
            merge(row, payload);
            Ok(Value::Object(row.clone()))
        }
        Operation::Upsert => {
            let payload = request.args.payload.as_ref().unwrap_or(&empty);
            if let Some(row) = rows.iter_mut().find(|r| matches(r, filter)) {
                merge(row, payload);
                return Ok(Value::Object(row.clone()));
            }
            let mut record = filter.clone();
            merge(&mut record, payload);
            insert(rows, &name, record)
        }
        Operation::Delete => {
            let pos = rows
                .iter()
                .position(|r| matches(r, filter))
                .ok_or_else(|| StoreError::not_found(format!("no {} matches filter", name)))?;
            Ok(Value::Object(rows.remove(pos)))
        }
        Operation::UpdateMany => {
            let payload = request.args.payload.as_ref().unwrap_or(&empty);
            let mut count = 0;
            for row in rows.iter_mut().filter(|r| matches(r, filter)) {
                merge(row, payload);
                count += 1;
            }
            Ok(json!({ "count": count }))
        }
        Operation::DeleteMany => {
            let before = rows.len();
            rows.retain(|r| !matches(r, filter));
            Ok(json!({ "count": before - rows.len() }))
        }
        Operation::QueryRaw | Operation::ExecuteRaw => Err(StoreError::not_supported(
            "raw SQL is not supported by the in-memory store",
        )),
    }
}

fn insert(rows: &mut Vec<Document>, name: &str, mut record: Document) -> StoreResult<Value> {
    let id = record
        .entry("id")
        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()))
        .clone();

    if rows.iter().any(|r| r.get("id") == Some(&id)) {
        return Err(StoreError::conflict(format!("{} with id {} already exists", name, id)));
    }

    rows.push(record.clone());
    Ok(Value::Object(record))
}

fn merge(row: &mut Document, payload: &Document) {
    for (key, value) in payload {
        row.insert(key.clone(), value.clone());
    }
}

fn matches(row: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, condition)| match key.as_str() {
        "AND" => sub_filters(condition).all(|f| matches(row, f)),
        "OR" => sub_filters(condition).any(|f| matches(row, f)),
        _ => matches_condition(row.get(key), condition),
    })
}

fn sub_filters(condition: &Value) -> impl Iterator<Item = &Document> {
    condition
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn matches_condition(actual: Option<&Value>, condition: &Value) -> bool {
    if let Value::Object(ops) = condition {
        if let Some(expected) = ops.get("equals") {
            return actual == Some(expected);
        }
        if let Some(Value::Array(options)) = ops.get("in") {
            return actual.map(|a| options.contains(a)).unwrap_or(false);
        }
    }
    actual == Some(condition)
}
