// SPDX-License-Identifier: Apache-2.0

//! Request types for the data-access layer
//!
//! A request names an entity, the ORM-style operation and an argument bag.
//! Arguments stay loosely typed JSON documents on the wire; unrecognized keys
//! in the bag are ignored rather than rejected.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::EntityRef;

/// A JSON object used for filters and write payloads
pub type Document = Map<String, Value>;

/// Coarse classification of an operation, used for risk rules and stats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Read,
    Write,
    BulkWrite,
    Raw,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::BulkWrite => "bulk_write",
            Self::Raw => "raw",
        }
    }
}

/// Concrete data-access operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    FindUnique,
    FindFirst,
    FindMany,
    Count,
    Aggregate,
    Create,
    CreateMany,
    Update,
    Upsert,
    Delete,
    UpdateMany,
    DeleteMany,
    QueryRaw,
    ExecuteRaw,
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::FindUnique | Self::FindFirst | Self::FindMany | Self::Count | Self::Aggregate => {
                OperationKind::Read
            }
            Self::Create | Self::CreateMany | Self::Update | Self::Upsert | Self::Delete => {
                OperationKind::Write
            }
            Self::UpdateMany | Self::DeleteMany => OperationKind::BulkWrite,
            Self::QueryRaw | Self::ExecuteRaw => OperationKind::Raw,
        }
    }

    /// Returns true if this operation modifies data
    pub fn is_mutation(&self) -> bool {
        !matches!(self.kind(), OperationKind::Read) && *self != Self::QueryRaw
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FindUnique => "find_unique",
            Self::FindFirst => "find_first",
            Self::FindMany => "find_many",
            Self::Count => "count",
            Self::Aggregate => "aggregate",
            Self::Create => "create",
            Self::CreateMany => "create_many",
            Self::Update => "update",
            Self::Upsert => "upsert",
            Self::Delete => "delete",
            Self::UpdateMany => "update_many",
            Self::DeleteMany => "delete_many",
            Self::QueryRaw => "query_raw",
            Self::ExecuteRaw => "execute_raw",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Argument bag for a data-access call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryArgs {
    /// `where` clause
    #[serde(default, alias = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Document>,
    /// `data` for create/update
    #[serde(default, alias = "data", skip_serializing_if = "Option::is_none")]
    pub payload: Option<Document>,
    /// SQL text for raw operations
    #[serde(default, alias = "sql", skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl QueryArgs {
    pub fn filter(filter: Document) -> Self {
        Self {
            filter: Some(filter),
            ..Default::default()
        }
    }

    pub fn payload(payload: Document) -> Self {
        Self {
            payload: Some(payload),
            ..Default::default()
        }
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            raw: Some(sql.into()),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: Document) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_payload(mut self, payload: Document) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Builds args from an arbitrary JSON value, ignoring keys it does not know.
    /// Anything that is not an object yields empty args.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }
}

/// A single data-access call as seen by the interceptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRequest {
    pub entity: EntityRef,
    pub operation: Operation,
    #[serde(default)]
    pub args: QueryArgs,
}

impl StoreRequest {
    pub fn new(entity: impl Into<EntityRef>, operation: Operation, args: QueryArgs) -> Self {
        Self {
            entity: entity.into(),
            operation,
            args,
        }
    }
}
