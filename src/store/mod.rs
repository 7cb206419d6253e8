mod memory;
mod postgres;

pub use memory::MemoryFlagStore;
pub use postgres::PgFlagStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::FlagError;
use crate::flags::{FlagDefinition, Scalar};

// MODELS

/// A flag row as persisted. `users` and `conditions` stay raw JSON so a
/// hand-edited record never prevents loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredFlag {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub rollout_percentage: Option<i32>,
    pub users: Option<Value>,
    pub conditions: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredFlag {
    pub fn definition(&self) -> Result<FlagDefinition, FlagError> {
        FlagDefinition::from_record(
            &self.name,
            self.enabled,
            self.rollout_percentage,
            self.users.as_ref(),
            self.conditions.as_ref(),
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewFlag {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    pub rollout_percentage: Option<i32>,
    pub users: Option<Vec<String>>,
    pub conditions: Option<BTreeMap<String, Scalar>>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlagPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
    pub rollout_percentage: Option<i32>,
    pub users: Option<Vec<String>>,
    pub conditions: Option<BTreeMap<String, Scalar>>,
}

pub(crate) fn users_json(users: &Option<Vec<String>>) -> Option<Value> {
    users
        .as_ref()
        .map(|u| Value::Array(u.iter().cloned().map(Value::String).collect()))
}

pub(crate) fn conditions_json(conditions: &Option<BTreeMap<String, Scalar>>) -> Option<Value> {
    conditions.as_ref().map(|c| {
        Value::Object(c.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
    })
}

/// Durable home of flag definitions.
///
/// Stores own name uniqueness (`FlagError::Conflict`), id generation and
/// timestamps. Lookups of unknown ids fail with `FlagError::NotFound`,
/// except `find_*` which return `None`.
#[async_trait]
pub trait FlagStore: Send + Sync {
    async fn create(&self, flag: NewFlag) -> Result<StoredFlag, FlagError>;
    async fn list(&self) -> Result<Vec<StoredFlag>, FlagError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<StoredFlag>, FlagError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StoredFlag>, FlagError>;
    async fn update(&self, id: Uuid, patch: FlagPatch) -> Result<StoredFlag, FlagError>;
    async fn toggle(&self, id: Uuid) -> Result<StoredFlag, FlagError>;
    /// Removes the flag and returns the deleted row.
    async fn delete(&self, id: Uuid) -> Result<StoredFlag, FlagError>;
}
