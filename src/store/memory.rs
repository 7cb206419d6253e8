use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{conditions_json, users_json, FlagPatch, FlagStore, NewFlag, StoredFlag};
use crate::error::FlagError;

/// Process-local store, used when no database is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryFlagStore {
    flags: RwLock<HashMap<Uuid, StoredFlag>>,
}

impl MemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a row as-is, bypassing validation. Lets callers seed records
    /// that were written by other tools.
    pub async fn insert_raw(&self, flag: StoredFlag) {
        self.flags.write().await.insert(flag.id, flag);
    }
}

fn name_taken(flags: &HashMap<Uuid, StoredFlag>, name: &str, except: Option<Uuid>) -> bool {
    flags
        .values()
        .any(|f| f.name == name && Some(f.id) != except)
}

#[async_trait]
impl FlagStore for MemoryFlagStore {
    async fn create(&self, flag: NewFlag) -> Result<StoredFlag, FlagError> {
        let mut flags = self.flags.write().await;
        if name_taken(&flags, &flag.name, None) {
            return Err(FlagError::Conflict(flag.name));
        }

        let now = Utc::now();
        let stored = StoredFlag {
            id: Uuid::new_v4(),
            users: users_json(&flag.users),
            conditions: conditions_json(&flag.conditions),
            name: flag.name,
            description: flag.description,
            enabled: flag.enabled,
            rollout_percentage: flag.rollout_percentage,
            created_at: now,
            updated_at: now,
        };
        flags.insert(stored.id, stored.clone());

        Ok(stored)
    }

    async fn list(&self) -> Result<Vec<StoredFlag>, FlagError> {
        let mut all: Vec<StoredFlag> = self.flags.read().await.values().cloned().collect();
        all.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(all)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<StoredFlag>, FlagError> {
        Ok(self
            .flags
            .read()
            .await
            .values()
            .find(|f| f.name == name)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<StoredFlag>, FlagError> {
        Ok(self.flags.read().await.get(&id).cloned())
    }

    async fn update(&self, id: Uuid, patch: FlagPatch) -> Result<StoredFlag, FlagError> {
        let mut flags = self.flags.write().await;
        if let Some(name) = &patch.name {
            if name_taken(&flags, name, Some(id)) {
                return Err(FlagError::Conflict(name.clone()));
            }
        }

        let flag = flags
            .get_mut(&id)
            .ok_or_else(|| FlagError::NotFound(id.to_string()))?;

        if let Some(users) = users_json(&patch.users) {
            flag.users = Some(users);
        }
        if let Some(conditions) = conditions_json(&patch.conditions) {
            flag.conditions = Some(conditions);
        }
        if let Some(name) = patch.name {
            flag.name = name;
        }
        if let Some(description) = patch.description {
            flag.description = Some(description);
        }
        if let Some(enabled) = patch.enabled {
            flag.enabled = enabled;
        }
        if let Some(percentage) = patch.rollout_percentage {
            flag.rollout_percentage = Some(percentage);
        }
        flag.updated_at = Utc::now();

        Ok(flag.clone())
    }

    async fn toggle(&self, id: Uuid) -> Result<StoredFlag, FlagError> {
        let mut flags = self.flags.write().await;
        let flag = flags
            .get_mut(&id)
            .ok_or_else(|| FlagError::NotFound(id.to_string()))?;
        flag.enabled = !flag.enabled;
        flag.updated_at = Utc::now();

        Ok(flag.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<StoredFlag, FlagError> {
        self.flags
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| FlagError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Scalar;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn new_flag(name: &str) -> NewFlag {
        NewFlag {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = MemoryFlagStore::new();
        let created = store.create(new_flag("new-ui")).await.unwrap();

        assert!(!created.enabled);
        assert_eq!(created.created_at, created.updated_at);

        let by_name = store.find_by_name("new-ui").await.unwrap().unwrap();
        let by_id = store.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_name, created);
        assert_eq!(by_id, created);
        assert!(store.find_by_name("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_name() {
        let store = MemoryFlagStore::new();
        store.create(new_flag("new-ui")).await.unwrap();
        let err = store.create(new_flag("new-ui")).await.unwrap_err();
        assert!(matches!(err, FlagError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_targeting_is_stored_as_json() {
        let store = MemoryFlagStore::new();
        let mut conditions = BTreeMap::new();
        conditions.insert("role".to_string(), Scalar::from("admin"));

        let created = store
            .create(NewFlag {
                users: Some(vec!["alice".to_string()]),
                conditions: Some(conditions),
                ..new_flag("f")
            })
            .await
            .unwrap();

        assert_eq!(created.users, Some(json!(["alice"])));
        assert_eq!(created.conditions, Some(json!({"role": "admin"})));
    }

    #[tokio::test]
    async fn test_update_keeps_unset_fields() {
        let store = MemoryFlagStore::new();
        let created = store
            .create(NewFlag {
                description: Some("first".to_string()),
                rollout_percentage: Some(10),
                ..new_flag("f")
            })
            .await
            .unwrap();

        let updated = store
            .update(
                created.id,
                FlagPatch {
                    enabled: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.enabled);
        assert_eq!(updated.description.as_deref(), Some("first"));
        assert_eq!(updated.rollout_percentage, Some(10));
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_update_rename_conflict() {
        let store = MemoryFlagStore::new();
        store.create(new_flag("a")).await.unwrap();
        let b = store.create(new_flag("b")).await.unwrap();

        let err = store
            .update(
                b.id,
                FlagPatch {
                    name: Some("a".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FlagError::Conflict(_)));

        // renaming onto itself is fine
        let same = store
            .update(
                b.id,
                FlagPatch {
                    name: Some("b".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(same.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_id() {
        let store = MemoryFlagStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.update(id, FlagPatch::default()).await,
            Err(FlagError::NotFound(_))
        ));
        assert!(matches!(store.toggle(id).await, Err(FlagError::NotFound(_))));
        assert!(matches!(store.delete(id).await, Err(FlagError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_toggle_and_delete() {
        let store = MemoryFlagStore::new();
        let created = store.create(new_flag("f")).await.unwrap();

        assert!(store.toggle(created.id).await.unwrap().enabled);
        assert!(!store.toggle(created.id).await.unwrap().enabled);

        let deleted = store.delete(created.id).await.unwrap();
        assert_eq!(deleted.id, created.id);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_orders_same_instant_by_name() {
        let store = MemoryFlagStore::new();
        let now = Utc::now();
        for name in ["charlie", "alpha", "bravo"] {
            store
                .insert_raw(StoredFlag {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                    description: None,
                    enabled: false,
                    rollout_percentage: None,
                    users: None,
                    conditions: None,
                    created_at: now,
                    updated_at: now,
                })
                .await;
        }

        let names: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, ["alpha", "bravo", "charlie"]);
    }

    #[tokio::test]
    async fn test_raw_rows_load_leniently() {
        let store = MemoryFlagStore::new();
        let now = Utc::now();
        store
            .insert_raw(StoredFlag {
                id: Uuid::new_v4(),
                name: "legacy".to_string(),
                description: None,
                enabled: true,
                rollout_percentage: None,
                users: Some(json!({"not": "a list"})),
                conditions: Some(json!("role=admin")),
                created_at: now,
                updated_at: now,
            })
            .await;

        let definition = store
            .find_by_name("legacy")
            .await
            .unwrap()
            .unwrap()
            .definition()
            .unwrap();
        assert_eq!(definition.users, None);
        assert_eq!(definition.conditions, None);
    }
}
