use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{conditions_json, users_json, FlagPatch, FlagStore, NewFlag, StoredFlag};
use crate::error::FlagError;

const COLUMNS: &str =
    "id, name, description, enabled, rollout_percentage, users, conditions, created_at, updated_at";

/// Flags stored in the `feature_flags` table.
#[derive(Debug, Clone)]
pub struct PgFlagStore {
    db: PgPool,
}

impl PgFlagStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn connect(database_url: &str) -> Result<Self, FlagError> {
        let db = PgPool::connect(database_url).await?;
        Ok(Self::new(db))
    }

    /// Applies the bundled migrations.
    pub async fn migrate(&self) -> Result<(), FlagError> {
        sqlx::migrate!("./migrations").run(&self.db).await?;
        Ok(())
    }
}

// Maps unique violations on `name` to a conflict
fn map_write_error(e: sqlx::Error, name: Option<&str>) -> FlagError {
    if let Some(db_error) = e.as_database_error() {
        if db_error.code() == Some(std::borrow::Cow::Borrowed("23505")) {
            return FlagError::Conflict(name.unwrap_or_default().to_string());
        }
    }
    tracing::error!(error = ?e, "flag write failed");
    FlagError::Database(e)
}

#[async_trait]
impl FlagStore for PgFlagStore {
    async fn create(&self, flag: NewFlag) -> Result<StoredFlag, FlagError> {
        let query = format!(
            r#"
            INSERT INTO feature_flags (id, name, description, enabled, rollout_percentage, users, conditions)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "#
        );

        sqlx::query_as::<_, StoredFlag>(&query)
            .bind(Uuid::new_v4())
            .bind(&flag.name)
            .bind(&flag.description)
            .bind(flag.enabled)
            .bind(flag.rollout_percentage)
            .bind(users_json(&flag.users))
            .bind(conditions_json(&flag.conditions))
            .fetch_one(&self.db)
            .await
            .map_err(|e| map_write_error(e, Some(&flag.name)))
    }

    async fn list(&self) -> Result<Vec<StoredFlag>, FlagError> {
        let query = format!("SELECT {COLUMNS} FROM feature_flags ORDER BY created_at DESC");

        let flags = sqlx::query_as::<_, StoredFlag>(&query)
            .fetch_all(&self.db)
            .await?;

        Ok(flags)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<StoredFlag>, FlagError> {
        let query = format!("SELECT {COLUMNS} FROM feature_flags WHERE name = $1");

        let flag = sqlx::query_as::<_, StoredFlag>(&query)
            .bind(name)
            .fetch_optional(&self.db)
            .await?;

        Ok(flag)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<StoredFlag>, FlagError> {
        let query = format!("SELECT {COLUMNS} FROM feature_flags WHERE id = $1");

        let flag = sqlx::query_as::<_, StoredFlag>(&query)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(flag)
    }

    async fn update(&self, id: Uuid, patch: FlagPatch) -> Result<StoredFlag, FlagError> {
        let query = format!(
            r#"
            UPDATE feature_flags
            SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                enabled = COALESCE($4, enabled),
                rollout_percentage = COALESCE($5, rollout_percentage),
                users = COALESCE($6, users),
                conditions = COALESCE($7, conditions),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        );

        sqlx::query_as::<_, StoredFlag>(&query)
            .bind(id)
            .bind(patch.name.as_deref())
            .bind(patch.description.as_deref())
            .bind(patch.enabled)
            .bind(patch.rollout_percentage)
            .bind(users_json(&patch.users))
            .bind(conditions_json(&patch.conditions))
            .fetch_optional(&self.db)
            .await
            .map_err(|e| map_write_error(e, patch.name.as_deref()))?
            .ok_or_else(|| FlagError::NotFound(id.to_string()))
    }

    async fn toggle(&self, id: Uuid) -> Result<StoredFlag, FlagError> {
        let query = format!(
            r#"
            UPDATE feature_flags
            SET enabled = NOT enabled, updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        );

        sqlx::query_as::<_, StoredFlag>(&query)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| FlagError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: Uuid) -> Result<StoredFlag, FlagError> {
        let query = format!("DELETE FROM feature_flags WHERE id = $1 RETURNING {COLUMNS}");

        sqlx::query_as::<_, StoredFlag>(&query)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| FlagError::NotFound(id.to_string()))
    }
}
