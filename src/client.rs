use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::FlagError;
use crate::evaluation::{evaluate_detailed, Evaluation, UserContext};
use crate::flags::{
    validate_conditions, validate_flag_name, validate_rollout_percentage, validate_users, Scalar,
};
use crate::store::{FlagPatch, FlagStore, NewFlag, StoredFlag};

/// Flag management and evaluation on top of a [`FlagStore`].
#[derive(Clone)]
pub struct LocalFlags {
    store: Arc<dyn FlagStore>,
}

impl LocalFlags {
    pub fn new(store: impl FlagStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn from_arc(store: Arc<dyn FlagStore>) -> Self {
        Self { store }
    }

    /// Creates a new feature flag
    pub async fn create_flag(&self, flag: NewFlag) -> Result<StoredFlag, FlagError> {
        validate_flag_name(&flag.name).map_err(FlagError::InvalidInput)?;
        if let Some(percentage) = flag.rollout_percentage {
            validate_rollout_percentage(percentage).map_err(FlagError::InvalidInput)?;
        }
        if let Some(users) = &flag.users {
            validate_users(users).map_err(FlagError::InvalidInput)?;
        }
        if let Some(conditions) = &flag.conditions {
            validate_conditions(conditions).map_err(FlagError::InvalidInput)?;
        }

        let created = self.store.create(flag).await?;
        info!(flag = %created.name, id = %created.id, "flag created");
        Ok(created)
    }

    /// Returns all feature flags, newest first
    pub async fn all_flags(&self) -> Result<Vec<StoredFlag>, FlagError> {
        self.store.list().await
    }

    pub async fn get_flag(&self, name: &str) -> Result<Option<StoredFlag>, FlagError> {
        self.store.find_by_name(name).await
    }

    pub async fn get_flag_by_id(&self, id: Uuid) -> Result<StoredFlag, FlagError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| FlagError::NotFound(id.to_string()))
    }

    /// Updates a feature flag by id
    pub async fn update_flag(&self, id: Uuid, patch: FlagPatch) -> Result<StoredFlag, FlagError> {
        if let Some(name) = &patch.name {
            validate_flag_name(name).map_err(FlagError::InvalidInput)?;
        }
        if let Some(percentage) = patch.rollout_percentage {
            validate_rollout_percentage(percentage).map_err(FlagError::InvalidInput)?;
        }
        if let Some(users) = &patch.users {
            validate_users(users).map_err(FlagError::InvalidInput)?;
        }
        if let Some(conditions) = &patch.conditions {
            validate_conditions(conditions).map_err(FlagError::InvalidInput)?;
        }

        let updated = self.store.update(id, patch).await?;
        info!(flag = %updated.name, id = %updated.id, "flag updated");
        Ok(updated)
    }

    /// Flips a flag's enabled state
    pub async fn toggle_flag(&self, id: Uuid) -> Result<StoredFlag, FlagError> {
        let toggled = self.store.toggle(id).await?;
        info!(flag = %toggled.name, enabled = toggled.enabled, "flag toggled");
        Ok(toggled)
    }

    /// Deletes a feature flag by id, returning the deleted flag
    pub async fn delete_flag(&self, id: Uuid) -> Result<StoredFlag, FlagError> {
        let deleted = self.store.delete(id).await?;
        info!(flag = %deleted.name, id = %deleted.id, "flag deleted");
        Ok(deleted)
    }

    /// Fetches the flag by name and evaluates it for the user.
    ///
    /// A missing flag evaluates like a disabled one.
    pub async fn evaluate(&self, flag_name: &str, user: &UserContext) -> Result<Evaluation, FlagError> {
        if flag_name.is_empty() {
            return Err(FlagError::InvalidInput("flag name cannot be empty".to_string()));
        }

        let definition = match self.store.find_by_name(flag_name).await? {
            Some(stored) => Some(stored.definition()?),
            None => None,
        };

        let evaluation = evaluate_detailed(definition.as_ref(), user)?;
        debug!(
            flag = flag_name,
            user = %user.identifier,
            enabled = evaluation.enabled,
            reason = %evaluation.reason,
            "flag evaluated"
        );
        Ok(evaluation)
    }

    /// Checks if a feature flag is enabled for a user
    pub async fn is_enabled(
        &self,
        flag_name: &str,
        user_identifier: &str,
        attributes: Option<HashMap<String, Scalar>>,
    ) -> Result<bool, FlagError> {
        let user = UserContext::new(user_identifier)?.with_attributes(attributes.unwrap_or_default());
        self.evaluate(flag_name, &user).await.map(|e| e.enabled)
    }
}
