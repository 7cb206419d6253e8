use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::FlagError;

// MODELS

/// Scalar attribute value used by flag conditions and user attributes.
///
/// Numbers compare by value, so `1` and `1.0` are equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl Scalar {
    /// Converts a JSON value, returning `None` for arrays and objects.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Scalar::Null),
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => n.as_f64().map(Scalar::Number),
            Value::String(s) => Some(Scalar::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Scalar::String(s) => Value::String(s.clone()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Number(value as f64)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

/// Targeting left behind by a malformed stored record that no user can satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "attribute", rename_all = "snake_case")]
pub enum Unsatisfiable {
    /// Non-empty allow-list without a single string member.
    AllowList,
    /// Condition whose expected value is an array or object.
    Condition(String),
}

/// Read-only snapshot of a flag, as consumed by the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagDefinition {
    pub name: String,
    pub enabled: bool,
    pub rollout_percentage: Option<u8>,
    pub users: Option<Vec<String>>,
    pub conditions: Option<BTreeMap<String, Scalar>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsatisfiable: Option<Unsatisfiable>,
}

impl FlagDefinition {
    /// Creates a disabled flag with no targeting.
    pub fn new(name: impl Into<String>) -> Result<Self, FlagError> {
        let name = name.into();
        if name.is_empty() {
            return Err(FlagError::InvalidInput("flag name cannot be empty".to_string()));
        }

        Ok(Self {
            name,
            enabled: false,
            rollout_percentage: None,
            users: None,
            conditions: None,
            unsatisfiable: None,
        })
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the rollout percentage, capped at 100.
    pub fn with_rollout(mut self, percentage: u8) -> Self {
        self.rollout_percentage = Some(percentage.min(100));
        self
    }

    pub fn with_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users = Some(users.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_condition(mut self, attribute: impl Into<String>, expected: impl Into<Scalar>) -> Self {
        self.conditions
            .get_or_insert_with(BTreeMap::new)
            .insert(attribute.into(), expected.into());
        self
    }

    /// Builds a definition from loosely-typed stored fields.
    ///
    /// Malformed `users`/`conditions` never fail the load. A non-array
    /// allow-list or a non-object conditions value counts as absent.
    /// Inside them, bad entries fail closed: non-string allow-list members
    /// are dropped, but an allow-list left with no members still admits no
    /// one, and a condition expecting an array or object never matches.
    /// A negative rollout counts as unset; anything above 100 is capped.
    pub fn from_record(
        name: &str,
        enabled: bool,
        rollout_percentage: Option<i32>,
        users: Option<&Value>,
        conditions: Option<&Value>,
    ) -> Result<Self, FlagError> {
        let mut flag = Self::new(name)?.enabled(enabled);

        flag.rollout_percentage = rollout_percentage
            .filter(|p| *p >= 0)
            .map(|p| p.min(100) as u8);

        if let Some(Value::Array(items)) = users {
            let members: Vec<String> = items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
            if members.is_empty() && !items.is_empty() {
                flag.unsatisfiable = Some(Unsatisfiable::AllowList);
            }
            flag.users = Some(members);
        }

        if let Some(Value::Object(map)) = conditions {
            let mut expected = BTreeMap::new();
            for (attribute, value) in map {
                match Scalar::from_json(value) {
                    Some(scalar) => {
                        expected.insert(attribute.clone(), scalar);
                    }
                    None => {
                        flag.unsatisfiable
                            .get_or_insert_with(|| Unsatisfiable::Condition(attribute.clone()));
                    }
                }
            }
            flag.conditions = Some(expected);
        }

        Ok(flag)
    }
}

// HELPER FUNCTIONS

// Validating the flag name
pub fn validate_flag_name(name: &str) -> Result<(), String> {
    let Some(first) = name.chars().next() else {
        return Err("Flag name cannot be empty".to_string());
    };

    if name.len() > 64 {
        return Err("Flag name is too long (Max: 64 characters)".to_string());
    }

    if !first.is_ascii_alphabetic() {
        return Err("Flag name must start with a letter".to_string());
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(
            "Flag name can only contain letters, numbers, underscores, hyphens and dots".to_string(),
        );
    }

    Ok(())
}

// Checks if percentage number is between the number 0 to 100
pub fn validate_rollout_percentage(percentage: i32) -> Result<(), String> {
    if !(0..=100).contains(&percentage) {
        return Err("Rollout percentage must be between 0 and 100".to_string());
    }

    Ok(())
}

pub fn validate_users(users: &[String]) -> Result<(), String> {
    if users.iter().any(|u| u.is_empty()) {
        return Err("Allow-listed user identifiers cannot be empty".to_string());
    }

    Ok(())
}

pub fn validate_conditions(conditions: &BTreeMap<String, Scalar>) -> Result<(), String> {
    if conditions.keys().any(|k| k.is_empty()) {
        return Err("Condition attribute names cannot be empty".to_string());
    }

    Ok(())
}
