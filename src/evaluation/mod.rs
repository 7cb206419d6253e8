//! Flag evaluation.
//!
//! Decision order, each step either decides or falls through:
//!
//! 1. absent or disabled flag: `false`
//! 2. non-empty allow-list: `true` iff the user is listed, nothing else is
//!    consulted (a listed flag is exclusive, a non-listed user with matching
//!    conditions still gets `false`)
//! 3. conditions: every expected attribute must be present and equal
//! 4. rollout percentage, when set: `bucket < percentage`
//! 5. otherwise `true`
//!
//! Evaluation is pure: no I/O, no logging, inputs are never mutated.

mod bucketer;

pub use bucketer::{bucket, BUCKETS};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::FlagError;
use crate::flags::{FlagDefinition, Scalar, Unsatisfiable};

// User context for evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub identifier: String,
    #[serde(default)]
    pub attributes: HashMap<String, Scalar>,
}

impl UserContext {
    pub fn new(identifier: impl Into<String>) -> Result<Self, FlagError> {
        let identifier = identifier.into();
        if identifier.is_empty() {
            return Err(FlagError::InvalidInput(
                "user identifier cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            identifier,
            attributes: HashMap::new(),
        })
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_attributes(mut self, attributes: HashMap<String, Scalar>) -> Self {
        self.attributes.extend(attributes);
        self
    }
}

/// Which step of the decision order produced the verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reason {
    /// Flag absent or disabled; the two are deliberately indistinguishable.
    Off,
    AllowList { matched: bool },
    ConditionMismatch { attribute: String },
    Rollout { bucket: u8, percentage: u8 },
    Default,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Off => write!(f, "Flag is off"),
            Reason::AllowList { matched: true } => write!(f, "User is on the allow-list"),
            Reason::AllowList { matched: false } => write!(f, "User is not on the allow-list"),
            Reason::ConditionMismatch { attribute } => {
                write!(f, "Condition on '{}' not met", attribute)
            }
            Reason::Rollout { bucket, percentage } if bucket < percentage => {
                write!(f, "User in {}% rollout", percentage)
            }
            Reason::Rollout { percentage, .. } => write!(f, "User not in {}% rollout", percentage),
            Reason::Default => write!(f, "Flag enabled, no rollout applied"),
        }
    }
}

// Flag evaluation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub enabled: bool,
    pub reason: Reason,
}

impl Evaluation {
    fn new(enabled: bool, reason: Reason) -> Self {
        Self { enabled, reason }
    }
}

/// Evaluate if a flag should be enabled for a given user
pub fn evaluate(flag: Option<&FlagDefinition>, user: &UserContext) -> Result<bool, FlagError> {
    evaluate_detailed(flag, user).map(|e| e.enabled)
}

/// Same as [`evaluate`], also reporting which step decided.
///
/// Both the flag name and the user identifier feed the rollout hash, so an
/// empty value for either is rejected instead of producing a verdict.
pub fn evaluate_detailed(
    flag: Option<&FlagDefinition>,
    user: &UserContext,
) -> Result<Evaluation, FlagError> {
    if user.identifier.is_empty() {
        return Err(FlagError::InvalidInput(
            "user identifier cannot be empty".to_string(),
        ));
    }

    // Step 1: Absent and disabled flags are off
    let flag = match flag {
        Some(flag) if flag.name.is_empty() => {
            return Err(FlagError::InvalidInput("flag name cannot be empty".to_string()));
        }
        Some(flag) if flag.enabled => flag,
        _ => return Ok(Evaluation::new(false, Reason::Off)),
    };

    // Step 2: A non-empty allow-list decides alone
    if let Some(users) = flag.users.as_ref().filter(|u| !u.is_empty()) {
        let matched = users.iter().any(|u| *u == user.identifier);
        return Ok(Evaluation::new(matched, Reason::AllowList { matched }));
    }

    // Malformed stored targeting that nobody can satisfy
    match &flag.unsatisfiable {
        Some(Unsatisfiable::AllowList) => {
            return Ok(Evaluation::new(false, Reason::AllowList { matched: false }));
        }
        Some(Unsatisfiable::Condition(attribute)) => {
            return Ok(Evaluation::new(
                false,
                Reason::ConditionMismatch {
                    attribute: attribute.clone(),
                },
            ));
        }
        None => {}
    }

    // Step 3: Every condition must match an attribute exactly
    if let Some(conditions) = &flag.conditions {
        for (attribute, expected) in conditions {
            if user.attributes.get(attribute) != Some(expected) {
                return Ok(Evaluation::new(
                    false,
                    Reason::ConditionMismatch {
                        attribute: attribute.clone(),
                    },
                ));
            }
        }
    }

    // Step 4: Percentage rollout using consistent hashing
    if let Some(percentage) = flag.rollout_percentage {
        let bucket = bucket(&flag.name, &user.identifier);
        return Ok(Evaluation::new(
            bucket < percentage,
            Reason::Rollout { bucket, percentage },
        ));
    }

    // Step 5: Default - flag is enabled and no rollout is configured
    Ok(Evaluation::new(true, Reason::Default))
}
