//! Local feature flags: a deterministic evaluator over an allow-list,
//! attribute conditions and a stable percentage rollout, plus the storage
//! and HTTP plumbing that serves it.
//!
//! ```
//! use localflags::{evaluate, FlagDefinition, UserContext};
//!
//! let flag = FlagDefinition::new("new-ui")?
//!     .enabled(true)
//!     .with_condition("role", "admin")
//!     .with_rollout(100);
//! let admin = UserContext::new("alice")?.with_attribute("role", "admin");
//!
//! assert!(evaluate(Some(&flag), &admin)?);
//! # Ok::<(), localflags::FlagError>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod flags;
pub mod routes;
pub mod state;
pub mod store;

pub use client::LocalFlags;
pub use error::FlagError;
pub use evaluation::{bucket, evaluate, evaluate_detailed, Evaluation, Reason, UserContext};
pub use flags::{FlagDefinition, Scalar, Unsatisfiable};
pub use store::{FlagPatch, FlagStore, MemoryFlagStore, NewFlag, PgFlagStore, StoredFlag};
