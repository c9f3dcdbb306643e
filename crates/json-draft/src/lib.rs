//! # json-draft
//!
//! Copy-on-write drafts over immutable, reference-counted JSON-like values.
//!
//! A [`Draft`] stands in for an object or array. Reads go through to the
//! base value; writes are captured in a lazily created shallow copy. When the
//! session finishes, untouched subtrees of the result are the very same
//! allocations as in the base, so consumers can detect change by pointer
//! comparison.
//!
//! ```
//! use json_draft::{produce, Value};
//! use serde_json::json;
//!
//! let base = Value::from(json!({"users": [{"name": "ada"}, {"name": "alan"}], "version": 1}));
//! let next = produce(&base, |draft| {
//!     draft.set("version", 2)?;
//!     let users = draft.get("users")?;
//!     let users = users.as_draft().unwrap();
//!     users.push([Value::from(json!({"name": "grace"}))])?;
//!     users.reverse()?;
//!     Ok(())
//! })
//! .unwrap();
//!
//! assert_eq!(
//!     next.to_json().unwrap(),
//!     json!({"users": [{"name": "grace"}, {"name": "alan"}, {"name": "ada"}], "version": 2})
//! );
//! // Moved but untouched elements keep their identity.
//! let ada = base.get("users").unwrap().get("0").unwrap();
//! assert!(next.get("users").unwrap().get("2").unwrap().ptr_eq(&ada));
//! ```
//!
//! Modules:
//!
//! - [`state`]: the per-draft state and the lazy-copy machinery.
//! - [`traps`]: property reads, writes and deletes on drafts.
//! - [`mutator`]: rewritten array methods that track where each slot came
//!   from.
//! - [`notifier`]: one-shot callbacks on first modification.
//! - [`session`]: creating and finishing drafts.

pub mod config;
pub mod error;
mod finalize;
pub mod mutator;
pub mod notifier;
pub mod prototype;
pub mod session;
pub mod state;
pub mod traps;
pub mod value;

pub use config::{DraftConfig, ProvenancePolicy, DEFAULT_MAX_ARRAY_LEN};
pub use error::{DraftError, Result};
pub use mutator::{ArrayMethod, BoundMethod};
pub use notifier::register_once_modified;
pub use prototype::{Getter, Property, Prototype, PrototypeBuilder, Setter};
pub use session::{
    create_draft, current, finish_draft, is_draft, original, produce, produce_with, Session,
};
pub use state::{get_draft_state, Draft, ModifiedCallback, UNKNOWN_INDEX};
pub use traps::PropertyDescriptor;
pub use value::{default_compare, Object, Props, Value};
