//! Draft configuration.
//!
//! [`DraftConfig`] is plain data so it can be embedded in a larger
//! application config and loaded with serde:
//!
//! ```
//! use json_draft::{DraftConfig, ProvenancePolicy};
//!
//! let config: DraftConfig = serde_json::from_str(r#"{"provenance": "unknown"}"#).unwrap();
//! assert_eq!(config.provenance, ProvenancePolicy::Unknown);
//! assert!(config.revoke_on_finish);
//! ```

use serde::{Deserialize, Serialize};

/// How array mutators assign an old index to elements they insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvenancePolicy {
    /// Inserted objects/arrays that are reference-identical to an element of
    /// the base array take that element's index, provided no remaining slot
    /// already claims it. Everything else gets `-1`.
    #[default]
    Lookup,
    /// Every inserted element gets `-1`.
    Unknown,
}

/// Settings shared by every draft of a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftConfig {
    /// Provenance policy for `push`, `unshift` and `splice`.
    pub provenance: ProvenancePolicy,
    /// Revoke every draft of the session once it finishes. When disabled,
    /// finished drafts stay readable and return raw (undrafted) values.
    pub revoke_on_finish: bool,
    /// Largest length an index or `length` write may grow an array draft to.
    /// Arrays are dense, so every slot up to the new length is allocated.
    pub max_array_len: usize,
}

/// Default for [`DraftConfig::max_array_len`]: 2^24 slots.
pub const DEFAULT_MAX_ARRAY_LEN: usize = 1 << 24;

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            provenance: ProvenancePolicy::Lookup,
            revoke_on_finish: true,
            max_array_len: DEFAULT_MAX_ARRAY_LEN,
        }
    }
}
