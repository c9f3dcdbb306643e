//! Property access on drafts.
//!
//! Reads resolve against the latest content and lazily wrap draftable
//! children in nested drafts; writes are captured in the copy. Array drafts
//! route through a thin adapter that validates keys and keeps the
//! old-index ledger in step before delegating to the object rules.

mod array;
mod object;

use std::rc::Rc;

use crate::error::{DraftError, Result};
use crate::prototype::Prototype;
use crate::state::Draft;
use crate::value::Value;

/// Shape of an own property, as reported by
/// [`Draft::own_property_descriptor`].
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub value: Value,
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
}

impl Draft {
    /// Read `key`.
    ///
    /// Untouched objects and arrays come back as nested drafts, so writes
    /// through them are captured by this draft. Absent keys fall back to the
    /// prototype chain and finally read as `undefined`.
    pub fn get(&self, key: &str) -> Result<Value> {
        object::get(self, key)
    }

    /// Whether `key` is an own key of the latest content or is inherited.
    pub fn has(&self, key: &str) -> Result<bool> {
        object::has(self, key)
    }

    /// Own keys of the latest content, in order. Arrays list their indices
    /// followed by `length`.
    pub fn own_keys(&self) -> Result<Vec<String>> {
        Ok(self.state()?.own_keys())
    }

    /// Write `value` under `key`.
    ///
    /// Writes that would not change anything are dropped without marking the
    /// draft modified.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let is_array = self.state()?.is_array();
        if is_array {
            array::set(self, key, value)
        } else {
            object::set(self, key, value)
        }
    }

    /// Delete `key`. Deleting an absent key is a no-op. On arrays the slot
    /// becomes `undefined` and the length is kept.
    pub fn delete(&self, key: &str) -> Result<()> {
        let is_array = self.state()?.is_array();
        if is_array {
            array::delete(self, key)
        } else {
            object::delete(self, key)
        }
    }

    pub fn own_property_descriptor(&self, key: &str) -> Result<Option<PropertyDescriptor>> {
        let state = self.state()?;
        let Some(mut value) = state.own(key) else {
            return Ok(None);
        };
        if let Some(result) = state.result.as_ref().filter(|_| state.finalized) {
            value = result.get(key)?;
        }
        let is_length = state.is_array() && key == "length";
        Ok(Some(PropertyDescriptor {
            value,
            writable: true,
            enumerable: !is_length,
            configurable: !is_length,
        }))
    }

    /// Property definitions are not captured by drafts and always fail.
    pub fn define_property(&self, key: &str, _descriptor: PropertyDescriptor) -> Result<()> {
        Err(DraftError::DefineProperty(key.to_string()))
    }

    /// The prototype of the base object. Arrays have none.
    pub fn prototype(&self) -> Result<Option<Rc<Prototype>>> {
        Ok(self.state()?.prototype())
    }

    /// Prototypes are fixed for the lifetime of a draft; this always fails.
    pub fn set_prototype(&self, _prototype: Option<Rc<Prototype>>) -> Result<()> {
        Err(DraftError::SetPrototype)
    }

    // ── Typed array helpers ────────────────────────────────────────────────

    fn expect_array(&self, operation: &str) -> Result<()> {
        if self.state()?.is_array() {
            Ok(())
        } else {
            Err(DraftError::NotAnArray(operation.to_string()))
        }
    }

    /// Current length of an array draft.
    pub fn len(&self) -> Result<usize> {
        let state = self.state()?;
        if !state.is_array() {
            return Err(DraftError::NotAnArray("len".to_string()));
        }
        Ok(state.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn get_index(&self, index: usize) -> Result<Value> {
        self.expect_array("get_index")?;
        self.get(&index.to_string())
    }

    pub fn set_index(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        self.expect_array("set_index")?;
        self.set(&index.to_string(), value)
    }

    /// Truncate or extend (with `undefined`) an array draft.
    pub fn set_len(&self, len: usize) -> Result<()> {
        self.expect_array("set_len")?;
        self.set("length", len)
    }

    pub fn delete_index(&self, index: usize) -> Result<()> {
        self.expect_array("delete_index")?;
        self.delete(&index.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use serde_json::json;

    fn draft_of(json: serde_json::Value) -> Draft {
        Session::default().create_draft(&Value::from(json)).unwrap()
    }

    #[test]
    fn descriptors() {
        let draft = draft_of(json!({"a": 1}));
        let desc = draft.own_property_descriptor("a").unwrap().unwrap();
        assert_eq!(desc.value, Value::from(1));
        assert!(desc.writable && desc.enumerable && desc.configurable);
        assert!(draft.own_property_descriptor("b").unwrap().is_none());

        let array = draft_of(json!([1]));
        let len = array.own_property_descriptor("length").unwrap().unwrap();
        assert_eq!(len.value, Value::from(1));
        assert!(len.writable);
        assert!(!len.enumerable);
        assert!(!len.configurable);
    }

    #[test]
    fn define_and_set_prototype_fail() {
        let draft = draft_of(json!({}));
        let desc = PropertyDescriptor {
            value: Value::from(1),
            writable: true,
            enumerable: true,
            configurable: true,
        };
        assert_eq!(
            draft.define_property("x", desc).unwrap_err(),
            DraftError::DefineProperty("x".to_string())
        );
        assert_eq!(draft.set_prototype(None).unwrap_err(), DraftError::SetPrototype);
        assert!(!draft.is_modified());
    }

    #[test]
    fn own_keys_follow_insertion_order() {
        let draft = draft_of(json!({"b": 1, "a": 2}));
        draft.set("c", 3).unwrap();
        draft.delete("b").unwrap();
        assert_eq!(draft.own_keys().unwrap(), vec!["a", "c"]);

        let array = draft_of(json!([1, 2]));
        assert_eq!(array.own_keys().unwrap(), vec!["0", "1", "length"]);
    }

    #[test]
    fn typed_helpers_reject_objects() {
        let draft = draft_of(json!({}));
        assert_eq!(
            draft.len().unwrap_err(),
            DraftError::NotAnArray("len".to_string())
        );
        assert!(matches!(draft.get_index(0), Err(DraftError::NotAnArray(_))));
        assert!(matches!(draft.set_len(0), Err(DraftError::NotAnArray(_))));
    }
}
