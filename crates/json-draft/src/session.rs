//! Drafting sessions.
//!
//! A [`Session`] is the context drafts are created in: it carries the
//! [`DraftConfig`], decides what is draftable and how bases are copied, and
//! finalizes a draft tree into a new immutable value. It is passed around
//! explicitly; there is no ambient "current session".
//!
//! ```
//! use json_draft::{produce, Value};
//! use serde_json::json;
//!
//! let base = Value::from(json!({"todo": [{"done": false}, {"done": false}], "meta": {"v": 1}}));
//! let next = produce(&base, |draft| {
//!     let todo = draft.get("todo")?;
//!     let first = todo.get("0")?;
//!     first.as_draft().unwrap().set("done", true)?;
//!     Ok(())
//! })
//! .unwrap();
//!
//! assert_eq!(next.to_json().unwrap(), json!({"todo": [{"done": true}, {"done": false}], "meta": {"v": 1}}));
//! // Untouched subtrees are shared with the base.
//! assert!(next.get("meta").unwrap().ptr_eq(&base.get("meta").unwrap()));
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::config::DraftConfig;
use crate::error::{DraftError, Result};
use crate::finalize::Finalizer;
use crate::state::{Draft, DraftState, StateCell};
use crate::value::{Object, Props, Value};

struct SessionInner {
    config: DraftConfig,
    drafts: RefCell<Vec<Weak<StateCell>>>,
    finished: Cell<bool>,
}

/// Shared drafting context. Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct Session {
    inner: Rc<SessionInner>,
}

impl Session {
    pub fn new(config: DraftConfig) -> Self {
        Self {
            inner: Rc::new(SessionInner {
                config,
                drafts: RefCell::new(Vec::new()),
                finished: Cell::new(false),
            }),
        }
    }

    pub fn config(&self) -> &DraftConfig {
        &self.inner.config
    }

    pub fn is_finished(&self) -> bool {
        self.inner.finished.get()
    }

    /// Whether reads should wrap `value` in a nested draft.
    pub fn is_draftable(&self, value: &Value) -> bool {
        value.is_draftable()
    }

    pub(crate) fn shallow_copy_object(&self, base: &Object) -> Props {
        base.props().clone()
    }

    pub(crate) fn shallow_copy_array(&self, base: &[Value]) -> Vec<Value> {
        base.to_vec()
    }

    /// Create a root draft for `base`.
    ///
    /// # Errors
    ///
    /// [`DraftError::NotDraftable`] for primitives, drafts and opaque objects.
    pub fn create_draft(&self, base: &Value) -> Result<Draft> {
        if base.is_draft() {
            return Err(DraftError::NotDraftable(base.to_js_string()));
        }
        let draft = Draft::from_state(DraftState::new(base, None, self.clone())?);
        self.register(&draft);
        debug!(array = draft.is_array(), "created root draft");
        Ok(draft)
    }

    /// Create a draft for a value discovered by reading through `parent`.
    pub(crate) fn create_nested_draft(&self, value: &Value, parent: &Draft) -> Result<Draft> {
        let draft = Draft::from_state(DraftState::new(value, Some(parent), self.clone())?);
        self.register(&draft);
        trace!(array = draft.is_array(), "created nested draft");
        Ok(draft)
    }

    fn register(&self, draft: &Draft) {
        let mut drafts = self.inner.drafts.borrow_mut();
        drafts.retain(|weak| weak.strong_count() > 0);
        drafts.push(Rc::downgrade(&draft.cell));
    }

    /// Finalize `draft` into an immutable value.
    ///
    /// Untouched subtrees come back as the very same allocations as in the
    /// base. Every draft of the session is then revoked, unless
    /// [`DraftConfig::revoke_on_finish`] is off.
    pub fn finish(&self, draft: &Draft) -> Result<Value> {
        let result = Finalizer::finish().draft(draft)?;
        self.inner.finished.set(true);
        if self.inner.config.revoke_on_finish {
            self.revoke();
        }
        debug!(modified = draft.is_modified(), "session finished");
        Ok(result)
    }

    /// Revoke every live draft of this session.
    pub fn revoke(&self) {
        let drafts = std::mem::take(&mut *self.inner.drafts.borrow_mut());
        let mut revoked = 0usize;
        for cell in drafts.iter().filter_map(Weak::upgrade) {
            cell.borrow_mut().revoked = true;
            revoked += 1;
        }
        debug!(revoked, "revoked drafts");
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DraftConfig::default())
    }
}

/// Run `recipe` against a draft of `base` and return the finalized result.
///
/// If the recipe fails, the session's drafts are revoked and the error is
/// returned unchanged.
pub fn produce<F>(base: &Value, recipe: F) -> Result<Value>
where
    F: FnOnce(&Draft) -> Result<()>,
{
    produce_with(DraftConfig::default(), base, recipe)
}

/// [`produce`] with an explicit configuration.
pub fn produce_with<F>(config: DraftConfig, base: &Value, recipe: F) -> Result<Value>
where
    F: FnOnce(&Draft) -> Result<()>,
{
    let session = Session::new(config);
    let draft = session.create_draft(base)?;
    if let Err(err) = recipe(&draft) {
        session.revoke();
        return Err(err);
    }
    session.finish(&draft)
}

/// Create a root draft in a fresh session with the default configuration.
pub fn create_draft(base: &Value) -> Result<Draft> {
    Session::default().create_draft(base)
}

/// Finish the session `draft` belongs to, returning the finalized value.
pub fn finish_draft(draft: &Draft) -> Result<Value> {
    draft.session().finish(draft)
}

/// Whether `value` is a draft handle.
pub fn is_draft(value: &Value) -> bool {
    value.is_draft()
}

/// The base value a draft shadows.
///
/// # Errors
///
/// [`DraftError::NotADraft`] for plain values.
pub fn original(value: &Value) -> Result<Value> {
    match value {
        Value::Draft(draft) => Ok(draft.base()),
        other => Err(DraftError::NotADraft(other.to_js_string())),
    }
}

/// Immutable snapshot of a draft's current content, without finishing it.
///
/// Untouched subtrees are shared with the base, just as in the finished
/// result.
///
/// # Errors
///
/// [`DraftError::NotADraft`] for plain values.
pub fn current(value: &Value) -> Result<Value> {
    match value {
        Value::Draft(draft) => Finalizer::snapshot().draft(draft),
        other => Err(DraftError::NotADraft(other.to_js_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unmodified_produce_returns_base() {
        let base = Value::from(json!({"a": {"b": 1}}));
        let next = produce(&base, |draft| {
            draft.get("a")?;
            Ok(())
        })
        .unwrap();
        assert!(next.ptr_eq(&base));
    }

    #[test]
    fn create_draft_rejects_primitives_and_drafts() {
        let session = Session::default();
        assert!(matches!(
            session.create_draft(&Value::from(1)),
            Err(DraftError::NotDraftable(_))
        ));
        let draft = session.create_draft(&Value::from(json!({}))).unwrap();
        assert!(matches!(
            session.create_draft(&Value::Draft(draft)),
            Err(DraftError::NotDraftable(_))
        ));
    }

    #[test]
    fn finish_revokes_every_draft() {
        let session = Session::default();
        let draft = session.create_draft(&Value::from(json!({"a": {}}))).unwrap();
        let nested = draft.get("a").unwrap();
        session.finish(&draft).unwrap();
        assert!(session.is_finished());
        assert_eq!(draft.get("a").unwrap_err(), DraftError::Revoked);
        assert_eq!(
            nested.as_draft().unwrap().set("x", 1).unwrap_err(),
            DraftError::Revoked
        );
        // Introspection still works after revocation.
        assert!(draft.is_revoked());
        assert!(draft.is_finalized());
    }

    #[test]
    fn finish_without_revocation_reads_raw_values() {
        let config = DraftConfig {
            revoke_on_finish: false,
            ..DraftConfig::default()
        };
        let session = Session::new(config.clone());
        let base = Value::from(json!({"a": {"b": 1}}));
        let draft = session.create_draft(&base).unwrap();
        session.finish(&draft).unwrap();
        let a = draft.get("a").unwrap();
        assert!(!a.is_draft());
        assert!(a.ptr_eq(&base.get("a").unwrap()));

        // Nested drafts that were read or written before finishing resolve too.
        let session = Session::new(config);
        let base = Value::from(json!({"a": {"b": 1}, "c": {"d": 1}}));
        let draft = session.create_draft(&base).unwrap();
        let a = draft.get("a").unwrap();
        let c = draft.get("c").unwrap();
        assert!(c.is_draft());
        a.as_draft().unwrap().set("b", 2).unwrap();
        let result = session.finish(&draft).unwrap();

        let a_after = draft.get("a").unwrap();
        let c_after = draft.get("c").unwrap();
        assert!(!a_after.is_draft());
        assert!(!c_after.is_draft());
        assert!(a_after.ptr_eq(&result.get("a").unwrap()));
        assert!(c_after.ptr_eq(&base.get("c").unwrap()));
        assert_eq!(a.as_draft().unwrap().get("b").unwrap(), Value::from(2));
        assert!(draft.get("missing").unwrap().is_undefined());
        let descriptor = draft.own_property_descriptor("c").unwrap().unwrap();
        assert!(descriptor.value.ptr_eq(&base.get("c").unwrap()));
    }

    #[test]
    fn failing_recipe_revokes_and_propagates() {
        let base = Value::from(json!({"a": 1}));
        let mut escaped = None;
        let err = produce(&base, |draft| {
            escaped = Some(draft.clone());
            draft.set_prototype(None)
        })
        .unwrap_err();
        assert_eq!(err, DraftError::SetPrototype);
        assert!(escaped.unwrap().is_revoked());
    }

    #[test]
    fn original_and_current() {
        let base = Value::from(json!({"a": 1, "b": {"c": 2}}));
        let session = Session::default();
        let draft = session.create_draft(&base).unwrap();
        draft.set("a", 2).unwrap();

        let handle = Value::Draft(draft.clone());
        assert!(original(&handle).unwrap().ptr_eq(&base));
        let snapshot = current(&handle).unwrap();
        assert_eq!(snapshot.to_json().unwrap(), json!({"a": 2, "b": {"c": 2}}));
        assert!(snapshot.get("b").unwrap().ptr_eq(&base.get("b").unwrap()));
        // Snapshots leave the draft live.
        assert!(!draft.is_finalized());
        draft.set("a", 3).unwrap();

        assert!(matches!(original(&base), Err(DraftError::NotADraft(_))));
        assert!(matches!(current(&base), Err(DraftError::NotADraft(_))));
        assert!(is_draft(&handle));
        assert!(!is_draft(&base));
    }
}
