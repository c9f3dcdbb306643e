//! Draft state and the lazy-copy machinery.
//!
//! Every drafted object or array owns one [`DraftState`] behind a
//! `Rc<RefCell<_>>`; a [`Draft`] is a cheap handle to it.
//!
//! # Lifecycle
//!
//! 1. A session wraps a base value: `copy` is absent and `modified` is false.
//! 2. Reads of untouched draftable children create nested drafts. Until the
//!    copy exists they are kept in a side cache, so reading never copies.
//! 3. The first real mutation calls [`DraftState::prepare_copy`] and then
//!    [`mark_changed`], which flips `modified` on this state and every
//!    ancestor, and fires one-shot callbacks.
//! 4. The session finalizes the tree and, by default, revokes every draft.
//!
//! No `RefCell` borrow is ever held while user code (getters, setters,
//! callbacks, comparators) runs.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{DraftError, Result};
use crate::prototype::Prototype;
use crate::session::Session;
use crate::value::{array_index, Object, Props, Value};

/// Old index of an array slot whose value has no known origin in the base.
pub const UNKNOWN_INDEX: isize = -1;

/// Callback fired once when a draft first becomes modified.
pub type ModifiedCallback = Rc<dyn Fn(&Draft)>;

pub(crate) type StateCell = RefCell<DraftState>;

/// Base/copy pair, specialised per drafted shape.
pub(crate) enum Shape {
    Object {
        base: Rc<Object>,
        copy: Option<Props>,
    },
    Array {
        base: Rc<Vec<Value>>,
        copy: Option<Vec<Value>>,
        /// One entry per current slot: where that slot's value sat in `base`.
        old_indexes: Vec<isize>,
        /// Set while a rewritten array method runs on this array.
        is_mutating: bool,
        /// Lazily built map from element identity to its base positions.
        base_positions: Option<Rc<HashMap<*const (), Vec<usize>>>>,
    },
}

pub(crate) struct DraftState {
    pub(crate) shape: Shape,
    /// Nested drafts created by reads while `copy` is still absent.
    pub(crate) children: IndexMap<String, Draft>,
    pub(crate) modified: bool,
    pub(crate) finalized: bool,
    pub(crate) revoked: bool,
    /// `true` for keys set on this draft, `false` for keys deleted.
    pub(crate) assigned: IndexMap<String, bool>,
    pub(crate) parent: Option<Weak<StateCell>>,
    pub(crate) session: Session,
    pub(crate) callbacks: Option<Vec<ModifiedCallback>>,
    /// Output of finalization, reused if the draft is reached again.
    pub(crate) result: Option<Value>,
}

impl DraftState {
    pub(crate) fn new(base: &Value, parent: Option<&Draft>, session: Session) -> Result<Self> {
        let shape = match base {
            Value::Object(object) if base.is_draftable() => Shape::Object {
                base: Rc::clone(object),
                copy: None,
            },
            Value::Array(items) => Shape::Array {
                base: Rc::clone(items),
                copy: None,
                old_indexes: (0..items.len() as isize).collect(),
                is_mutating: false,
                base_positions: None,
            },
            other => return Err(DraftError::NotDraftable(other.to_js_string())),
        };
        Ok(Self {
            shape,
            children: IndexMap::new(),
            modified: false,
            finalized: false,
            revoked: false,
            assigned: IndexMap::new(),
            parent: parent.map(|p| Rc::downgrade(&p.cell)),
            session,
            callbacks: None,
            result: None,
        })
    }

    pub(crate) fn is_array(&self) -> bool {
        matches!(self.shape, Shape::Array { .. })
    }

    pub(crate) fn is_mutating_array(&self) -> bool {
        matches!(
            self.shape,
            Shape::Array {
                is_mutating: true,
                ..
            }
        )
    }

    /// Sets the mutation flag and returns its previous value.
    pub(crate) fn set_mutating_array(&mut self, mutating: bool) -> bool {
        match &mut self.shape {
            Shape::Array { is_mutating, .. } => std::mem::replace(is_mutating, mutating),
            Shape::Object { .. } => false,
        }
    }

    pub(crate) fn prototype(&self) -> Option<Rc<Prototype>> {
        match &self.shape {
            Shape::Object { base, .. } => base.prototype().cloned(),
            Shape::Array { .. } => None,
        }
    }

    pub(crate) fn base_value(&self) -> Value {
        match &self.shape {
            Shape::Object { base, .. } => Value::Object(Rc::clone(base)),
            Shape::Array { base, .. } => Value::Array(Rc::clone(base)),
        }
    }

    pub(crate) fn has_copy(&self) -> bool {
        match &self.shape {
            Shape::Object { copy, .. } => copy.is_some(),
            Shape::Array { copy, .. } => copy.is_some(),
        }
    }

    /// Number of slots of the latest array (0 for objects).
    pub(crate) fn len(&self) -> usize {
        match &self.shape {
            Shape::Array { copy: Some(copy), .. } => copy.len(),
            Shape::Array { base, .. } => base.len(),
            Shape::Object { .. } => 0,
        }
    }

    // ── Reads against "latest" ─────────────────────────────────────────────

    /// Own value for `key` in the latest source: the copy if present,
    /// otherwise a cached nested draft, otherwise the base.
    pub(crate) fn own(&self, key: &str) -> Option<Value> {
        match &self.shape {
            Shape::Object { copy: Some(copy), .. } => copy.get(key).cloned(),
            Shape::Object { base, .. } => self
                .children
                .get(key)
                .map(|child| Value::Draft(child.clone()))
                .or_else(|| base.get(key).cloned()),
            Shape::Array { copy, base, .. } => {
                if key == "length" {
                    return Some(Value::from(self.len()));
                }
                let index = array_index(key)?;
                match copy {
                    Some(copy) => copy.get(index).cloned(),
                    None => self
                        .children
                        .get(key)
                        .map(|child| Value::Draft(child.clone()))
                        .or_else(|| base.get(index).cloned()),
                }
            }
        }
    }

    /// Latest own value, or `undefined` when absent. Never creates drafts.
    pub(crate) fn peek(&self, key: &str) -> Value {
        self.own(key).unwrap_or_default()
    }

    pub(crate) fn base_own(&self, key: &str) -> Option<Value> {
        match &self.shape {
            Shape::Object { base, .. } => base.get(key).cloned(),
            Shape::Array { base, .. } => {
                if key == "length" {
                    return Some(Value::from(base.len()));
                }
                array_index(key).and_then(|i| base.get(i).cloned())
            }
        }
    }

    pub(crate) fn base_has(&self, key: &str) -> bool {
        self.base_own(key).is_some()
    }

    pub(crate) fn own_keys(&self) -> Vec<String> {
        match &self.shape {
            Shape::Object { copy: Some(copy), .. } => copy.keys().cloned().collect(),
            Shape::Object { base, .. } => base.props().keys().cloned().collect(),
            Shape::Array { .. } => (0..self.len())
                .map(|i| i.to_string())
                .chain(std::iter::once("length".to_string()))
                .collect(),
        }
    }

    /// Shallow view of the latest content. Nested drafts stay drafts.
    /// An untouched state hands back its base allocation.
    pub(crate) fn latest(&self) -> Value {
        match &self.shape {
            Shape::Object { copy: Some(copy), base } => Value::Object(Rc::new(Object::from_parts(
                copy.clone(),
                base.prototype().cloned(),
            ))),
            Shape::Array { copy: Some(copy), .. } => Value::Array(Rc::new(copy.clone())),
            _ if self.children.is_empty() => self.base_value(),
            Shape::Object { base, .. } => {
                let mut props = base.props().clone();
                for (key, child) in &self.children {
                    props.insert(key.clone(), Value::Draft(child.clone()));
                }
                Value::Object(Rc::new(Object::from_parts(props, base.prototype().cloned())))
            }
            Shape::Array { base, .. } => {
                let mut items = base.as_ref().clone();
                for (key, child) in &self.children {
                    if let Some(slot) = array_index(key).and_then(|i| items.get_mut(i)) {
                        *slot = Value::Draft(child.clone());
                    }
                }
                Value::Array(Rc::new(items))
            }
        }
    }

    // ── Copy management ────────────────────────────────────────────────────

    /// Ensure `copy` exists: a shallow duplicate of `base` with any cached
    /// nested drafts moved into their slots. Idempotent.
    pub(crate) fn prepare_copy(&mut self) {
        if self.has_copy() {
            return;
        }
        let children = std::mem::take(&mut self.children);
        let session = self.session.clone();
        match &mut self.shape {
            Shape::Object { base, copy } => {
                let mut props = session.shallow_copy_object(base);
                for (key, child) in children {
                    props.insert(key, Value::Draft(child));
                }
                *copy = Some(props);
            }
            Shape::Array { base, copy, .. } => {
                let mut items = session.shallow_copy_array(base);
                for (key, child) in children {
                    if let Some(slot) = array_index(&key).and_then(|i| items.get_mut(i)) {
                        *slot = Value::Draft(child);
                    }
                }
                *copy = Some(items);
            }
        }
    }

    /// Write into the copy, which must have been prepared. Array writes to
    /// `length` resize, index writes past the end pad with `undefined`.
    pub(crate) fn write_copy(&mut self, key: &str, value: Value) {
        match &mut self.shape {
            Shape::Object { copy: Some(copy), .. } => {
                copy.insert(key.to_string(), value);
            }
            Shape::Array { copy: Some(copy), .. } => {
                if key == "length" {
                    if let Some(len) = value.as_f64() {
                        copy.resize(len as usize, Value::Undefined);
                    }
                } else if let Some(index) = array_index(key) {
                    if copy.len() <= index {
                        copy.resize(index + 1, Value::Undefined);
                    }
                    copy[index] = value;
                }
            }
            _ => {}
        }
    }

    /// Remove `key` from the copy, if there is one. Array slots become
    /// `undefined` and keep the length.
    pub(crate) fn remove_copy(&mut self, key: &str) {
        match &mut self.shape {
            Shape::Object { copy: Some(copy), .. } => {
                copy.shift_remove(key);
            }
            Shape::Array { copy: Some(copy), .. } => {
                if let Some(slot) = array_index(key).and_then(|i| copy.get_mut(i)) {
                    *slot = Value::Undefined;
                }
            }
            _ => {}
        }
    }

    /// Remember a freshly created nested draft for `key`.
    pub(crate) fn cache_child(&mut self, key: &str, child: Draft) {
        if self.has_copy() {
            self.write_copy(key, Value::Draft(child));
        } else {
            self.children.insert(key.to_string(), child);
        }
    }

    /// Put the raw base value back in place of a nested draft.
    pub(crate) fn restore_base(&mut self, key: &str, value: Value) {
        if self.has_copy() {
            self.write_copy(key, value);
        } else {
            self.children.shift_remove(key);
        }
    }

    // ── Array bookkeeping ──────────────────────────────────────────────────

    pub(crate) fn old_indexes_mut(&mut self) -> Option<&mut Vec<isize>> {
        match &mut self.shape {
            Shape::Array { old_indexes, .. } => Some(old_indexes),
            Shape::Object { .. } => None,
        }
    }

    /// Copy and old indexes of an array draft, preparing the copy first.
    pub(crate) fn array_parts(&mut self) -> Option<(&mut Vec<Value>, &mut Vec<isize>)> {
        self.prepare_copy();
        match &mut self.shape {
            Shape::Array {
                copy: Some(copy),
                old_indexes,
                ..
            } => Some((copy, old_indexes)),
            _ => None,
        }
    }

    /// Positions of every object/array element of the base, keyed by identity.
    pub(crate) fn base_positions(&mut self) -> Rc<HashMap<*const (), Vec<usize>>> {
        match &mut self.shape {
            Shape::Array {
                base,
                base_positions,
                ..
            } => Rc::clone(base_positions.get_or_insert_with(|| {
                let mut positions: HashMap<*const (), Vec<usize>> = HashMap::new();
                for (index, item) in base.iter().enumerate() {
                    if let Some(identity) = item.identity() {
                        positions.entry(identity).or_default().push(index);
                    }
                }
                Rc::new(positions)
            })),
            Shape::Object { .. } => Rc::new(HashMap::new()),
        }
    }

    /// Record in the ledger which slots a reordering method rewrote.
    pub(crate) fn record_array_writes(&mut self, before: &[Value]) {
        let (after, base_len) = match &self.shape {
            Shape::Array {
                copy: Some(copy),
                base,
                ..
            } => (copy.clone(), base.len()),
            _ => return,
        };
        for (index, value) in after.iter().enumerate() {
            let unchanged = before.get(index).map_or(false, |prev| prev.same_value(value));
            if !unchanged {
                self.assigned.insert(index.to_string(), true);
            }
        }
        for index in after.len()..before.len() {
            if index < base_len {
                self.assigned.insert(index.to_string(), false);
            } else {
                self.assigned.shift_remove(&index.to_string());
            }
        }
        if after.len() != before.len() {
            self.assigned.insert("length".to_string(), true);
        }
    }
}

/// Flip `modified` on `draft` and all its ancestors, then fire the
/// callbacks registered on `draft` itself.
///
/// Idempotent: an already modified state neither propagates nor fires.
pub(crate) fn mark_changed(draft: &Draft) {
    let (parent, callbacks) = {
        let mut state = draft.cell.borrow_mut();
        if state.modified {
            return;
        }
        state.prepare_copy();
        state.modified = true;
        (
            state.parent.as_ref().and_then(Weak::upgrade),
            state.callbacks.take(),
        )
    };
    debug!(array = draft.is_array(), "draft modified");
    if let Some(parent) = parent {
        mark_changed(&Draft { cell: parent });
    }
    if let Some(callbacks) = callbacks {
        debug!(count = callbacks.len(), "firing once-modified callbacks");
        for callback in callbacks {
            callback(draft);
        }
    }
}

// ── Draft handle ───────────────────────────────────────────────────────────

/// Mutable handle standing in for an immutable base object or array.
///
/// Cloning a `Draft` clones the handle, not the state: both clones observe
/// and capture the same changes. Equality is handle identity.
#[derive(Clone)]
pub struct Draft {
    pub(crate) cell: Rc<StateCell>,
}

impl Draft {
    pub(crate) fn from_state(state: DraftState) -> Self {
        Self {
            cell: Rc::new(RefCell::new(state)),
        }
    }

    /// Borrow the state, failing if the draft was revoked.
    pub(crate) fn state(&self) -> Result<Ref<'_, DraftState>> {
        let state = self.cell.borrow();
        if state.revoked {
            return Err(DraftError::Revoked);
        }
        Ok(state)
    }

    pub(crate) fn state_mut(&self) -> Result<RefMut<'_, DraftState>> {
        let state = self.cell.borrow_mut();
        if state.revoked {
            return Err(DraftError::Revoked);
        }
        Ok(state)
    }

    pub(crate) fn as_ptr(&self) -> *const StateCell {
        Rc::as_ptr(&self.cell)
    }

    /// Whether two handles refer to the same draft.
    pub fn ptr_eq(&self, other: &Draft) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    /// Shallow latest content; fails on a revoked draft.
    pub(crate) fn latest(&self) -> Result<Value> {
        Ok(self.state()?.latest())
    }

    /// Shallow latest content, readable even after revocation.
    pub(crate) fn latest_unchecked(&self) -> Value {
        self.cell.borrow().latest()
    }

    // ── Introspection ──────────────────────────────────────────────────────
    //
    // Read-only views of the state for finalizers and diagnostics. They stay
    // available after revocation.

    pub fn is_array(&self) -> bool {
        self.cell.borrow().is_array()
    }

    pub fn is_modified(&self) -> bool {
        self.cell.borrow().modified
    }

    pub fn is_finalized(&self) -> bool {
        self.cell.borrow().finalized
    }

    pub fn is_revoked(&self) -> bool {
        self.cell.borrow().revoked
    }

    /// The value this draft shadows.
    pub fn base(&self) -> Value {
        self.cell.borrow().base_value()
    }

    /// Snapshot of the copy, or `None` while the draft is untouched.
    pub fn copy(&self) -> Option<Value> {
        let state = self.cell.borrow();
        if state.has_copy() {
            Some(state.latest())
        } else {
            None
        }
    }

    /// The assignment ledger: `true` for assigned keys, `false` for deleted.
    pub fn assigned(&self) -> IndexMap<String, bool> {
        self.cell.borrow().assigned.clone()
    }

    /// Old index per slot for array drafts (`-1` when unknown).
    pub fn old_indexes(&self) -> Option<Vec<isize>> {
        match &self.cell.borrow().shape {
            Shape::Array { old_indexes, .. } => Some(old_indexes.clone()),
            Shape::Object { .. } => None,
        }
    }

    /// The enclosing draft, if this one was created by reading through it
    /// and the parent is still alive.
    pub fn parent(&self) -> Option<Draft> {
        let state = self.cell.borrow();
        state
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|cell| Draft { cell })
    }

    pub fn session(&self) -> Session {
        self.cell.borrow().session.clone()
    }
}

impl PartialEq for Draft {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Draft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.try_borrow() {
            Ok(state) => f
                .debug_struct("Draft")
                .field("array", &state.is_array())
                .field("modified", &state.modified)
                .field("revoked", &state.revoked)
                .finish(),
            Err(_) => f.write_str("Draft(<borrowed>)"),
        }
    }
}

/// Recover the draft behind a value.
///
/// # Errors
///
/// [`DraftError::NotADraft`] if `value` is not a draft handle.
pub fn get_draft_state(value: &Value) -> Result<Draft> {
    match value {
        Value::Draft(draft) => Ok(draft.clone()),
        other => Err(DraftError::NotADraft(other.to_js_string())),
    }
}
