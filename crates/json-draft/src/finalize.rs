//! Turning a draft tree back into immutable values.
//!
//! Unmodified drafts resolve to their base allocation. Modified drafts
//! rebuild their copy, resolving nested drafts recursively. Plain values
//! assigned during the session are walked only to replace drafts embedded in
//! them, and are reused as-is when they contain none.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::error::{DraftError, Result};
use crate::state::{Draft, Shape, StateCell};
use crate::value::{Object, Props, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Marks drafts finalized and stores their result.
    Finish,
    /// Produces a snapshot and leaves drafts untouched.
    Snapshot,
}

/// Snapshot of what a state contributes to the output, taken so no borrow
/// is held while children are resolved.
enum Pending {
    Unchanged(Value),
    Object {
        base: Rc<Object>,
        entries: Props,
    },
    Array {
        base: Rc<Vec<Value>>,
        items: Vec<Value>,
    },
}

pub(crate) struct Finalizer {
    mode: Mode,
    in_progress: HashSet<*const StateCell>,
    done: HashMap<*const StateCell, Value>,
}

impl Finalizer {
    pub(crate) fn finish() -> Self {
        Self::new(Mode::Finish)
    }

    pub(crate) fn snapshot() -> Self {
        Self::new(Mode::Snapshot)
    }

    fn new(mode: Mode) -> Self {
        Self {
            mode,
            in_progress: HashSet::new(),
            done: HashMap::new(),
        }
    }

    pub(crate) fn draft(&mut self, draft: &Draft) -> Result<Value> {
        let key = draft.as_ptr();
        if let Some(value) = self.done.get(&key) {
            return Ok(value.clone());
        }
        let pending = {
            let state = draft.state()?;
            if let Some(result) = &state.result {
                return Ok(result.clone());
            }
            if !state.modified {
                Pending::Unchanged(state.base_value())
            } else {
                match &state.shape {
                    Shape::Object {
                        base,
                        copy: Some(copy),
                    } => Pending::Object {
                        base: Rc::clone(base),
                        entries: copy.clone(),
                    },
                    Shape::Array {
                        base,
                        copy: Some(copy),
                        ..
                    } => Pending::Array {
                        base: Rc::clone(base),
                        items: copy.clone(),
                    },
                    // Modified states always carry a copy.
                    _ => Pending::Unchanged(state.base_value()),
                }
            }
        };

        if !self.in_progress.insert(key) {
            return Err(DraftError::CircularDraft);
        }
        let result = self.resolve(pending);
        self.in_progress.remove(&key);
        let result = result?;

        if self.mode == Mode::Finish {
            let mut state = draft.cell.borrow_mut();
            state.finalized = true;
            state.result = Some(result.clone());
        }
        self.done.insert(key, result.clone());
        Ok(result)
    }

    fn resolve(&mut self, pending: Pending) -> Result<Value> {
        match pending {
            Pending::Unchanged(base) => Ok(base),
            Pending::Object { base, entries } => {
                let mut props = Props::with_capacity(entries.len());
                for (key, value) in entries {
                    let resolved = self.value(&value, base.get(&key))?;
                    props.insert(key, resolved);
                }
                Ok(Value::Object(Rc::new(Object::from_parts(
                    props,
                    base.prototype().cloned(),
                ))))
            }
            Pending::Array { base, items } => {
                let mut out = Vec::with_capacity(items.len());
                for (index, value) in items.iter().enumerate() {
                    out.push(self.value(value, base.get(index))?);
                }
                Ok(Value::Array(Rc::new(out)))
            }
        }
    }

    /// Resolve one slot of a copy. `base` is the same slot in the base.
    fn value(&mut self, value: &Value, base: Option<&Value>) -> Result<Value> {
        match value {
            Value::Draft(draft) => self.draft(draft),
            Value::Object(_) | Value::Array(_) if base.map_or(false, |b| b.ptr_eq(value)) => {
                Ok(value.clone())
            }
            Value::Object(object) => {
                let mut props = Props::with_capacity(object.len());
                let mut changed = false;
                for (key, child) in object.props() {
                    let resolved = self.value(child, None)?;
                    changed |= !reused(child, &resolved);
                    props.insert(key.clone(), resolved);
                }
                if !changed {
                    return Ok(value.clone());
                }
                Ok(Value::Object(Rc::new(Object::from_parts(
                    props,
                    object.prototype().cloned(),
                ))))
            }
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                let mut changed = false;
                for child in items.iter() {
                    let resolved = self.value(child, None)?;
                    changed |= !reused(child, &resolved);
                    out.push(resolved);
                }
                if !changed {
                    return Ok(value.clone());
                }
                Ok(Value::Array(Rc::new(out)))
            }
            _ => Ok(value.clone()),
        }
    }
}

/// Whether resolving `before` handed back the same value.
fn reused(before: &Value, after: &Value) -> bool {
    match before {
        Value::Draft(_) => false,
        Value::Object(_) | Value::Array(_) => before.ptr_eq(after),
        _ => true,
    }
}
