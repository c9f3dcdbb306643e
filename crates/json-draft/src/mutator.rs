//! Rewritten array methods.
//!
//! Each method applies the native array semantics to the draft's copy and
//! moves the old-index ledger in lockstep, so finalization can tell which
//! slot came from where in the base.
//!
//! ```
//! use json_draft::{Session, Value};
//! use serde_json::json;
//!
//! let session = Session::default();
//! let draft = session.create_draft(&Value::from(json!([3, 1, 2]))).unwrap();
//! draft.sort().unwrap();
//! assert_eq!(draft.old_indexes(), Some(vec![1, 2, 0]));
//! assert_eq!(session.finish(&draft).unwrap().to_json().unwrap(), json!([1, 2, 3]));
//! ```

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::ops::Range;

use json_draft_util::merge_sort_by;
use tracing::trace;

use crate::config::ProvenancePolicy;
use crate::error::{DraftError, Result};
use crate::state::{mark_changed, Draft, UNKNOWN_INDEX};
use crate::value::{default_compare, Value};

/// The array methods that drafts rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayMethod {
    Push,
    Pop,
    Shift,
    Unshift,
    Splice,
    Reverse,
    Sort,
}

impl ArrayMethod {
    pub const ALL: [ArrayMethod; 7] = [
        ArrayMethod::Push,
        ArrayMethod::Pop,
        ArrayMethod::Shift,
        ArrayMethod::Unshift,
        ArrayMethod::Splice,
        ArrayMethod::Reverse,
        ArrayMethod::Sort,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|method| method.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            ArrayMethod::Push => "push",
            ArrayMethod::Pop => "pop",
            ArrayMethod::Shift => "shift",
            ArrayMethod::Unshift => "unshift",
            ArrayMethod::Splice => "splice",
            ArrayMethod::Reverse => "reverse",
            ArrayMethod::Sort => "sort",
        }
    }
}

impl fmt::Display for ArrayMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A rewritten array method bound to its draft, invoked with dynamic
/// arguments like the native method would be.
#[derive(Debug, Clone)]
pub struct BoundMethod {
    draft: Draft,
    method: ArrayMethod,
}

impl BoundMethod {
    pub fn method(&self) -> ArrayMethod {
        self.method
    }

    /// Invoke the method.
    ///
    /// `push` and `unshift` return the new length, `pop` and `shift` the
    /// removed element, `splice` an array of the removed elements, and
    /// `reverse` and `sort` the draft itself. `sort` always uses the default
    /// order; use [`Draft::sort_by`] for a custom comparator.
    pub fn call(&self, args: Vec<Value>) -> Result<Value> {
        let draft = &self.draft;
        match self.method {
            ArrayMethod::Push => draft.push(args).map(Value::from),
            ArrayMethod::Pop => draft.pop(),
            ArrayMethod::Shift => draft.shift(),
            ArrayMethod::Unshift => draft.unshift(args).map(Value::from),
            ArrayMethod::Splice => {
                let arg_count = args.len();
                let mut args = args.into_iter();
                let start = args.next().map_or(0, |v| to_integer(&v));
                let delete_count = match (arg_count, args.next()) {
                    (0, _) => Some(0),
                    (_, None) => None,
                    (_, Some(count)) => Some(usize::try_from(to_integer(&count)).unwrap_or(0)),
                };
                draft.splice(start, delete_count, args).map(Value::from)
            }
            ArrayMethod::Reverse => {
                draft.reverse()?;
                Ok(Value::Draft(draft.clone()))
            }
            ArrayMethod::Sort => {
                draft.sort()?;
                Ok(Value::Draft(draft.clone()))
            }
        }
    }
}

/// `ToIntegerOrInfinity`, saturated to `isize`.
fn to_integer(value: &Value) -> isize {
    let n = match value {
        Value::Number(n) => *n,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse().unwrap_or(f64::NAN)
            }
        }
        _ => 0.0,
    };
    // `as` saturates and maps NaN to 0.
    n.trunc() as isize
}

/// Resolve a relative `start` against `len`, like `Array.prototype.splice`.
fn relative_index(start: isize, len: usize) -> usize {
    if start < 0 {
        len.saturating_sub(start.unsigned_abs())
    } else {
        start.unsigned_abs().min(len)
    }
}

/// Holds the mutation flag for the duration of one method call.
struct MutatingGuard<'a> {
    draft: &'a Draft,
    previous: bool,
}

impl Drop for MutatingGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.draft.cell.try_borrow_mut() {
            state.set_mutating_array(self.previous);
        }
    }
}

fn begin(draft: &Draft, method: ArrayMethod) -> Result<MutatingGuard<'_>> {
    {
        let mut state = draft.state_mut()?;
        if !state.is_array() {
            return Err(DraftError::NotAnArray(method.name().to_string()));
        }
        state.prepare_copy();
    }
    mark_changed(draft);
    let previous = draft.state_mut()?.set_mutating_array(true);
    trace!(method = method.name(), "array method");
    Ok(MutatingGuard { draft, previous })
}

/// Read every slot through `get`, so untouched draftable elements become
/// nested drafts before they move.
fn read_all(draft: &Draft) -> Result<Vec<Value>> {
    let len = draft.state()?.len();
    (0..len).map(|index| draft.get(&index.to_string())).collect()
}

/// The copy as it stands, without drafting anything.
fn snapshot(draft: &Draft, method: ArrayMethod) -> Result<Vec<Value>> {
    let mut state = draft.state_mut()?;
    match state.array_parts() {
        Some((copy, _)) => Ok(copy.clone()),
        None => Err(DraftError::NotAnArray(method.name().to_string())),
    }
}

/// Apply `edit` to the copy and old indexes, then record the slots whose
/// content changed relative to `before`.
fn rewrite<R>(
    draft: &Draft,
    method: ArrayMethod,
    before: &[Value],
    edit: impl FnOnce(&mut Vec<Value>, &mut Vec<isize>) -> R,
) -> Result<R> {
    let mut state = draft.state_mut()?;
    let out = match state.array_parts() {
        Some((copy, old_indexes)) => edit(copy, old_indexes),
        None => return Err(DraftError::NotAnArray(method.name().to_string())),
    };
    state.record_array_writes(before);
    Ok(out)
}

/// Old indexes for `items` about to be inserted. With `window`, the slots in
/// it are about to be removed and release their base indices.
fn resolve_provenance(
    draft: &Draft,
    items: &[Value],
    window: Option<Range<usize>>,
) -> Result<Vec<isize>> {
    let policy = draft.session().config().provenance;
    if policy == ProvenancePolicy::Unknown {
        return Ok(vec![UNKNOWN_INDEX; items.len()]);
    }
    let identities: Vec<_> = items
        .iter()
        .map(|item| match item {
            Value::Draft(draft) => draft.base().identity(),
            other => other.identity(),
        })
        .collect();

    let mut state = draft.state_mut()?;
    let positions = state.base_positions();
    let window = window.unwrap_or(0..0);
    let mut claimed: HashSet<usize> = state
        .old_indexes_mut()
        .map(|old| {
            old.iter()
                .enumerate()
                .filter(|(slot, _)| !window.contains(slot))
                .filter_map(|(_, &index)| usize::try_from(index).ok())
                .collect()
        })
        .unwrap_or_default();

    let resolved: Vec<isize> = identities
        .into_iter()
        .map(|identity| {
            let free = identity
                .and_then(|identity| positions.get(&identity))
                .and_then(|candidates| candidates.iter().copied().find(|c| !claimed.contains(c)));
            match free {
                Some(index) => {
                    claimed.insert(index);
                    index as isize
                }
                None => UNKNOWN_INDEX,
            }
        })
        .collect();
    trace!(?resolved, "resolved provenance");
    Ok(resolved)
}

impl Draft {
    /// Look up a rewritten array method by name.
    ///
    /// Returns `None` on object drafts, for other names, and while another
    /// rewritten method is already running on this array.
    pub fn method(&self, name: &str) -> Result<Option<BoundMethod>> {
        let state = self.state()?;
        if !state.is_array() || state.is_mutating_array() {
            return Ok(None);
        }
        Ok(ArrayMethod::from_name(name).map(|method| BoundMethod {
            draft: self.clone(),
            method,
        }))
    }

    /// Append `items`, returning the new length.
    pub fn push<I>(&self, items: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let items: Vec<Value> = items.into_iter().map(Into::into).collect();
        let _guard = begin(self, ArrayMethod::Push)?;
        let before = snapshot(self, ArrayMethod::Push)?;
        let provenance = resolve_provenance(self, &items, None)?;
        rewrite(self, ArrayMethod::Push, &before, |copy, old| {
            copy.extend(items);
            old.extend(provenance);
            copy.len()
        })
    }

    /// Remove and return the last element (`undefined` when empty).
    pub fn pop(&self) -> Result<Value> {
        let _guard = begin(self, ArrayMethod::Pop)?;
        let len = self.state()?.len();
        let Some(last) = len.checked_sub(1) else {
            return Ok(Value::Undefined);
        };
        let value = self.get(&last.to_string())?;
        let before = snapshot(self, ArrayMethod::Pop)?;
        rewrite(self, ArrayMethod::Pop, &before, |copy, old| {
            copy.truncate(last);
            old.truncate(last);
        })?;
        Ok(value)
    }

    /// Remove and return the first element (`undefined` when empty).
    pub fn shift(&self) -> Result<Value> {
        let _guard = begin(self, ArrayMethod::Shift)?;
        let before = read_all(self)?;
        let Some(first) = before.first().cloned() else {
            return Ok(Value::Undefined);
        };
        rewrite(self, ArrayMethod::Shift, &before, |copy, old| {
            copy.remove(0);
            if !old.is_empty() {
                old.remove(0);
            }
        })?;
        Ok(first)
    }

    /// Prepend `items`, returning the new length.
    pub fn unshift<I>(&self, items: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let items: Vec<Value> = items.into_iter().map(Into::into).collect();
        let _guard = begin(self, ArrayMethod::Unshift)?;
        let before = read_all(self)?;
        let provenance = resolve_provenance(self, &items, None)?;
        rewrite(self, ArrayMethod::Unshift, &before, |copy, old| {
            copy.splice(0..0, items);
            old.splice(0..0, provenance);
            copy.len()
        })
    }

    /// Remove `delete_count` elements at `start` and insert `items` there.
    ///
    /// A negative `start` counts from the end. Without `delete_count`
    /// everything from `start` on is removed. Returns the removed elements.
    pub fn splice<I>(&self, start: isize, delete_count: Option<usize>, items: I) -> Result<Vec<Value>>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let items: Vec<Value> = items.into_iter().map(Into::into).collect();
        let _guard = begin(self, ArrayMethod::Splice)?;
        let before = read_all(self)?;
        let len = before.len();
        let start = relative_index(start, len);
        let delete_count = delete_count.map_or(len - start, |count| count.min(len - start));
        let window = start..start + delete_count;
        let provenance = resolve_provenance(self, &items, Some(window.clone()))?;
        let removed = before[window.clone()].to_vec();
        rewrite(self, ArrayMethod::Splice, &before, |copy, old| {
            copy.splice(window.clone(), items);
            let old_window = window.start.min(old.len())..window.end.min(old.len());
            old.splice(old_window, provenance);
        })?;
        Ok(removed)
    }

    /// Reverse the array in place.
    pub fn reverse(&self) -> Result<()> {
        let _guard = begin(self, ArrayMethod::Reverse)?;
        let before = read_all(self)?;
        rewrite(self, ArrayMethod::Reverse, &before, |copy, old| {
            copy.reverse();
            old.reverse();
        })
    }

    /// Sort in the default order: `undefined` last, everything else by the
    /// UTF-16 code units of its string form.
    pub fn sort(&self) -> Result<()> {
        self.sort_by(default_compare)
    }

    /// Stable sort with a custom comparator.
    ///
    /// The comparator sees the elements as read through the draft, so
    /// untouched objects arrive as nested drafts. It may be inconsistent;
    /// the result is then some permutation of the elements.
    pub fn sort_by<F>(&self, mut compare: F) -> Result<()>
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        let _guard = begin(self, ArrayMethod::Sort)?;
        let before = read_all(self)?;
        let old_before = self.old_indexes().unwrap_or_default();
        let mut order: Vec<usize> = (0..before.len()).collect();
        merge_sort_by(&mut order, |a, b| compare(&before[*a], &before[*b]));
        rewrite(self, ArrayMethod::Sort, &before, |copy, old| {
            *copy = order.iter().map(|&i| before[i].clone()).collect();
            *old = order
                .iter()
                .map(|&i| old_before.get(i).copied().unwrap_or(UNKNOWN_INDEX))
                .collect();
        })
    }
}
