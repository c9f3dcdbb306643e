use tracing::trace;

use crate::error::Result;
use crate::prototype::Property;
use crate::state::{mark_changed, Draft};
use crate::value::Value;

pub(super) fn get(draft: &Draft, key: &str) -> Result<Value> {
    let (own, base, prototype) = {
        let state = draft.state()?;
        // A finalized draft reads from its result, which holds no drafts.
        if let Some(result) = state.result.as_ref().filter(|_| state.finalized) {
            return result.get(key);
        }
        let own = state.own(key);
        let prototype = if own.is_none() { state.prototype() } else { None };
        (own, state.base_own(key), prototype)
    };
    let Some(value) = own else {
        return match prototype.as_ref().and_then(|p| p.find(key)) {
            Some(Property::Value(value)) => Ok(value.clone()),
            Some(Property::Accessor {
                get: Some(getter), ..
            }) => getter(&Value::Draft(draft.clone())),
            _ => Ok(Value::Undefined),
        };
    };
    if value.is_draft() || !value.is_draftable() {
        return Ok(value);
    }
    // Only values still shared with the base get a draft; anything assigned
    // during this session is returned as-is.
    if !base.map_or(false, |base| base.ptr_eq(&value)) {
        return Ok(value);
    }
    let session = draft.state()?.session.clone();
    let child = session.create_nested_draft(&value, draft)?;
    draft.state_mut()?.cache_child(key, child.clone());
    Ok(Value::Draft(child))
}

pub(super) fn has(draft: &Draft, key: &str) -> Result<bool> {
    let state = draft.state()?;
    if state.own(key).is_some() {
        return Ok(true);
    }
    if state.is_array() {
        return Ok(crate::mutator::ArrayMethod::from_name(key).is_some());
    }
    Ok(state.prototype().map_or(false, |p| p.find(key).is_some()))
}

pub(super) fn set(draft: &Draft, key: &str, value: Value) -> Result<()> {
    let setter = draft.state()?.prototype().and_then(|p| p.find_setter(key));
    if let Some(setter) = setter {
        trace!(key, "invoking inherited setter");
        return setter(&Value::Draft(draft.clone()), value);
    }

    {
        let mut state = draft.state_mut()?;
        if !state.modified {
            let current = state.peek(key);
            if let Value::Draft(child) = &current {
                if child.base().ptr_eq(&value) {
                    state.restore_base(key, value);
                    state.assigned.insert(key.to_string(), false);
                    return Ok(());
                }
            }
            if value.same_value(&current) && (!value.is_undefined() || state.base_has(key)) {
                return Ok(());
            }
        }
        state.prepare_copy();
    }
    mark_changed(draft);

    let mut state = draft.state_mut()?;
    let existing = state.own(key);
    let redundant = match &existing {
        Some(existing) => existing.strict_eq(&value) && !value.is_number(),
        None => false,
    };
    if redundant {
        return Ok(());
    }
    trace!(key, "write captured");
    state.write_copy(key, value);
    state.assigned.insert(key.to_string(), true);
    Ok(())
}

pub(super) fn delete(draft: &Draft, key: &str) -> Result<()> {
    let owned_by_base = draft.state()?.base_has(key);
    if owned_by_base {
        {
            let mut state = draft.state_mut()?;
            state.assigned.insert(key.to_string(), false);
            state.prepare_copy();
        }
        mark_changed(draft);
    } else {
        draft.state_mut()?.assigned.shift_remove(key);
    }
    trace!(key, "delete captured");
    draft.state_mut()?.remove_copy(key);
    Ok(())
}
