use crate::error::{DraftError, Result};
use crate::state::{Draft, UNKNOWN_INDEX};
use crate::value::{array_index, Value};

use super::object;

enum Slot {
    Index(usize),
    Length(usize),
}

fn parse_length(value: &Value) -> Result<usize> {
    match value.as_f64() {
        Some(n) if n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX) => Ok(n as usize),
        _ => Err(DraftError::InvalidArrayLength(value.to_js_string())),
    }
}

pub(super) fn set(draft: &Draft, key: &str, value: Value) -> Result<()> {
    let slot = if key == "length" {
        Slot::Length(parse_length(&value)?)
    } else if let Some(index) = array_index(key) {
        Slot::Index(index)
    } else {
        return Err(DraftError::ArraySet(key.to_string()));
    };
    {
        let mut state = draft.state_mut()?;
        let required = match slot {
            Slot::Index(index) => index + 1,
            Slot::Length(len) => len,
        };
        let limit = state.session.config().max_array_len;
        if required > state.len() && required > limit {
            return Err(DraftError::ArrayTooLarge(required, limit));
        }
        if !state.is_mutating_array() {
            if let Some(old) = state.old_indexes_mut() {
                match slot {
                    Slot::Index(index) => {
                        if old.len() <= index {
                            old.resize(index + 1, UNKNOWN_INDEX);
                        }
                        old[index] = UNKNOWN_INDEX;
                    }
                    Slot::Length(len) => old.resize(len, UNKNOWN_INDEX),
                }
            }
        }
    }
    object::set(draft, key, value)
}

pub(super) fn delete(draft: &Draft, key: &str) -> Result<()> {
    let Some(index) = array_index(key) else {
        return Err(DraftError::ArrayDelete(key.to_string()));
    };
    {
        let mut state = draft.state_mut()?;
        let len = state.len();
        if !state.is_mutating_array() && index < len {
            if let Some(slot) = state.old_indexes_mut().and_then(|old| old.get_mut(index)) {
                *slot = UNKNOWN_INDEX;
            }
        }
    }
    object::delete(draft, key)
}
