//! One-shot "first modification" notifications.
//!
//! A callback registered on a draft runs exactly once, the first time that
//! draft becomes modified, whether by a direct write or by a write to one of
//! its descendants. Registering on a draft that is already modified runs the
//! callback right away.
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use json_draft::{Session, Value};
//! use serde_json::json;
//!
//! let session = Session::default();
//! let draft = session.create_draft(&Value::from(json!({"a": {"b": 1}}))).unwrap();
//! let fired = Rc::new(Cell::new(0));
//! let counter = Rc::clone(&fired);
//! draft.once_modified(move |_| counter.set(counter.get() + 1)).unwrap();
//!
//! let a = draft.get("a").unwrap();
//! a.as_draft().unwrap().set("b", 2).unwrap();
//! draft.set("c", 3).unwrap();
//! assert_eq!(fired.get(), 1);
//! ```

use std::rc::Rc;

use tracing::trace;

use crate::error::Result;
use crate::state::{get_draft_state, Draft, ModifiedCallback};
use crate::value::Value;

fn same_callback(a: &ModifiedCallback, b: &ModifiedCallback) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

impl Draft {
    /// Run `callback` once, when this draft is first modified.
    pub fn once_modified<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(&Draft) + 'static,
    {
        self.register_once_modified(Rc::new(callback))
    }

    /// Like [`Draft::once_modified`], taking a shared callback. Registering
    /// the same `Rc` twice while pending has no further effect.
    pub fn register_once_modified(&self, callback: ModifiedCallback) -> Result<()> {
        {
            let mut state = self.state_mut()?;
            if !state.modified {
                let pending = state.callbacks.get_or_insert_with(Vec::new);
                if !pending.iter().any(|known| same_callback(known, &callback)) {
                    pending.push(callback);
                    trace!(pending = pending.len(), "registered once-modified callback");
                }
                return Ok(());
            }
        }
        callback(self);
        Ok(())
    }
}

/// Register `callback` on the draft behind `value`.
///
/// # Errors
///
/// [`DraftError::NotADraft`](crate::DraftError::NotADraft) if `value` is not
/// a draft.
pub fn register_once_modified(value: &Value, callback: ModifiedCallback) -> Result<()> {
    get_draft_state(value)?.register_once_modified(callback)
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use serde_json::json;

    use super::*;
    use crate::session::Session;

    fn counter() -> (Rc<Cell<usize>>, ModifiedCallback) {
        let count = Rc::new(Cell::new(0));
        let inner = Rc::clone(&count);
        let callback: ModifiedCallback = Rc::new(move |_: &Draft| inner.set(inner.get() + 1));
        (count, callback)
    }

    #[test]
    fn fires_once_on_first_write() {
        let draft = Session::default()
            .create_draft(&Value::from(json!({"a": 1})))
            .unwrap();
        let (count, callback) = counter();
        draft.register_once_modified(callback).unwrap();
        draft.set("a", 1).unwrap();
        assert_eq!(count.get(), 0);
        draft.set("a", 2).unwrap();
        draft.set("a", 3).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn duplicate_registration_is_idempotent() {
        let draft = Session::default()
            .create_draft(&Value::from(json!({})))
            .unwrap();
        let (count, callback) = counter();
        draft.register_once_modified(Rc::clone(&callback)).unwrap();
        draft.register_once_modified(callback).unwrap();
        draft.set("x", 1).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn registration_after_modification_fires_immediately() {
        let draft = Session::default()
            .create_draft(&Value::from(json!({})))
            .unwrap();
        draft.set("x", 1).unwrap();
        let (count, callback) = counter();
        draft.register_once_modified(Rc::clone(&callback)).unwrap();
        draft.register_once_modified(callback).unwrap();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn callbacks_run_in_registration_order_and_may_reenter() {
        let draft = Session::default()
            .create_draft(&Value::from(json!({"n": 0})))
            .unwrap();
        let order = Rc::new(RefCell::new(Vec::new()));
        for label in ["first", "second"] {
            let order = Rc::clone(&order);
            draft
                .once_modified(move |d| {
                    // Reading and writing from inside the callback is allowed.
                    let n = d.get("n").unwrap().as_f64().unwrap();
                    d.set("n", n + 1.0).unwrap();
                    order.borrow_mut().push(label);
                })
                .unwrap();
        }
        draft.set("n", 10).unwrap();
        assert_eq!(*order.borrow(), vec!["first", "second"]);
        // The triggering write lands after the callbacks ran.
        assert_eq!(draft.get("n").unwrap(), Value::from(10));
    }

    #[test]
    fn non_draft_is_rejected() {
        let (_, callback) = counter();
        let err = register_once_modified(&Value::from(json!({"a": 1})), callback).unwrap_err();
        assert_eq!(err.to_string(), "expected a draft, got: [object Object]");
    }
}
