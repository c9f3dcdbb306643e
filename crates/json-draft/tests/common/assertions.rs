use std::cell::RefCell;
use std::rc::Rc;

use json_draft::{Draft, ModifiedCallback, Value};

/// Records every draft a callback was invoked with.
pub struct CallLog {
    calls: Rc<RefCell<Vec<Draft>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self {
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn callback(&self) -> ModifiedCallback {
        let calls = Rc::clone(&self.calls);
        Rc::new(move |draft: &Draft| calls.borrow_mut().push(draft.clone()))
    }

    pub fn count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// Every recorded invocation received exactly `draft`.
    pub fn all_received(&self, draft: &Draft) -> bool {
        self.calls.borrow().iter().all(|seen| seen.ptr_eq(draft))
    }
}

pub fn assert_json(value: &Value, expected: serde_json::Value) {
    let actual = value.to_json().unwrap_or_else(|e| panic!("to_json failed: {e}"));
    assert_eq!(actual, expected, "value mismatch");
}

/// `actual` and `expected` are the same allocation.
pub fn assert_shared(actual: &Value, expected: &Value, what: &str) {
    assert!(actual.ptr_eq(expected), "{what} should be shared with the base");
}

pub fn assert_not_shared(actual: &Value, expected: &Value, what: &str) {
    assert!(!actual.ptr_eq(expected), "{what} should have been copied");
}
