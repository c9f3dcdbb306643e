//! Dynamic value model.
//!
//! Objects and arrays are immutable and reference counted. Two values are
//! "the same subtree" exactly when they point at the same allocation, which
//! is what structural sharing is measured against. A [`Value`] can also hold a
//! [`Draft`] handle, since draft copies store nested drafts in their slots.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use json_draft_util::strings::{compare_utf16, number_to_string};
use serde_json::Value as JsonValue;

use crate::error::{DraftError, Result};
use crate::prototype::{Property, Prototype};
use crate::state::{Draft, StateCell};

/// Ordered property map of an object.
pub type Props = IndexMap<String, Value>;

/// A JSON-like value with reference identity for objects and arrays.
#[derive(Clone, Default)]
pub enum Value {
    /// An absent value. Distinct from `Null`.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(Rc<Object>),
    Array(Rc<Vec<Value>>),
    /// A live draft handle.
    Draft(Draft),
}

/// An immutable object: ordered own properties plus an optional prototype.
#[derive(Clone, Default)]
pub struct Object {
    props: Props,
    prototype: Option<Rc<Prototype>>,
}

impl Object {
    pub fn new(props: Props) -> Self {
        Self {
            props,
            prototype: None,
        }
    }

    /// Create an object whose inherited properties come from `prototype`.
    pub fn with_prototype(prototype: Rc<Prototype>, props: Props) -> Self {
        Self {
            props,
            prototype: Some(prototype),
        }
    }

    pub(crate) fn from_parts(props: Props, prototype: Option<Rc<Prototype>>) -> Self {
        Self { props, prototype }
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn prototype(&self) -> Option<&Rc<Prototype>> {
        self.prototype.as_ref()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.props.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }
}

/// Parse a canonical array index (`"0"`, `"17"`, never `"01"` or `"-1"`).
///
/// Indices are limited to `u32::MAX - 1`, like ECMAScript array indices.
pub(crate) fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let index: u64 = key.parse().ok()?;
    if index >= u64::from(u32::MAX) {
        return None;
    }
    usize::try_from(index).ok()
}

impl Value {
    /// Build an object value from key/value pairs.
    pub fn object<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let props = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Value::Object(Rc::new(Object::new(props)))
    }

    /// Build an array value.
    pub fn array<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Array(Rc::new(items.into_iter().map(Into::into).collect()))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, Value::Draft(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Rc<Object>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Rc<Vec<Value>>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_draft(&self) -> Option<&Draft> {
        match self {
            Value::Draft(d) => Some(d),
            _ => None,
        }
    }

    /// Whether a draft may be created for this value.
    ///
    /// Arrays and drafts always are. Objects are unless their prototype opts
    /// out (see [`Prototype::is_draftable`]).
    pub fn is_draftable(&self) -> bool {
        match self {
            Value::Array(_) | Value::Draft(_) => true,
            Value::Object(o) => o.prototype().map_or(true, |p| p.is_draftable()),
            _ => false,
        }
    }

    /// Pointer identity of an object or array allocation.
    pub(crate) fn identity(&self) -> Option<*const ()> {
        match self {
            Value::Object(o) => Some(Rc::as_ptr(o) as *const ()),
            Value::Array(a) => Some(Rc::as_ptr(a) as *const ()),
            _ => None,
        }
    }

    /// Reference identity: same object/array allocation, or same draft.
    /// Primitives are never reference-identical.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Draft(a), Value::Draft(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// `SameValue` comparison: `NaN` equals `NaN`, `+0` differs from `-0`,
    /// objects and arrays compare by reference.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => {
                if a.is_nan() && b.is_nan() {
                    return true;
                }
                a == b && a.is_sign_negative() == b.is_sign_negative()
            }
            _ => self.strict_eq(other),
        }
    }

    /// Strict equality (`===`): `NaN` never equals itself, `+0 === -0`.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            _ => self.ptr_eq(other),
        }
    }

    /// Property read on any value.
    ///
    /// Drafts go through their `get` trap. Objects fall back to their
    /// prototype chain, invoking getters with this value as receiver. Arrays
    /// expose indices and `length`. Everything else reads as `undefined`.
    pub fn get(&self, key: &str) -> Result<Value> {
        match self {
            Value::Draft(draft) => draft.get(key),
            Value::Object(object) => {
                if let Some(value) = object.get(key) {
                    return Ok(value.clone());
                }
                match object.prototype().and_then(|p| p.find(key)) {
                    Some(Property::Value(value)) => Ok(value.clone()),
                    Some(Property::Accessor {
                        get: Some(getter), ..
                    }) => getter(self),
                    _ => Ok(Value::Undefined),
                }
            }
            Value::Array(items) => {
                if key == "length" {
                    return Ok(Value::from(items.len()));
                }
                Ok(array_index(key)
                    .and_then(|i| items.get(i).cloned())
                    .unwrap_or_default())
            }
            _ => Ok(Value::Undefined),
        }
    }

    /// String coercion (`String(value)`).
    ///
    /// Objects print as `[object Object]`. Arrays join their elements with
    /// `,`, printing `undefined` and `null` as empty. Drafts print their
    /// latest content. An array or draft that contains itself prints as empty
    /// where it recurs.
    pub fn to_js_string(&self) -> String {
        self.js_string_in(&mut Vec::new())
    }

    fn js_string_in(&self, visiting: &mut Vec<*const ()>) -> String {
        let id = match self {
            Value::Array(items) => Rc::as_ptr(items) as *const (),
            Value::Draft(draft) => draft.as_ptr() as *const (),
            Value::Undefined => return "undefined".to_string(),
            Value::Null => return "null".to_string(),
            Value::Bool(b) => return b.to_string(),
            Value::Number(n) => return number_to_string(*n),
            Value::String(s) => return s.to_string(),
            Value::Object(_) => return "[object Object]".to_string(),
        };
        if visiting.contains(&id) {
            return String::new();
        }
        visiting.push(id);
        let out = match self {
            Value::Draft(draft) => draft.latest_unchecked().js_string_in(visiting),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Undefined | Value::Null => String::new(),
                    other => other.js_string_in(visiting),
                })
                .collect::<Vec<_>>()
                .join(","),
            _ => String::new(),
        };
        visiting.pop();
        out
    }

    /// Convert to a `serde_json::Value`, the way `JSON.stringify` would.
    ///
    /// `undefined` object members are skipped. `undefined` and non-finite
    /// numbers become `null`. Integral numbers become JSON integers. Drafts
    /// serialize their latest content. A draft reachable from its own content
    /// fails with [`DraftError::CircularDraft`].
    pub fn to_json(&self) -> Result<JsonValue> {
        self.json_in(&mut Vec::new())
    }

    fn json_in(&self, visiting: &mut Vec<*const StateCell>) -> Result<JsonValue> {
        Ok(match self {
            Value::Undefined | Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => JsonValue::String(s.to_string()),
            Value::Object(object) => {
                let mut map = serde_json::Map::new();
                for (key, value) in object.props() {
                    if value.is_undefined() {
                        continue;
                    }
                    map.insert(key.clone(), value.json_in(visiting)?);
                }
                JsonValue::Object(map)
            }
            Value::Array(items) => JsonValue::Array(
                items
                    .iter()
                    .map(|item| item.json_in(visiting))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Draft(draft) => {
                if visiting.contains(&draft.as_ptr()) {
                    return Err(DraftError::CircularDraft);
                }
                visiting.push(draft.as_ptr());
                let json = draft.latest()?.json_in(visiting);
                visiting.pop();
                json?
            }
        })
    }
}

fn number_to_json(n: f64) -> JsonValue {
    if !n.is_finite() {
        return JsonValue::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return JsonValue::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number)
}

/// Default array sort order: `undefined` last, everything else by the UTF-16
/// code units of its string form.
pub fn default_compare(a: &Value, b: &Value) -> Ordering {
    match (a.is_undefined(), b.is_undefined()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => compare_utf16(&a.to_js_string(), &b.to_js_string()),
    }
}

// ── Equality & formatting ─────────────────────────────────────────────────

/// Deep structural equality. Drafts only equal the same draft.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Object(a), Value::Object(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let same_proto = match (a.prototype(), b.prototype()) {
                    (None, None) => true,
                    (Some(pa), Some(pb)) => Rc::ptr_eq(pa, pb),
                    _ => false,
                };
                same_proto
                    && a.len() == b.len()
                    && a.props()
                        .iter()
                        .all(|(key, value)| b.get(key).map_or(false, |other| value == other))
            }
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b) || a == b,
            _ => self.strict_eq(other),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", number_to_string(*n)),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Object(object) => {
                let mut map = f.debug_map();
                for (key, value) in object.props() {
                    map.entry(key, value);
                }
                map.finish()
            }
            Value::Array(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Draft(draft) => write!(f, "{:?}", draft),
        }
    }
}

// ── Conversions ────────────────────────────────────────────────────────────

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(Rc::new(object))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(items))
    }
}

impl From<Draft> for Value {
    fn from(draft: Draft) -> Self {
        Value::Draft(draft)
    }
}

impl From<&Draft> for Value {
    fn from(draft: &Draft) -> Self {
        Value::Draft(draft.clone())
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => Value::from(s),
            JsonValue::Array(items) => Value::array(items),
            JsonValue::Object(map) => Value::object(map),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_array_index() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("42"), Some(42));
        assert_eq!(array_index("01"), None);
        assert_eq!(array_index("-1"), None);
        assert_eq!(array_index("1.5"), None);
        assert_eq!(array_index("length"), None);
        assert_eq!(array_index(""), None);
        assert_eq!(array_index("4294967295"), None);
    }

    #[test]
    fn test_same_value_vs_strict_eq() {
        let nan = Value::Number(f64::NAN);
        assert!(nan.same_value(&nan));
        assert!(!nan.strict_eq(&nan));

        let pos = Value::Number(0.0);
        let neg = Value::Number(-0.0);
        assert!(pos.strict_eq(&neg));
        assert!(!pos.same_value(&neg));

        assert!(Value::Undefined.same_value(&Value::Undefined));
        assert!(!Value::Undefined.same_value(&Value::Null));
        assert!(Value::from("a").same_value(&Value::from("a")));
    }

    #[test]
    fn test_objects_compare_by_reference() {
        let a = Value::from(json!({"x": 1}));
        let b = Value::from(json!({"x": 1}));
        assert!(!a.same_value(&b));
        assert!(a.same_value(&a.clone()));
        // Deep equality still holds.
        assert_eq!(a, b);
    }

    #[test]
    fn test_json_roundtrip_preserves_order() {
        let json = json!({"b": 1, "a": [1, "two", null, true], "c": {"d": 1.5}});
        let value = Value::from(json.clone());
        assert_eq!(value.to_json().unwrap(), json);
        let keys: Vec<_> = value.as_object().unwrap().props().keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_to_json_undefined_handling() {
        let value = Value::object([("a", Value::Undefined), ("b", Value::from(1))]);
        assert_eq!(value.to_json().unwrap(), json!({"b": 1}));
        let value = Value::array([Value::Undefined, Value::Number(f64::NAN)]);
        assert_eq!(value.to_json().unwrap(), json!([null, null]));
    }

    #[test]
    fn test_to_js_string() {
        assert_eq!(Value::from(json!({})).to_js_string(), "[object Object]");
        assert_eq!(Value::from(json!([1, [2, 3], null])).to_js_string(), "1,2,3,");
        assert_eq!(Value::from(10).to_js_string(), "10");
        assert_eq!(Value::Undefined.to_js_string(), "undefined");
    }

    #[test]
    fn test_self_containing_draft_coercion() {
        let draft = crate::session::Session::default()
            .create_draft(&Value::from(json!([1, [2]])))
            .unwrap();
        draft.push([Value::array([Value::Draft(draft.clone())])]).unwrap();
        let handle = Value::Draft(draft);
        assert_eq!(handle.to_js_string(), "1,2,");
        assert_eq!(handle.to_json().unwrap_err(), DraftError::CircularDraft);
        assert_eq!(format!("{:?}", Value::from(json!([1, "a"]))), "[1, \"a\"]");
    }

    #[test]
    fn test_default_compare() {
        let mut values = vec![
            Value::from(10),
            Value::Undefined,
            Value::from(9),
            Value::from("a"),
            Value::from(1),
        ];
        values.sort_by(default_compare);
        assert_eq!(
            values,
            vec![
                Value::from(1),
                Value::from(10),
                Value::from(9),
                Value::from("a"),
                Value::Undefined,
            ]
        );
    }

    #[test]
    fn test_get_on_plain_values() {
        let value = Value::from(json!({"a": [1, 2]}));
        let inner = value.get("a").unwrap();
        assert_eq!(inner.get("length").unwrap(), Value::from(2));
        assert_eq!(inner.get("1").unwrap(), Value::from(2));
        assert!(inner.get("9").unwrap().is_undefined());
        assert!(value.get("missing").unwrap().is_undefined());
    }

    #[test]
    fn test_draftable() {
        assert!(Value::from(json!({})).is_draftable());
        assert!(Value::from(json!([])).is_draftable());
        assert!(!Value::from(1).is_draftable());
        assert!(!Value::Null.is_draftable());
        let opaque = Prototype::builder("Opaque").draftable(false).build();
        let value = Value::from(Object::with_prototype(opaque, Props::new()));
        assert!(!value.is_draftable());
    }
}
