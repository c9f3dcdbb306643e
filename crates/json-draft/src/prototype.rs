//! Prototypes: inherited properties and accessors for objects.
//!
//! A [`Prototype`] is a fixed schema shared by many objects. It holds plain
//! inherited values and accessor properties. Getters and setters receive the
//! value they were invoked on, so when invoked through a draft they observe
//! (and write through) the draft rather than the raw base object.
//!
//! ```
//! use std::rc::Rc;
//! use json_draft::{produce, Object, Props, Prototype, Value};
//!
//! let person = Prototype::builder("Person")
//!     .getter("full_name", |this| {
//!         let first = this.get("first")?.to_js_string();
//!         let last = this.get("last")?.to_js_string();
//!         Ok(Value::from(format!("{} {}", first, last)))
//!     })
//!     .build();
//! let mut props = Props::new();
//! props.insert("first".into(), "Ada".into());
//! props.insert("last".into(), "Byron".into());
//! let base = Value::from(Object::with_prototype(Rc::clone(&person), props));
//!
//! let next = produce(&base, |draft| {
//!     draft.set("last", "Lovelace")?;
//!     assert_eq!(draft.get("full_name")?, Value::from("Ada Lovelace"));
//!     Ok(())
//! })
//! .unwrap();
//! assert_eq!(next.get("full_name").unwrap(), Value::from("Ada Lovelace"));
//! ```

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::Result;
use crate::value::Value;

/// Computed read: receives the value (or draft) the property was read on.
pub type Getter = Rc<dyn Fn(&Value) -> Result<Value>>;

/// Computed write: receives the receiver and the assigned value.
pub type Setter = Rc<dyn Fn(&Value, Value) -> Result<()>>;

/// An inherited property.
#[derive(Clone)]
pub enum Property {
    /// A plain inherited value.
    Value(Value),
    /// A computed property. Either half may be missing.
    Accessor {
        get: Option<Getter>,
        set: Option<Setter>,
    },
}

/// A named, immutable set of inherited properties, optionally chained to a
/// parent prototype.
pub struct Prototype {
    name: String,
    parent: Option<Rc<Prototype>>,
    properties: IndexMap<String, Property>,
    draftable: bool,
}

impl Prototype {
    pub fn builder(name: impl Into<String>) -> PrototypeBuilder {
        PrototypeBuilder {
            prototype: Prototype {
                name: name.into(),
                parent: None,
                properties: IndexMap::new(),
                draftable: true,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Rc<Prototype>> {
        self.parent.as_ref()
    }

    /// Objects with a non-draftable prototype are treated as opaque leaves:
    /// reads return them as-is instead of wrapping them in a draft.
    pub fn is_draftable(&self) -> bool {
        self.draftable
    }

    pub fn own_property(&self, key: &str) -> Option<&Property> {
        self.properties.get(key)
    }

    /// Look `key` up along the prototype chain, nearest first.
    pub fn find(&self, key: &str) -> Option<&Property> {
        let mut proto = Some(self);
        while let Some(current) = proto {
            if let Some(property) = current.properties.get(key) {
                return Some(property);
            }
            proto = current.parent.as_deref();
        }
        None
    }

    /// The setter for `key`, if the chain defines one.
    pub fn find_setter(&self, key: &str) -> Option<Setter> {
        match self.find(key) {
            Some(Property::Accessor { set: Some(set), .. }) => Some(Rc::clone(set)),
            _ => None,
        }
    }
}

impl fmt::Debug for Prototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prototype")
            .field("name", &self.name)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("draftable", &self.draftable)
            .finish()
    }
}

/// Builder for [`Prototype`].
pub struct PrototypeBuilder {
    prototype: Prototype,
}

impl PrototypeBuilder {
    pub fn parent(mut self, parent: Rc<Prototype>) -> Self {
        self.prototype.parent = Some(parent);
        self
    }

    pub fn draftable(mut self, draftable: bool) -> Self {
        self.prototype.draftable = draftable;
        self
    }

    pub fn value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.prototype
            .properties
            .insert(key.into(), Property::Value(value.into()));
        self
    }

    pub fn getter<F>(self, key: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&Value) -> Result<Value> + 'static,
    {
        let getter: Getter = Rc::new(getter);
        self.accessor(key, Some(getter), None)
    }

    pub fn setter<F>(self, key: impl Into<String>, setter: F) -> Self
    where
        F: Fn(&Value, Value) -> Result<()> + 'static,
    {
        let setter: Setter = Rc::new(setter);
        self.accessor(key, None, Some(setter))
    }

    /// Define (or extend) an accessor. Halves passed as `None` keep whatever
    /// an earlier accessor definition for the same key provided.
    pub fn accessor(
        mut self,
        key: impl Into<String>,
        get: Option<Getter>,
        set: Option<Setter>,
    ) -> Self {
        let key = key.into();
        let (prev_get, prev_set) = match self.prototype.properties.shift_remove(&key) {
            Some(Property::Accessor { get, set }) => (get, set),
            _ => (None, None),
        };
        self.prototype.properties.insert(
            key,
            Property::Accessor {
                get: get.or(prev_get),
                set: set.or(prev_set),
            },
        );
        self
    }

    pub fn build(self) -> Rc<Prototype> {
        Rc::new(self.prototype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_walks_the_chain() {
        let base = Prototype::builder("Base").value("kind", "base").build();
        let child = Prototype::builder("Child")
            .parent(Rc::clone(&base))
            .value("own", 1)
            .build();
        assert!(matches!(child.find("own"), Some(Property::Value(_))));
        assert!(matches!(child.find("kind"), Some(Property::Value(_))));
        assert!(child.find("missing").is_none());
        assert!(child.own_property("kind").is_none());
    }

    #[test]
    fn getter_and_setter_merge_into_one_accessor() {
        let proto = Prototype::builder("P")
            .getter("x", |_| Ok(Value::from(1)))
            .setter("x", |_, _| Ok(()))
            .build();
        match proto.find("x") {
            Some(Property::Accessor { get, set }) => {
                assert!(get.is_some());
                assert!(set.is_some());
            }
            _ => panic!("expected accessor"),
        }
        assert!(proto.find_setter("x").is_some());
    }

    #[test]
    fn accessor_replaces_plain_value() {
        let proto = Prototype::builder("P")
            .value("x", 1)
            .getter("x", |_| Ok(Value::from(2)))
            .build();
        assert!(matches!(proto.find("x"), Some(Property::Accessor { .. })));
        assert!(proto.find_setter("x").is_none());
    }
}
