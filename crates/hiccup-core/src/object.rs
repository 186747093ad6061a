//! Type-erased object handles and the dynamic object model
//!
//! An `ObjectRef` is what the projection walks and what queries hand back.
//! Identity is pointer identity: two handles are the same object exactly when
//! they share an allocation (`ObjectRef::ptr_eq`). Cloning a handle never
//! creates a new object.
//!
//! Besides plain Rust values, three model types mirror the shapes found in a
//! dynamic object graph:
//! - `Record`: a named bag of members, some of them computed on access
//! - `Callable`: a function value (treated as a method and excluded by default)
//! - `Tuple` / `Mapping`: fixed sequences and arbitrary-key associative lists

use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

/// Shared, type-erased handle to one object in a graph
#[derive(Clone)]
pub struct ObjectRef {
    inner: Rc<dyn Any>,
    type_name: &'static str,
}

impl ObjectRef {
    /// Move `value` into a new object
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            inner: Rc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Wrap an existing `Rc`, so the handle is identical to every other
    /// handle made from the same allocation
    pub fn from_rc<T: Any>(rc: Rc<T>) -> Self {
        Self {
            inner: rc,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// A fresh null value
    pub fn none() -> Self {
        Self::new(())
    }

    pub fn is_none(&self) -> bool {
        self.is::<()>()
    }

    pub fn is<T: Any>(&self) -> bool {
        (*self.inner).is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.inner).downcast_ref::<T>()
    }

    /// `TypeId` of the wrapped value (not of the handle)
    pub fn value_type_id(&self) -> TypeId {
        Any::type_id(&*self.inner)
    }

    /// Fully qualified Rust type name of the wrapped value
    pub fn rust_type_name(&self) -> &'static str {
        self.type_name
    }

    /// Display name of the value's type: a record's own type name, otherwise
    /// the Rust type name without module path or generic arguments
    pub fn display_type_name(&self) -> String {
        match self.downcast_ref::<Record>() {
            Some(record) => record.type_name().to_string(),
            None => short_type_name(self.type_name).to_string(),
        }
    }

    /// Whether both handles point at the same object
    pub fn ptr_eq(a: &ObjectRef, b: &ObjectRef) -> bool {
        a.addr() == b.addr()
    }

    /// Address of the shared allocation; stable while any handle is alive
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.inner) as *const () as usize
    }

    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({}@{:#x})", self.display_type_name(), self.addr())
    }
}

/// Strip module paths and generic arguments from a Rust type name
///
/// `alloc::collections::btree::map::BTreeMap<String, ObjectRef>` becomes
/// `BTreeMap`; `()` stays `()`.
pub fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

impl From<bool> for ObjectRef {
    fn from(value: bool) -> Self {
        ObjectRef::new(value)
    }
}

impl From<i64> for ObjectRef {
    fn from(value: i64) -> Self {
        ObjectRef::new(value)
    }
}

impl From<f64> for ObjectRef {
    fn from(value: f64) -> Self {
        ObjectRef::new(value)
    }
}

impl From<&str> for ObjectRef {
    fn from(value: &str) -> Self {
        ObjectRef::new(value.to_string())
    }
}

impl From<String> for ObjectRef {
    fn from(value: String) -> Self {
        ObjectRef::new(value)
    }
}

impl From<Vec<ObjectRef>> for ObjectRef {
    fn from(value: Vec<ObjectRef>) -> Self {
        ObjectRef::new(value)
    }
}

impl From<Record> for ObjectRef {
    fn from(value: Record) -> Self {
        ObjectRef::new(value)
    }
}

// ===== Records =====

/// Computed member: evaluated each time it is read, may fail
#[derive(Clone)]
pub struct Property(Rc<dyn Fn() -> Result<ObjectRef, String>>);

impl Property {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> Result<ObjectRef, String> + 'static,
    {
        Self(Rc::new(f))
    }

    /// # Errors
    ///
    /// Returns the message produced by the property when it cannot be read.
    pub fn get(&self) -> Result<ObjectRef, String> {
        (self.0)()
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Property(..)")
    }
}

/// A named member of a record or registered type
#[derive(Debug, Clone)]
pub enum Member {
    /// Stored value; reading it returns the same object every time
    Value(ObjectRef),
    /// Computed value; every read may produce a new object
    Property(Property),
}

impl Member {
    /// Read the member's current value
    ///
    /// # Errors
    ///
    /// Returns the property's failure message when a computed member cannot
    /// be read.
    pub fn resolve(&self) -> Result<ObjectRef, String> {
        match self {
            Member::Value(value) => Ok(value.clone()),
            Member::Property(property) => property.get(),
        }
    }
}

impl From<ObjectRef> for Member {
    fn from(value: ObjectRef) -> Self {
        Member::Value(value)
    }
}

/// Dynamic record: a type name plus ordered members
///
/// # Example
///
/// ```
/// use hiccup_core::{ObjectRef, Record};
///
/// let user = Record::new("User")
///     .field("name", ObjectRef::from("ada"))
///     .property("upper", || Ok(ObjectRef::from("ADA")))
///     .method("greet", |_| ObjectRef::from("hi"));
///
/// assert_eq!(user.type_name(), "User");
/// assert_eq!(user.members().len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct Record {
    type_name: String,
    members: Vec<(String, Member)>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            members: Vec::new(),
        }
    }

    /// Add a stored member
    pub fn field(mut self, name: impl Into<String>, value: ObjectRef) -> Self {
        self.members.push((name.into(), Member::Value(value)));
        self
    }

    /// Add a computed member
    pub fn property<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Result<ObjectRef, String> + 'static,
    {
        self.members
            .push((name.into(), Member::Property(Property::new(f))));
        self
    }

    /// Add a method: a stored `Callable` member
    pub fn method<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[ObjectRef]) -> ObjectRef + 'static,
    {
        let name = name.into();
        let callable = ObjectRef::new(Callable::new(name.clone(), f));
        self.field(name, callable)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn members(&self) -> &[(String, Member)] {
        &self.members
    }

    pub fn get(&self, name: &str) -> Option<&Member> {
        self.members
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, m)| m)
    }

    /// Read a member's value by name
    pub fn value(&self, name: &str) -> Option<ObjectRef> {
        self.get(name).and_then(|m| m.resolve().ok())
    }
}

// ===== Callables and collections =====

/// Function value
#[derive(Clone)]
pub struct Callable {
    name: String,
    f: Rc<dyn Fn(&[ObjectRef]) -> ObjectRef>,
}

impl Callable {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[ObjectRef]) -> ObjectRef + 'static,
    {
        Self {
            name: name.into(),
            f: Rc::new(f),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[ObjectRef]) -> ObjectRef {
        (self.f)(args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self.name)
    }
}

/// Fixed-size ordered collection
#[derive(Debug, Clone, Default)]
pub struct Tuple(pub Vec<ObjectRef>);

/// Associative container with arbitrary keys, in insertion order
#[derive(Debug, Clone, Default)]
pub struct Mapping(pub Vec<(ObjectRef, ObjectRef)>);

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, key: impl Into<ObjectRef>, value: ObjectRef) -> Self {
        self.0.push((key.into(), value));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_identity() {
        let a = ObjectRef::from("x");
        let b = a.clone();
        let c = ObjectRef::from("x");

        assert!(ObjectRef::ptr_eq(&a, &b));
        assert!(!ObjectRef::ptr_eq(&a, &c));
    }

    #[test]
    fn test_none_values_are_distinct_objects() {
        let a = ObjectRef::none();
        let b = ObjectRef::none();
        assert!(a.is_none());
        assert!(!ObjectRef::ptr_eq(&a, &b));
    }

    #[test]
    fn test_from_rc_shares_allocation() {
        let rc = Rc::new(42i64);
        let a = ObjectRef::from_rc(rc.clone());
        let b = ObjectRef::from_rc(rc);
        assert!(ObjectRef::ptr_eq(&a, &b));
        assert_eq!(a.downcast_ref::<i64>(), Some(&42));
    }

    #[test]
    fn test_value_type_id_is_of_wrapped_value() {
        let obj = ObjectRef::new(1u8);
        assert_eq!(obj.value_type_id(), TypeId::of::<u8>());
        assert!(obj.is::<u8>());
        assert!(!obj.is::<i64>());
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(
            short_type_name("alloc::collections::btree::map::BTreeMap<alloc::string::String, x::ObjectRef>"),
            "BTreeMap"
        );
        assert_eq!(short_type_name("()"), "()");
        assert_eq!(short_type_name("my_crate::model::Person"), "Person");
    }

    #[test]
    fn test_display_type_name_prefers_record_name() {
        let record = ObjectRef::from(Record::new("Invoice"));
        assert_eq!(record.display_type_name(), "Invoice");
        assert_eq!(ObjectRef::from(1i64).display_type_name(), "i64");
    }

    #[test]
    fn test_record_members() {
        let record = Record::new("User")
            .field("name", ObjectRef::from("ada"))
            .property("broken", || Err("nope".to_string()))
            .method("greet", |_| ObjectRef::from("hi"));

        assert_eq!(
            record
                .value("name")
                .and_then(|v| v.downcast_ref::<String>().cloned()),
            Some("ada".to_string())
        );
        assert!(record.value("broken").is_none());
        assert!(record.value("greet").unwrap().is::<Callable>());
        assert!(record.get("missing").is_none());
    }

    #[test]
    fn test_callable_invocation() {
        let add_one = Callable::new("add_one", |args| {
            let n = args[0].downcast_ref::<i64>().copied().unwrap_or(0);
            ObjectRef::from(n + 1)
        });
        let out = add_one.call(&[ObjectRef::from(41i64)]);
        assert_eq!(out.downcast_ref::<i64>(), Some(&42));
        assert_eq!(add_one.name(), "add_one");
    }
}
