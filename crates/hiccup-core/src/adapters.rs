//! Value classification: which objects are primitives, sequences or mappings
//!
//! Each concern is a separate trait so callers can swap one without touching
//! the others. The defaults cover the standard Rust shapes listed below.
//!
//! | classifier | default types |
//! |------------|---------------|
//! | primitive  | `()`, `bool`, integers, `f32`/`f64`, `String`, `&'static str`, `char` |
//! | sequence   | `Vec<ObjectRef>`, `VecDeque<ObjectRef>`, `Tuple`, string and integer sets |
//! | mapping    | `Mapping`, `BTreeMap<String, ObjectRef>`, `HashMap<String, ObjectRef>` |

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use hiccup_xpath::{is_valid_tag, sanitize_tag};

use crate::errors::{HiccupError, Result};
use crate::object::{Mapping, ObjectRef, Tuple};

/// Decides whether a value is a primitive and renders its text
pub trait PrimitiveAdapter {
    /// `Ok(Some(text))` for primitives, `Ok(None)` for anything else
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedValue` when the value is recognised as primitive
    /// but cannot be rendered.
    fn classify(&self, value: &ObjectRef) -> Result<Option<String>>;
}

/// Decides whether a value is an ordered collection and lists its items
pub trait SequenceAdapter {
    fn classify(&self, value: &ObjectRef) -> Option<Vec<ObjectRef>>;
}

/// Decides whether a value is associative and lists its entries
pub trait MappingAdapter {
    fn classify(&self, value: &ObjectRef) -> Option<Vec<(ObjectRef, ObjectRef)>>;
}

/// Produces the tag used for non-primitive, non-sequence values
pub trait TypeNamer {
    fn type_name(&self, value: &ObjectRef) -> String;
}

// ===== Primitives =====

type Converter = Box<dyn Fn(&ObjectRef) -> Option<String>>;

/// Table of primitive converters keyed by `TypeId`
///
/// A type registered through [`DefaultPrimitives::mark_primitive`] has no
/// converter: it classifies as primitive and fails to render.
pub struct DefaultPrimitives {
    converters: HashMap<TypeId, Option<Converter>>,
}

impl DefaultPrimitives {
    /// Table with no entries at all
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Register (or replace) the converter for `T`
    pub fn register<T, F>(&mut self, render: F)
    where
        T: Any,
        F: Fn(&T) -> String + 'static,
    {
        let converter: Converter =
            Box::new(move |value: &ObjectRef| value.downcast_ref::<T>().map(&render));
        self.converters.insert(TypeId::of::<T>(), Some(converter));
    }

    pub fn with<T, F>(mut self, render: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> String + 'static,
    {
        self.register(render);
        self
    }

    /// Treat `T` as primitive without a way to render it
    pub fn mark_primitive<T: Any>(&mut self) {
        self.converters.insert(TypeId::of::<T>(), None);
    }

    pub fn is_primitive_type(&self, type_id: TypeId) -> bool {
        self.converters.contains_key(&type_id)
    }
}

impl Default for DefaultPrimitives {
    fn default() -> Self {
        let mut table = Self::empty();
        table.register::<(), _>(|_| "none".to_string());
        table.register::<bool, _>(|b| b.to_string());

        macro_rules! integers {
            ($($t:ty),*) => {
                $(table.register::<$t, _>(|n| n.to_string());)*
            };
        }
        integers!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

        table.register::<f64, _>(|f| render_float(f.to_string(), f.is_nan()));
        table.register::<f32, _>(|f| render_float(f.to_string(), f.is_nan()));
        table.register::<String, _>(|s| strip_control(s));
        table.register::<&'static str, _>(|s| strip_control(s));
        table.register::<char, _>(|c| strip_control(&c.to_string()));
        table
    }
}

impl PrimitiveAdapter for DefaultPrimitives {
    fn classify(&self, value: &ObjectRef) -> Result<Option<String>> {
        match self.converters.get(&value.value_type_id()) {
            None => Ok(None),
            Some(Some(convert)) => convert(value).map(Some).ok_or_else(|| unsupported(value)),
            Some(None) => Err(unsupported(value)),
        }
    }
}

fn unsupported(value: &ObjectRef) -> HiccupError {
    HiccupError::UnsupportedValue {
        type_name: value.rust_type_name().to_string(),
    }
}

/// Keep a fractional part on finite floats (`1` becomes `1.0`); NaN and
/// the infinities render as `nan`, `inf` and `-inf`
fn render_float(mut text: String, nan: bool) -> String {
    if nan {
        return "nan".to_string();
    }
    if !text.contains(['.', 'e', 'E', 'i']) {
        text.push_str(".0");
    }
    text
}

/// Remove every Unicode control character (C0 and C1)
pub fn strip_control(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}

// ===== Sequences =====

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSequences;

impl SequenceAdapter for DefaultSequences {
    fn classify(&self, value: &ObjectRef) -> Option<Vec<ObjectRef>> {
        if let Some(items) = value.downcast_ref::<Vec<ObjectRef>>() {
            return Some(items.clone());
        }
        if let Some(items) = value.downcast_ref::<VecDeque<ObjectRef>>() {
            return Some(items.iter().cloned().collect());
        }
        if let Some(tuple) = value.downcast_ref::<Tuple>() {
            return Some(tuple.0.clone());
        }
        // Set members are plain values, so every projection sees fresh objects
        if let Some(set) = value.downcast_ref::<BTreeSet<String>>() {
            return Some(set.iter().cloned().map(ObjectRef::new).collect());
        }
        if let Some(set) = value.downcast_ref::<HashSet<String>>() {
            return Some(set.iter().cloned().map(ObjectRef::new).collect());
        }
        if let Some(set) = value.downcast_ref::<BTreeSet<i64>>() {
            return Some(set.iter().copied().map(ObjectRef::new).collect());
        }
        if let Some(set) = value.downcast_ref::<HashSet<i64>>() {
            return Some(set.iter().copied().map(ObjectRef::new).collect());
        }
        None
    }
}

// ===== Mappings =====

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMappings;

impl MappingAdapter for DefaultMappings {
    fn classify(&self, value: &ObjectRef) -> Option<Vec<(ObjectRef, ObjectRef)>> {
        if let Some(mapping) = value.downcast_ref::<Mapping>() {
            return Some(mapping.0.clone());
        }
        if let Some(map) = value.downcast_ref::<BTreeMap<String, ObjectRef>>() {
            return Some(string_keyed(map.iter()));
        }
        if let Some(map) = value.downcast_ref::<HashMap<String, ObjectRef>>() {
            return Some(string_keyed(map.iter()));
        }
        None
    }
}

fn string_keyed<'a>(
    entries: impl Iterator<Item = (&'a String, &'a ObjectRef)>,
) -> Vec<(ObjectRef, ObjectRef)> {
    entries
        .map(|(k, v)| (ObjectRef::new(k.clone()), v.clone()))
        .collect()
}

// ===== Type names =====

/// Record type name for records, short Rust type name otherwise
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTypeNamer;

impl TypeNamer for DefaultTypeNamer {
    fn type_name(&self, value: &ObjectRef) -> String {
        value.display_type_name()
    }
}

// ===== Adapter set =====

/// The four classifiers used by the tree builder, plus a per-type name
/// override table consulted before the type namer
pub struct Adapters {
    pub primitives: Box<dyn PrimitiveAdapter>,
    pub sequences: Box<dyn SequenceAdapter>,
    pub mappings: Box<dyn MappingAdapter>,
    pub namer: Box<dyn TypeNamer>,
    type_overrides: HashMap<TypeId, String>,
}

impl Adapters {
    pub fn with_primitives(mut self, adapter: impl PrimitiveAdapter + 'static) -> Self {
        self.primitives = Box::new(adapter);
        self
    }

    pub fn with_sequences(mut self, adapter: impl SequenceAdapter + 'static) -> Self {
        self.sequences = Box::new(adapter);
        self
    }

    pub fn with_mappings(mut self, adapter: impl MappingAdapter + 'static) -> Self {
        self.mappings = Box::new(adapter);
        self
    }

    pub fn with_namer(mut self, namer: impl TypeNamer + 'static) -> Self {
        self.namer = Box::new(namer);
        self
    }

    /// Tag every value of type `T` with `name`
    pub fn set_type_name<T: Any>(&mut self, name: impl Into<String>) {
        self.type_overrides.insert(TypeId::of::<T>(), name.into());
    }

    /// Tag for a non-primitive, non-sequence value
    ///
    /// Names that are not legal tags (`my record`, `(i64, i64)`) are
    /// sanitised, so every node of a projected tree has a legal tag.
    pub fn type_name(&self, value: &ObjectRef) -> String {
        let name = match self.type_overrides.get(&value.value_type_id()) {
            Some(name) => name.clone(),
            None => self.namer.type_name(value),
        };
        if is_valid_tag(&name) {
            name
        } else {
            sanitize_tag(&name)
        }
    }
}

impl Default for Adapters {
    fn default() -> Self {
        Self {
            primitives: Box::new(DefaultPrimitives::default()),
            sequences: Box::new(DefaultSequences),
            mappings: Box::new(DefaultMappings),
            namer: Box::new(DefaultTypeNamer),
            type_overrides: HashMap::new(),
        }
    }
}
