//! Exclusion rules
//!
//! A [`Rule`] is a conjunction of [`Predicate`]s evaluated against the
//! traversal [`Context`]; a value is excluded when any rule matches. The
//! default set hides dunder-prefixed names and callables, mirroring what a
//! reflective walk of an object would skip.
//!
//! ```
//! use hiccup_core::{ExclusionRules, Predicate, Rule};
//!
//! let mut rules = ExclusionRules::default();
//! rules.add(Rule::new(vec![
//!     Predicate::parent_type_named("User"),
//!     Predicate::name_equals("password"),
//! ]));
//! assert_eq!(rules.len(), 3);
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

use regex::Regex;

use crate::context::Context;
use crate::errors::{HiccupError, Result};
use crate::object::{Callable, ObjectRef};

/// A single condition over the current frame
#[derive(Clone)]
pub enum Predicate {
    /// Value has exactly this Rust type
    TypeOf(TypeId),
    /// Value's display type name (record name or short Rust name) equals
    TypeNamed(String),
    ParentTypeOf(TypeId),
    ParentTypeNamed(String),
    NameEquals(String),
    NameStartsWith(String),
    NameMatches(Regex),
    IsCallable,
    /// Frame is at least this many descents below the root
    DepthAtLeast(usize),
    ValueSatisfies(Rc<dyn Fn(&ObjectRef) -> bool>),
}

impl Predicate {
    pub fn type_of<T: Any>() -> Self {
        Predicate::TypeOf(TypeId::of::<T>())
    }

    pub fn type_named(name: impl Into<String>) -> Self {
        Predicate::TypeNamed(name.into())
    }

    pub fn parent_type_of<T: Any>() -> Self {
        Predicate::ParentTypeOf(TypeId::of::<T>())
    }

    pub fn parent_type_named(name: impl Into<String>) -> Self {
        Predicate::ParentTypeNamed(name.into())
    }

    pub fn name_equals(name: impl Into<String>) -> Self {
        Predicate::NameEquals(name.into())
    }

    pub fn name_starts_with(prefix: impl Into<String>) -> Self {
        Predicate::NameStartsWith(prefix.into())
    }

    /// # Errors
    ///
    /// Returns `InvalidPattern` if `pattern` is not a valid regular expression.
    pub fn name_matches(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(Predicate::NameMatches)
            .map_err(|e| HiccupError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })
    }

    pub fn is_callable() -> Self {
        Predicate::IsCallable
    }

    pub fn depth_at_least(depth: usize) -> Self {
        Predicate::DepthAtLeast(depth)
    }

    pub fn value_satisfies<F>(f: F) -> Self
    where
        F: Fn(&ObjectRef) -> bool + 'static,
    {
        Predicate::ValueSatisfies(Rc::new(f))
    }

    /// Evaluate against the current frame; false when there is none
    pub fn matches(&self, ctx: &Context) -> bool {
        let Some(object) = ctx.object() else {
            return false;
        };
        match self {
            Predicate::TypeOf(id) => object.value_type_id() == *id,
            Predicate::TypeNamed(name) => object.display_type_name() == *name,
            Predicate::ParentTypeOf(id) => ctx
                .parent()
                .is_some_and(|p| p.object.value_type_id() == *id),
            Predicate::ParentTypeNamed(name) => ctx
                .parent()
                .is_some_and(|p| p.object.display_type_name() == *name),
            Predicate::NameEquals(name) => ctx.name() == Some(name.as_str()),
            Predicate::NameStartsWith(prefix) => {
                ctx.name().is_some_and(|n| n.starts_with(prefix.as_str()))
            }
            Predicate::NameMatches(re) => ctx.name().is_some_and(|n| re.is_match(n)),
            Predicate::IsCallable => object.is::<Callable>(),
            Predicate::DepthAtLeast(depth) => ctx.depth() >= *depth,
            Predicate::ValueSatisfies(f) => f(object),
        }
    }

    /// Evaluate for member `name` of the current frame's object, before the
    /// member is read
    ///
    /// `None` when the predicate depends on the member's value.
    pub fn matches_member(&self, ctx: &Context, name: &str) -> Option<bool> {
        let parent = ctx.object();
        let matched = match self {
            Predicate::ParentTypeOf(id) => parent.is_some_and(|p| p.value_type_id() == *id),
            Predicate::ParentTypeNamed(n) => parent.is_some_and(|p| p.display_type_name() == *n),
            Predicate::NameEquals(n) => name == n.as_str(),
            Predicate::NameStartsWith(prefix) => name.starts_with(prefix.as_str()),
            Predicate::NameMatches(re) => re.is_match(name),
            Predicate::DepthAtLeast(depth) => ctx.depth() + 1 >= *depth,
            Predicate::TypeOf(_)
            | Predicate::TypeNamed(_)
            | Predicate::IsCallable
            | Predicate::ValueSatisfies(_) => return None,
        };
        Some(matched)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::TypeOf(id) => write!(f, "TypeOf({:?})", id),
            Predicate::TypeNamed(n) => write!(f, "TypeNamed({:?})", n),
            Predicate::ParentTypeOf(id) => write!(f, "ParentTypeOf({:?})", id),
            Predicate::ParentTypeNamed(n) => write!(f, "ParentTypeNamed({:?})", n),
            Predicate::NameEquals(n) => write!(f, "NameEquals({:?})", n),
            Predicate::NameStartsWith(p) => write!(f, "NameStartsWith({:?})", p),
            Predicate::NameMatches(re) => write!(f, "NameMatches({:?})", re.as_str()),
            Predicate::IsCallable => write!(f, "IsCallable"),
            Predicate::DepthAtLeast(d) => write!(f, "DepthAtLeast({})", d),
            Predicate::ValueSatisfies(_) => write!(f, "ValueSatisfies(..)"),
        }
    }
}

/// Conjunction of predicates. An empty rule never matches.
#[derive(Debug, Clone, Default)]
pub struct Rule {
    predicates: Vec<Predicate>,
}

impl Rule {
    pub fn new(predicates: Vec<Predicate>) -> Self {
        Self { predicates }
    }

    pub fn single(predicate: Predicate) -> Self {
        Self::new(vec![predicate])
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn matches(&self, ctx: &Context) -> bool {
        !self.predicates.is_empty() && self.predicates.iter().all(|p| p.matches(ctx))
    }

    /// Whether the rule excludes member `name` of the current frame without
    /// looking at its value; false for rules with a value predicate
    pub fn excludes_member(&self, ctx: &Context, name: &str) -> bool {
        !self.predicates.is_empty()
            && self
                .predicates
                .iter()
                .all(|p| p.matches_member(ctx, name) == Some(true))
    }
}

/// Ordered set of exclusion rules
#[derive(Debug, Clone)]
pub struct ExclusionRules {
    rules: Vec<Rule>,
}

impl ExclusionRules {
    /// No rules: nothing is excluded
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn add(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Skip member `attr` on values of type `T`
    pub fn ignore<T: Any>(&mut self, attr: impl Into<String>) {
        self.add(Rule::new(vec![
            Predicate::parent_type_of::<T>(),
            Predicate::name_equals(attr),
        ]));
    }

    /// Skip member `attr` on values whose type name is `type_name`
    pub fn ignore_named(&mut self, type_name: impl Into<String>, attr: impl Into<String>) {
        self.add(Rule::new(vec![
            Predicate::parent_type_named(type_name),
            Predicate::name_equals(attr),
        ]));
    }

    pub fn is_excluded(&self, ctx: &Context) -> bool {
        self.rules.iter().any(|r| r.matches(ctx))
    }

    /// Whether member `name` of the current frame is excluded by name,
    /// parent or depth alone, so it need not be read at all
    ///
    /// A `false` answer is not final: rules over the value are checked once
    /// the member has been read.
    pub fn excludes_member(&self, ctx: &Context, name: &str) -> bool {
        self.rules.iter().any(|r| r.excludes_member(ctx, name))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Dunder names and callables
impl Default for ExclusionRules {
    fn default() -> Self {
        Self {
            rules: vec![
                Rule::single(Predicate::name_starts_with("__")),
                Rule::single(Predicate::is_callable()),
            ],
        }
    }
}
