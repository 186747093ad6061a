//! Member enumeration for record-like values
//!
//! Rust has no runtime reflection, so the default enumerator knows two
//! sources of members: dynamic [`Record`]s and Rust types registered with
//! [`RegisteredMembers::register`]. Anything else has no members and projects
//! as an empty node tagged with its type name.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::context::Context;
use crate::exclusion::ExclusionRules;
use crate::object::{Member, ObjectRef, Record};

/// A member whose value could not be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessFailure {
    pub member: String,
    pub message: String,
}

/// Lists the named members of a record-like value
pub trait MemberEnumerator {
    /// Enumerate the members of `object`, the value of the current frame of
    /// `ctx`
    ///
    /// Members excluded by `rules` are left out. Exclusion by name, parent or
    /// depth is decided before the member is read, so an excluded property
    /// is never evaluated; rules over the value are checked with the member's
    /// frame pushed onto `ctx`. A member that cannot be read is returned as
    /// an `AccessFailure` in its place. `ctx` must be left as it was found.
    fn enumerate(
        &self,
        object: &ObjectRef,
        ctx: &mut Context,
        rules: &ExclusionRules,
    ) -> Vec<Result<(String, ObjectRef), AccessFailure>>;
}

type MemberFn = Box<dyn Fn(&ObjectRef) -> Vec<(String, Member)>>;

/// Enumerator backed by a per-type registry of member functions
///
/// ```
/// use hiccup_core::{Member, ObjectRef, RegisteredMembers};
///
/// struct Point { x: ObjectRef, y: ObjectRef }
///
/// let members = RegisteredMembers::new().with::<Point, _>(|p| {
///     vec![
///         ("x".to_string(), Member::Value(p.x.clone())),
///         ("y".to_string(), Member::Value(p.y.clone())),
///     ]
/// });
/// assert!(members.is_registered::<Point>());
/// ```
#[derive(Default)]
pub struct RegisteredMembers {
    by_type: HashMap<TypeId, MemberFn>,
}

impl RegisteredMembers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the member function for `T`
    pub fn register<T, F>(&mut self, members: F)
    where
        T: Any,
        F: Fn(&T) -> Vec<(String, Member)> + 'static,
    {
        let f: MemberFn = Box::new(move |object: &ObjectRef| {
            object.downcast_ref::<T>().map(&members).unwrap_or_default()
        });
        self.by_type.insert(TypeId::of::<T>(), f);
    }

    pub fn with<T, F>(mut self, members: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> Vec<(String, Member)> + 'static,
    {
        self.register(members);
        self
    }

    pub fn is_registered<T: Any>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<T>())
    }

    fn members_of(&self, object: &ObjectRef) -> Vec<(String, Member)> {
        if let Some(record) = object.downcast_ref::<Record>() {
            return record.members().to_vec();
        }
        match self.by_type.get(&object.value_type_id()) {
            Some(f) => f(object),
            None => Vec::new(),
        }
    }
}

impl MemberEnumerator for RegisteredMembers {
    fn enumerate(
        &self,
        object: &ObjectRef,
        ctx: &mut Context,
        rules: &ExclusionRules,
    ) -> Vec<Result<(String, ObjectRef), AccessFailure>> {
        let mut out = Vec::new();
        for (name, member) in self.members_of(object) {
            if rules.excludes_member(ctx, &name) {
                continue;
            }
            let value = match member.resolve() {
                Ok(value) => value,
                Err(message) => {
                    out.push(Err(AccessFailure {
                        member: name,
                        message,
                    }));
                    continue;
                }
            };
            ctx.push(Some(name.clone()), value.clone());
            let skip = rules.is_excluded(ctx);
            ctx.pop();
            if !skip {
                out.push(Ok((name, value)));
            }
        }
        out
    }
}
