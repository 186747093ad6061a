//! Identity registry: token to original object
//!
//! Every projected node carries a token naming its source object. The
//! registry owns a strong handle to each registered object, so transient
//! values produced by properties stay alive (and resolvable) for as long as
//! the registry does.

use std::collections::HashMap;

use crate::object::ObjectRef;

#[derive(Debug, Default)]
pub struct IdentityRegistry {
    objects: Vec<ObjectRef>,
    by_addr: HashMap<usize, usize>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `object` and return its token
    ///
    /// Registering the same object twice returns the same token. Addresses
    /// cannot be reused while the registry holds the object.
    pub fn register(&mut self, object: ObjectRef) -> usize {
        if let Some(token) = self.by_addr.get(&object.addr()) {
            return *token;
        }
        let token = self.objects.len();
        self.by_addr.insert(object.addr(), token);
        self.objects.push(object);
        token
    }

    pub fn resolve(&self, token: usize) -> Option<&ObjectRef> {
        self.objects.get(token)
    }

    /// Resolve a token in its attribute form
    pub fn resolve_str(&self, token: &str) -> Option<&ObjectRef> {
        token.parse::<usize>().ok().and_then(|t| self.resolve(t))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Release every held object
    pub fn clear(&mut self) {
        self.objects.clear();
        self.by_addr.clear();
    }
}
