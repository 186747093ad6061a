//! A built tree together with the registry that resolves its tokens

use hiccup_xpath::{Node, QueryEngine};

use crate::errors::{HiccupError, Result};
use crate::object::ObjectRef;
use crate::registry::IdentityRegistry;

/// Result of projecting one root object
///
/// Holds the tree and a strong handle to every object it was built from.
/// The tree is `None` when the root itself was excluded; such a projection
/// matches nothing.
#[derive(Debug)]
pub struct Projection {
    tree: Option<Node>,
    registry: IdentityRegistry,
    identity_attr: String,
}

impl Projection {
    pub fn new(
        tree: Option<Node>,
        registry: IdentityRegistry,
        identity_attr: impl Into<String>,
    ) -> Self {
        Self {
            tree,
            registry,
            identity_attr: identity_attr.into(),
        }
    }

    pub fn tree(&self) -> Option<&Node> {
        self.tree.as_ref()
    }

    pub fn tree_mut(&mut self) -> Option<&mut Node> {
        self.tree.as_mut()
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    pub fn identity_attr(&self) -> &str {
        &self.identity_attr
    }

    /// Original object a node was projected from
    ///
    /// # Errors
    ///
    /// Returns `UnknownIdentity` if the node has no token or the token was
    /// not issued by this projection.
    pub fn resolve(&self, node: &Node) -> Result<ObjectRef> {
        let token = node.attribute(&self.identity_attr);
        token
            .and_then(|t| self.registry.resolve_str(t))
            .cloned()
            .ok_or_else(|| HiccupError::UnknownIdentity {
                tag: node.tag().to_string(),
                token: token.map(str::to_string),
            })
    }

    /// Run `query` with `engine` and resolve every match, in engine order
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` when the engine rejects the query and
    /// `UnknownIdentity` when a match cannot be resolved.
    pub fn select(&self, engine: &dyn QueryEngine, query: &str) -> Result<Vec<ObjectRef>> {
        let Some(tree) = &self.tree else {
            return Ok(Vec::new());
        };
        let nodes = engine
            .select(tree, query)
            .map_err(|source| HiccupError::InvalidQuery {
                query: query.to_string(),
                source,
            })?;
        nodes.into_iter().map(|n| self.resolve(n)).collect()
    }
}
