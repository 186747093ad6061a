//! Post-processing hook trait and implementations
//!
//! A `TreeHook` runs on the freshly built tree before the query is evaluated.
//! It may add attributes, relabel nodes or restructure children. Identity
//! attributes must survive untouched on any node a query can match, or
//! resolution fails with `UnknownIdentity`.

use hiccup_xpath::Node;
use thiserror::Error;

/// Failure reported by a hook; surfaced as `HiccupError::HookFailed`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HookError {
    pub message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Rewrites a projected tree in place
///
/// Closures of the right shape are hooks:
///
/// ```
/// use hiccup_core::{HookError, TreeHook};
/// use hiccup_xpath::Node;
///
/// let mark = |tree: &mut Node| -> Result<(), HookError> {
///     tree.set_attribute("seen", "yes");
///     Ok(())
/// };
///
/// let mut tree = Node::new("Record");
/// mark.rewrite(&mut tree).unwrap();
/// assert_eq!(tree.attribute("seen"), Some("yes"));
/// ```
pub trait TreeHook {
    /// # Errors
    ///
    /// Returns `HookError` when the tree cannot be rewritten.
    fn rewrite(&self, tree: &mut Node) -> Result<(), HookError>;
}

impl<F> TreeHook for F
where
    F: Fn(&mut Node) -> Result<(), HookError>,
{
    fn rewrite(&self, tree: &mut Node) -> Result<(), HookError> {
        self(tree)
    }
}

/// Hook that leaves the tree unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

impl TreeHook for NoopHook {
    fn rewrite(&self, _tree: &mut Node) -> Result<(), HookError> {
        Ok(())
    }
}

/// Runs several hooks in order, stopping at the first failure
#[derive(Default)]
pub struct HookChain {
    hooks: Vec<Box<dyn TreeHook>>,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, hook: impl TreeHook + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl TreeHook for HookChain {
    fn rewrite(&self, tree: &mut Node) -> Result<(), HookError> {
        self.hooks.iter().try_for_each(|h| h.rewrite(tree))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_hook() {
        let mut tree = Node::new("r");
        NoopHook.rewrite(&mut tree).unwrap();
        assert_eq!(tree, Node::new("r"));
    }

    #[test]
    fn test_chain_runs_in_order_and_stops_on_failure() {
        let chain = HookChain::new()
            .then(|t: &mut Node| -> Result<(), HookError> {
                t.set_attribute("step", "1");
                Ok(())
            })
            .then(|_: &mut Node| -> Result<(), HookError> { Err(HookError::new("second failed")) })
            .then(|t: &mut Node| -> Result<(), HookError> {
                t.set_attribute("step", "3");
                Ok(())
            });

        let mut tree = Node::new("r");
        let err = chain.rewrite(&mut tree).unwrap_err();

        assert_eq!(err.to_string(), "second failed");
        assert_eq!(tree.attribute("step"), Some("1"));
        assert_eq!(chain.len(), 3);
    }
}
