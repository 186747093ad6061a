//! Compiled queries and the query-engine seam

use crate::ast::Expr;
use crate::error::XPathError;
use crate::eval::Document;
use crate::node::Node;
use crate::parser::parse;

/// A compiled query
#[derive(Debug, Clone)]
pub struct XPath {
    source: String,
    expr: Expr,
}

impl XPath {
    /// Compile a query string
    ///
    /// # Errors
    ///
    /// Returns `XPathError::Lex` or `XPathError::Syntax` for malformed queries.
    pub fn compile(source: &str) -> Result<Self, XPathError> {
        Ok(Self {
            source: source.to_string(),
            expr: parse(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Run the query against `tree` and return the selected nodes in
    /// document order, without duplicates
    ///
    /// Relative paths are evaluated with `tree` as the context node; absolute
    /// paths start from a document node whose only child is `tree`. A selected
    /// text node is reported as the element that carries it.
    ///
    /// # Errors
    ///
    /// Returns `XPathError::NotANodeSet` when the query yields a string,
    /// number, boolean or attribute, and function errors for bad calls.
    pub fn select<'t>(&self, tree: &'t Node) -> Result<Vec<&'t Node>, XPathError> {
        Document::new(tree).select(&self.expr)
    }
}

/// Runs a query string against a tree
///
/// This is the seam between projection and querying: anything that can map
/// a tree plus a query to a list of the tree's own nodes can stand in for
/// the default engine.
pub trait QueryEngine {
    /// Select the nodes of `tree` matched by `query`, in the engine's order
    ///
    /// # Errors
    ///
    /// Returns an `XPathError` when the query cannot be compiled or evaluated.
    fn select<'t>(&self, tree: &'t Node, query: &str) -> Result<Vec<&'t Node>, XPathError>;
}

/// Default engine: compiles and evaluates the XPath subset of this crate
#[derive(Debug, Clone, Copy, Default)]
pub struct XPathEngine;

impl QueryEngine for XPathEngine {
    fn select<'t>(&self, tree: &'t Node, query: &str) -> Result<Vec<&'t Node>, XPathError> {
        XPath::compile(query)?.select(tree)
    }
}
