//! Hiccup XPath - labeled tree and path-query engine
//!
//! This crate provides the tree side of a Hiccup projection:
//! - `Node`: the labeled tree element (tag, attributes, text, children)
//! - `XPath`: a compiled query over that tree (XPath 1.0 subset)
//! - `QueryEngine`: the seam through which `hiccup-core` runs queries
//!
//! # Example
//!
//! ```
//! use hiccup_xpath::{Node, XPath};
//!
//! let mut root = Node::new("Record");
//! let mut name = Node::new("name");
//! name.set_text("a");
//! root.push_child(name);
//!
//! let hits = XPath::compile("//name[text()='a']").unwrap().select(&root).unwrap();
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].text(), Some("a"));
//! ```

pub mod ast;
mod engine;
mod error;
mod eval;
mod node;
mod parser;
mod token;

pub use engine::{QueryEngine, XPath, XPathEngine};
pub use error::XPathError;
pub use node::{is_valid_tag, sanitize_tag, InvalidTag, Node};
pub use parser::{parse, Parser};
pub use token::{tokenize, Span, Token, TokenKind};
