//! Labeled tree element
//!
//! A `Node` is the unit of a projected tree. It carries a tag, an ordered
//! attribute list, optional text content and ordered children. Nothing stops
//! a node from having both text and children; producers decide which to set.

use std::fmt;
use thiserror::Error;

/// Raised when a string cannot be used as a tag name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid tag name: {tag:?}")]
pub struct InvalidTag {
    pub tag: String,
}

/// Check whether `name` is a legal tag identifier
///
/// Tags follow the XML NCName shape: a letter or `_` first, then letters,
/// digits, `_`, `-`, `.` or `·`. Letters and digits are Unicode, so `café`
/// is a tag. The query lexer recognises exactly this shape as a name, so
/// every legal tag is addressable from a query.
pub fn is_valid_tag(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if is_name_start(c) => {}
        _ => return false,
    }
    chars.all(is_name_char)
}

fn is_name_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_numeric() || matches!(c, '-' | '.' | '\u{B7}')
}

/// Turn an arbitrary name into a legal tag
///
/// Illegal characters become `_`, and a name that cannot start a tag gets a
/// leading `_`. Legal names come back unchanged; the empty name becomes `_`.
pub fn sanitize_tag(name: &str) -> String {
    let mut tag: String = name
        .chars()
        .map(|c| if is_name_char(c) { c } else { '_' })
        .collect();
    if !tag.chars().next().is_some_and(is_name_start) {
        tag.insert(0, '_');
    }
    tag
}

/// One element of a labeled tree
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    tag: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<Node>,
}

impl Node {
    /// Create a node with the given tag and nothing else
    ///
    /// The tag is taken as-is; use [`Node::set_tag`] when the name comes from
    /// untrusted input and must be validated.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Relabel the node
    ///
    /// # Errors
    ///
    /// Returns `InvalidTag` (and leaves the node untouched) if `tag` is not a
    /// legal tag identifier.
    pub fn set_tag(&mut self, tag: &str) -> Result<(), InvalidTag> {
        if !is_valid_tag(tag) {
            return Err(InvalidTag {
                tag: tag.to_string(),
            });
        }
        self.tag = tag.to_string();
        Ok(())
    }

    /// Get an attribute value by name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing any previous value under the same name
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Remove an attribute, returning its previous value
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let idx = self.attributes.iter().position(|(k, _)| k == name)?;
        Some(self.attributes.remove(idx).1)
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    pub fn push_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Concatenated text of this node and all its descendants, in document order
    pub fn string_value(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// Number of nodes in this subtree, including `self`
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Node::subtree_len).sum::<usize>()
    }

    /// Visit every node of the subtree in document order, mutably
    pub fn walk_mut<F: FnMut(&mut Node)>(&mut self, f: &mut F) {
        f(self);
        for child in &mut self.children {
            child.walk_mut(f);
        }
    }

    fn write_xml(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        write!(f, "{}<{}", indent, self.tag)?;
        for (k, v) in &self.attributes {
            write!(f, " {}=\"{}\"", k, escape(v, true))?;
        }
        match (&self.text, self.children.is_empty()) {
            (None, true) => writeln!(f, "/>"),
            (Some(text), true) => writeln!(f, ">{}</{}>", escape(text, false), self.tag),
            (text, false) => {
                writeln!(f, ">")?;
                if let Some(text) = text {
                    writeln!(f, "{}  {}", indent, escape(text, false))?;
                }
                for child in &self.children {
                    child.write_xml(f, depth + 1)?;
                }
                writeln!(f, "{}</{}>", indent, self.tag)
            }
        }
    }
}

/// Renders the subtree as indented XML (debugging aid, not a stable format)
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_xml(f, 0)
    }
}

fn escape(s: &str, attr: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attr => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_tags() {
        assert!(is_valid_tag("name"));
        assert!(is_valid_tag("_private"));
        assert!(is_valid_tag("a-b.c_1"));
        assert!(!is_valid_tag(""));
        assert!(!is_valid_tag("1abc"));
        assert!(!is_valid_tag("has space"));
        assert!(!is_valid_tag("Vec<T>"));
        assert!(!is_valid_tag("-x"));
    }

    #[test]
    fn test_unicode_letters_are_name_characters() {
        assert!(is_valid_tag("café"));
        assert!(is_valid_tag("naïve"));
        assert!(is_valid_tag("Ωmega_2"));
        assert!(is_valid_tag("a·b"));
        assert!(!is_valid_tag("·a"));
        assert!(!is_valid_tag("٣x"));
    }

    #[test]
    fn test_sanitize_tag() {
        assert_eq!(sanitize_tag("my record"), "my_record");
        assert_eq!(sanitize_tag("(i64, i64)"), "_i64__i64_");
        assert_eq!(sanitize_tag("1st"), "_1st");
        assert_eq!(sanitize_tag(""), "_");
        assert_eq!(sanitize_tag("café"), "café");
        assert!(is_valid_tag(&sanitize_tag("[u8; 4]")));
    }

    #[test]
    fn test_set_tag_rejects_invalid_and_keeps_old() {
        let mut node = Node::new("listish");
        let err = node.set_tag("0").unwrap_err();
        assert_eq!(err.tag, "0");
        assert_eq!(node.tag(), "listish");

        node.set_tag("tags").unwrap();
        assert_eq!(node.tag(), "tags");
    }

    #[test]
    fn test_attributes_replace_in_place() {
        let mut node = Node::new("n");
        node.set_attribute("a", "1");
        node.set_attribute("b", "2");
        node.set_attribute("a", "3");

        assert_eq!(node.attribute("a"), Some("3"));
        assert_eq!(node.attributes().len(), 2);
        assert_eq!(node.remove_attribute("a"), Some("3".to_string()));
        assert_eq!(node.attribute("a"), None);
    }

    #[test]
    fn test_string_value_concatenates_descendants() {
        let mut root = Node::new("r");
        let mut a = Node::new("a");
        a.set_text("x");
        let mut b = Node::new("b");
        b.set_text("y");
        root.push_child(a);
        root.push_child(b);

        assert_eq!(root.string_value(), "xy");
        assert_eq!(root.subtree_len(), 3);
    }

    #[test]
    fn test_display_escapes() {
        let mut node = Node::new("p");
        node.set_attribute("q", "\"<\"");
        node.set_text("a & b");
        let xml = node.to_string();
        assert_eq!(xml, "<p q=\"&quot;&lt;&quot;\">a &amp; b</p>\n");
    }
}
