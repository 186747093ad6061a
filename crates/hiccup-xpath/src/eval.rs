//! Query evaluation over a `Node` tree
//!
//! The tree is flattened into a preorder arena before evaluation so that
//! parent, sibling and document-order lookups are index arithmetic. Entry 0
//! is the virtual document node whose only child is the tree root; absolute
//! paths start there, relative paths start at the tree root.

use crate::ast::{Axis, CompareOp, Expr, LocationPath, NodeTest, Step};
use crate::error::XPathError;
use crate::node::Node;

struct Entry<'t> {
    node: &'t Node,
    parent: Option<usize>,
    children: Vec<usize>,
    /// One past the last descendant index
    end: usize,
    document: bool,
}

pub(crate) struct Document<'t> {
    entries: Vec<Entry<'t>>,
}

/// A member of a node-set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Item {
    Element(usize),
    Text(usize),
    Attribute(usize, usize),
}

impl Item {
    fn owner(&self) -> usize {
        match *self {
            Item::Element(i) | Item::Text(i) | Item::Attribute(i, _) => i,
        }
    }

    /// Document order: element, then its attributes, then its text, then children
    fn order_key(&self) -> (usize, usize) {
        match *self {
            Item::Element(i) => (i, 0),
            Item::Attribute(i, a) => (i, a + 1),
            Item::Text(i) => (i, usize::MAX),
        }
    }
}

#[derive(Debug, Clone)]
enum Value {
    Nodes(Vec<Item>),
    Str(String),
    Num(f64),
    Bool(bool),
}

#[derive(Clone, Copy)]
struct Ctx {
    item: Item,
    position: usize,
    size: usize,
}

fn sort_dedup(items: &mut Vec<Item>) {
    items.sort_by_key(Item::order_key);
    items.dedup();
}

impl<'t> Document<'t> {
    pub(crate) fn new(root: &'t Node) -> Self {
        let mut entries = vec![Entry {
            node: root,
            parent: None,
            children: vec![1],
            end: 0,
            document: true,
        }];
        Self::flatten(root, 0, &mut entries);
        entries[0].end = entries.len();
        Self { entries }
    }

    fn flatten(node: &'t Node, parent: usize, entries: &mut Vec<Entry<'t>>) -> usize {
        let idx = entries.len();
        entries.push(Entry {
            node,
            parent: Some(parent),
            children: Vec::with_capacity(node.children().len()),
            end: 0,
            document: false,
        });
        for child in node.children() {
            let child_idx = Self::flatten(child, idx, entries);
            entries[idx].children.push(child_idx);
        }
        entries[idx].end = entries.len();
        idx
    }

    /// Evaluate `expr` with the tree root as context and return the selected
    /// tree nodes in document order
    pub(crate) fn select(&self, expr: &Expr) -> Result<Vec<&'t Node>, XPathError> {
        let ctx = Ctx {
            item: Item::Element(1),
            position: 1,
            size: 1,
        };
        let items = match self.eval(expr, ctx)? {
            Value::Nodes(items) => items,
            other => {
                return Err(XPathError::NotANodeSet(format!(
                    "query evaluates to {}",
                    describe(&other)
                )))
            }
        };

        let mut owners = Vec::with_capacity(items.len());
        for item in items {
            let owner = match item {
                Item::Attribute(i, a) => {
                    return Err(XPathError::NotANodeSet(format!(
                        "query selects attribute @{}",
                        self.entries[i].node.attributes()[a].0
                    )))
                }
                // text belongs to the element that carries it; the document
                // node stands for the tree root
                other => other.owner().max(1),
            };
            owners.push(owner);
        }
        owners.dedup();
        Ok(owners.into_iter().map(|i| self.entries[i].node).collect())
    }

    // ===== Node-set navigation =====

    fn has_text(&self, i: usize) -> bool {
        !self.entries[i].document && self.entries[i].node.text().is_some()
    }

    fn axis_items(&self, item: Item, axis: Axis) -> Vec<Item> {
        let i = match item {
            Item::Element(i) => i,
            Item::Text(i) | Item::Attribute(i, _) => {
                return match axis {
                    Axis::SelfAxis => vec![item],
                    Axis::Parent => vec![Item::Element(i)],
                    Axis::Ancestor | Axis::AncestorOrSelf => {
                        let mut out = Vec::new();
                        if axis == Axis::AncestorOrSelf {
                            out.push(item);
                        }
                        out.push(Item::Element(i));
                        out.extend(self.ancestors(i));
                        out
                    }
                    _ => Vec::new(),
                };
            }
        };

        match axis {
            Axis::Child => {
                let mut out = Vec::new();
                if self.has_text(i) {
                    out.push(Item::Text(i));
                }
                out.extend(self.entries[i].children.iter().map(|&c| Item::Element(c)));
                out
            }
            Axis::Descendant | Axis::DescendantOrSelf => {
                let mut out = Vec::new();
                if axis == Axis::DescendantOrSelf {
                    out.push(Item::Element(i));
                }
                for j in i..self.entries[i].end {
                    if j > i {
                        out.push(Item::Element(j));
                    }
                    if self.has_text(j) {
                        out.push(Item::Text(j));
                    }
                }
                out
            }
            Axis::SelfAxis => vec![Item::Element(i)],
            Axis::Parent => self.entries[i]
                .parent
                .map(Item::Element)
                .into_iter()
                .collect(),
            Axis::Ancestor => self.ancestors(i),
            Axis::AncestorOrSelf => {
                let mut out = vec![Item::Element(i)];
                out.extend(self.ancestors(i));
                out
            }
            Axis::FollowingSibling | Axis::PrecedingSibling => {
                let Some(parent) = self.entries[i].parent else {
                    return Vec::new();
                };
                let siblings = &self.entries[parent].children;
                let at = siblings.iter().position(|&c| c == i).unwrap_or(0);
                if axis == Axis::FollowingSibling {
                    siblings[at + 1..].iter().map(|&c| Item::Element(c)).collect()
                } else {
                    let mut out: Vec<Item> =
                        siblings[..at].iter().rev().map(|&c| Item::Element(c)).collect();
                    if self.has_text(parent) {
                        out.push(Item::Text(parent));
                    }
                    out
                }
            }
            Axis::Attribute => {
                if self.entries[i].document {
                    return Vec::new();
                }
                (0..self.entries[i].node.attributes().len())
                    .map(|a| Item::Attribute(i, a))
                    .collect()
            }
        }
    }

    /// Ancestors nearest first
    fn ancestors(&self, i: usize) -> Vec<Item> {
        let mut out = Vec::new();
        let mut current = self.entries[i].parent;
        while let Some(p) = current {
            out.push(Item::Element(p));
            current = self.entries[p].parent;
        }
        out
    }

    fn matches_test(&self, item: Item, axis: Axis, test: &NodeTest) -> bool {
        match (item, test) {
            (_, NodeTest::Node) => true,
            (Item::Text(_), NodeTest::Text) => true,
            (Item::Attribute(..), NodeTest::Any) => axis == Axis::Attribute,
            (Item::Attribute(i, a), NodeTest::Name(name)) => {
                axis == Axis::Attribute && self.entries[i].node.attributes()[a].0 == *name
            }
            (Item::Element(i), NodeTest::Any) => !self.entries[i].document,
            (Item::Element(i), NodeTest::Name(name)) => {
                !self.entries[i].document && self.entries[i].node.tag() == name
            }
            _ => false,
        }
    }

    fn apply_step(&self, input: &[Item], step: &Step) -> Result<Vec<Item>, XPathError> {
        let mut out = Vec::new();
        for &item in input {
            let mut candidates: Vec<Item> = self
                .axis_items(item, step.axis)
                .into_iter()
                .filter(|c| self.matches_test(*c, step.axis, &step.test))
                .collect();
            for predicate in &step.predicates {
                candidates = self.filter(candidates, predicate)?;
            }
            out.extend(candidates);
        }
        sort_dedup(&mut out);
        Ok(out)
    }

    fn apply_steps(&self, mut items: Vec<Item>, steps: &[Step]) -> Result<Vec<Item>, XPathError> {
        for step in steps {
            items = self.apply_step(&items, step)?;
        }
        Ok(items)
    }

    /// Keep the items for which `predicate` holds; `items` must be in
    /// proximity order for the axis that produced them
    fn filter(&self, items: Vec<Item>, predicate: &Expr) -> Result<Vec<Item>, XPathError> {
        let size = items.len();
        let mut kept = Vec::new();
        for (idx, item) in items.into_iter().enumerate() {
            let ctx = Ctx {
                item,
                position: idx + 1,
                size,
            };
            let keep = match self.eval(predicate, ctx)? {
                Value::Num(n) => n == ctx.position as f64,
                other => self.to_bool(&other),
            };
            if keep {
                kept.push(item);
            }
        }
        Ok(kept)
    }

    // ===== Expressions =====

    fn eval(&self, expr: &Expr, ctx: Ctx) -> Result<Value, XPathError> {
        match expr {
            Expr::Literal(s) => Ok(Value::Str(s.clone())),
            Expr::Number(n) => Ok(Value::Num(*n)),
            Expr::Path(path) => self.eval_path(path, ctx),
            Expr::Filter {
                primary,
                predicates,
                steps,
            } => {
                let mut items = self.expect_nodes(self.eval(primary, ctx)?, "filter operand")?;
                for predicate in predicates {
                    items = self.filter(items, predicate)?;
                }
                Ok(Value::Nodes(self.apply_steps(items, steps)?))
            }
            Expr::Union(lhs, rhs) => {
                let mut items = self.expect_nodes(self.eval(lhs, ctx)?, "union operand")?;
                items.extend(self.expect_nodes(self.eval(rhs, ctx)?, "union operand")?);
                sort_dedup(&mut items);
                Ok(Value::Nodes(items))
            }
            Expr::Or(lhs, rhs) => {
                if self.to_bool(&self.eval(lhs, ctx)?) {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.to_bool(&self.eval(rhs, ctx)?)))
            }
            Expr::And(lhs, rhs) => {
                if !self.to_bool(&self.eval(lhs, ctx)?) {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.to_bool(&self.eval(rhs, ctx)?)))
            }
            Expr::Negate(inner) => Ok(Value::Num(-self.to_number(&self.eval(inner, ctx)?))),
            Expr::Compare(op, lhs, rhs) => {
                let lhs = self.eval(lhs, ctx)?;
                let rhs = self.eval(rhs, ctx)?;
                Ok(Value::Bool(self.compare(*op, &lhs, &rhs)))
            }
            Expr::Function { name, args } => self.call(name, args, ctx),
        }
    }

    fn eval_path(&self, path: &LocationPath, ctx: Ctx) -> Result<Value, XPathError> {
        let start = if path.absolute {
            Item::Element(0)
        } else {
            ctx.item
        };
        Ok(Value::Nodes(self.apply_steps(vec![start], &path.steps)?))
    }

    fn expect_nodes(&self, value: Value, what: &str) -> Result<Vec<Item>, XPathError> {
        match value {
            Value::Nodes(items) => Ok(items),
            other => Err(XPathError::NotANodeSet(format!(
                "{} is {}",
                what,
                describe(&other)
            ))),
        }
    }

    // ===== Conversions =====

    fn item_string(&self, item: Item) -> String {
        match item {
            Item::Element(i) => self.entries[i].node.string_value(),
            Item::Text(i) => self.entries[i].node.text().unwrap_or_default().to_string(),
            Item::Attribute(i, a) => self.entries[i].node.attributes()[a].1.clone(),
        }
    }

    fn item_name(&self, item: Item) -> String {
        match item {
            Item::Element(i) if !self.entries[i].document => self.entries[i].node.tag().to_string(),
            Item::Attribute(i, a) => self.entries[i].node.attributes()[a].0.clone(),
            _ => String::new(),
        }
    }

    fn to_string(&self, value: &Value) -> String {
        match value {
            Value::Nodes(items) => items
                .first()
                .map(|&item| self.item_string(item))
                .unwrap_or_default(),
            Value::Str(s) => s.clone(),
            Value::Num(n) => format_number(*n),
            Value::Bool(b) => b.to_string(),
        }
    }

    fn to_number(&self, value: &Value) -> f64 {
        match value {
            Value::Num(n) => *n,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            other => parse_number(&self.to_string(other)),
        }
    }

    fn to_bool(&self, value: &Value) -> bool {
        match value {
            Value::Nodes(items) => !items.is_empty(),
            Value::Str(s) => !s.is_empty(),
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Bool(b) => *b,
        }
    }

    fn compare(&self, op: CompareOp, lhs: &Value, rhs: &Value) -> bool {
        match (lhs, rhs) {
            (Value::Nodes(a), Value::Nodes(b)) => a.iter().any(|&x| {
                let xs = self.item_string(x);
                b.iter()
                    .any(|&y| compare_atoms(op, &Atom::Str(xs.clone()), &Atom::Str(self.item_string(y))))
            }),
            (Value::Nodes(items), other) => self.compare_set(op, items, other, false),
            (other, Value::Nodes(items)) => self.compare_set(op, items, other, true),
            (a, b) => compare_atoms(op, &self.atom(a), &self.atom(b)),
        }
    }

    /// Node-set against a scalar: a boolean compares with the set's
    /// emptiness, anything else with each member's string value
    fn compare_set(&self, op: CompareOp, items: &[Item], other: &Value, flipped: bool) -> bool {
        if let Value::Bool(b) = other {
            let set = Atom::Bool(!items.is_empty());
            let scalar = Atom::Bool(*b);
            return if flipped {
                compare_atoms(op, &scalar, &set)
            } else {
                compare_atoms(op, &set, &scalar)
            };
        }
        let scalar = self.atom(other);
        items.iter().any(|&item| {
            let member = match scalar {
                Atom::Num(_) => Atom::Num(parse_number(&self.item_string(item))),
                _ => Atom::Str(self.item_string(item)),
            };
            if flipped {
                compare_atoms(op, &scalar, &member)
            } else {
                compare_atoms(op, &member, &scalar)
            }
        })
    }

    fn atom(&self, value: &Value) -> Atom {
        match value {
            Value::Str(s) => Atom::Str(s.clone()),
            Value::Num(n) => Atom::Num(*n),
            Value::Bool(b) => Atom::Bool(*b),
            nodes @ Value::Nodes(_) => Atom::Str(self.to_string(nodes)),
        }
    }

    // ===== Functions =====

    fn call(&self, name: &str, args: &[Expr], ctx: Ctx) -> Result<Value, XPathError> {
        let arity = |expected: &str, ok: bool| -> Result<(), XPathError> {
            if ok {
                Ok(())
            } else {
                Err(XPathError::Arity {
                    name: name.to_string(),
                    expected: expected.to_string(),
                    got: args.len(),
                })
            }
        };
        let n = args.len();

        match name {
            "last" => {
                arity("0", n == 0)?;
                Ok(Value::Num(ctx.size as f64))
            }
            "position" => {
                arity("0", n == 0)?;
                Ok(Value::Num(ctx.position as f64))
            }
            "true" | "false" => {
                arity("0", n == 0)?;
                Ok(Value::Bool(name == "true"))
            }
            "count" => {
                arity("1", n == 1)?;
                let items = self.expect_nodes(self.eval(&args[0], ctx)?, "count() argument")?;
                Ok(Value::Num(items.len() as f64))
            }
            "name" | "local-name" => {
                arity("0 or 1", n <= 1)?;
                let item = match args.first() {
                    Some(arg) => self
                        .expect_nodes(self.eval(arg, ctx)?, "name() argument")?
                        .first()
                        .copied(),
                    None => Some(ctx.item),
                };
                Ok(Value::Str(
                    item.map(|i| self.item_name(i)).unwrap_or_default(),
                ))
            }
            "string" | "number" | "string-length" | "normalize-space" => {
                arity("0 or 1", n <= 1)?;
                let value = match args.first() {
                    Some(arg) => self.eval(arg, ctx)?,
                    None => Value::Nodes(vec![ctx.item]),
                };
                Ok(match name {
                    "string" => Value::Str(self.to_string(&value)),
                    "number" => Value::Num(self.to_number(&value)),
                    "string-length" => Value::Num(self.to_string(&value).chars().count() as f64),
                    _ => Value::Str(
                        self.to_string(&value)
                            .split_whitespace()
                            .collect::<Vec<_>>()
                            .join(" "),
                    ),
                })
            }
            "boolean" | "not" => {
                arity("1", n == 1)?;
                let b = self.to_bool(&self.eval(&args[0], ctx)?);
                Ok(Value::Bool(if name == "not" { !b } else { b }))
            }
            "contains" | "starts-with" => {
                arity("2", n == 2)?;
                let haystack = self.to_string(&self.eval(&args[0], ctx)?);
                let needle = self.to_string(&self.eval(&args[1], ctx)?);
                Ok(Value::Bool(if name == "contains" {
                    haystack.contains(&needle)
                } else {
                    haystack.starts_with(&needle)
                }))
            }
            "concat" => {
                arity("2 or more", n >= 2)?;
                let mut out = String::new();
                for arg in args {
                    out.push_str(&self.to_string(&self.eval(arg, ctx)?));
                }
                Ok(Value::Str(out))
            }
            other => Err(XPathError::UnknownFunction(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
enum Atom {
    Str(String),
    Num(f64),
    Bool(bool),
}

/// Scalar comparison: equality goes through booleans, then numbers, then
/// strings; ordering always compares numbers
fn compare_atoms(op: CompareOp, a: &Atom, b: &Atom) -> bool {
    let as_num = |atom: &Atom| match atom {
        Atom::Num(n) => *n,
        Atom::Bool(true) => 1.0,
        Atom::Bool(false) => 0.0,
        Atom::Str(s) => parse_number(s),
    };
    let as_bool = |atom: &Atom| match atom {
        Atom::Bool(b) => *b,
        Atom::Num(n) => *n != 0.0 && !n.is_nan(),
        Atom::Str(s) => !s.is_empty(),
    };

    match op {
        CompareOp::Eq | CompareOp::Ne => {
            let equal = match (a, b) {
                (Atom::Bool(_), _) | (_, Atom::Bool(_)) => as_bool(a) == as_bool(b),
                (Atom::Num(_), _) | (_, Atom::Num(_)) => as_num(a) == as_num(b),
                (Atom::Str(x), Atom::Str(y)) => x == y,
            };
            (op == CompareOp::Eq) == equal
        }
        CompareOp::Lt => as_num(a) < as_num(b),
        CompareOp::Le => as_num(a) <= as_num(b),
        CompareOp::Gt => as_num(a) > as_num(b),
        CompareOp::Ge => as_num(a) >= as_num(b),
    }
}

fn parse_number(s: &str) -> f64 {
    s.trim().parse::<f64>().unwrap_or(f64::NAN)
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Nodes(_) => "a node-set",
        Value::Str(_) => "a string",
        Value::Num(_) => "a number",
        Value::Bool(_) => "a boolean",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.5), "-0.5");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_compare_atoms_equality_coercions() {
        assert!(compare_atoms(
            CompareOp::Eq,
            &Atom::Str("1.0".into()),
            &Atom::Num(1.0)
        ));
        assert!(compare_atoms(
            CompareOp::Eq,
            &Atom::Str("x".into()),
            &Atom::Bool(true)
        ));
        assert!(compare_atoms(
            CompareOp::Ne,
            &Atom::Str("a".into()),
            &Atom::Str("b".into())
        ));
        assert!(compare_atoms(
            CompareOp::Lt,
            &Atom::Str("2".into()),
            &Atom::Str("10".into())
        ));
    }

    #[test]
    fn test_flatten_indices_and_ends() {
        let mut root = Node::new("r");
        let mut a = Node::new("a");
        a.push_child(Node::new("b"));
        root.push_child(a);
        root.push_child(Node::new("c"));

        let doc = Document::new(&root);
        assert_eq!(doc.entries.len(), 5);
        assert!(doc.entries[0].document);
        assert_eq!(doc.entries[1].node.tag(), "r");
        assert_eq!(doc.entries[1].children, vec![2, 4]);
        assert_eq!(doc.entries[2].end, 4);
        assert_eq!(doc.entries[0].end, 5);
    }
}
