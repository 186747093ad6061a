use hiccup_xpath::Node;

pub const ID_ATTR: &str = "_hiccup_id";

fn leaf(tag: &str, id: usize, text: &str) -> Node {
    let mut node = Node::new(tag);
    node.set_attribute(ID_ATTR, id.to_string());
    node.set_text(text);
    node
}

/// Tree shaped like the projection of `{name: "a", tags: ["x", "y"], meta: null}`
///
/// ```text
/// Record(0)
///   name(1) "a"
///   tags(2)
///     primitivish(3) "x"
///     primitivish(4) "y"
///   meta(5) "none"
/// ```
#[allow(dead_code)]
pub fn sample_tree() -> Node {
    let mut root = Node::new("Record");
    root.set_attribute(ID_ATTR, "0");

    let mut tags = Node::new("tags");
    tags.set_attribute(ID_ATTR, "2");
    tags.push_child(leaf("primitivish", 3, "x"));
    tags.push_child(leaf("primitivish", 4, "y"));

    root.push_child(leaf("name", 1, "a"));
    root.push_child(tags);
    root.push_child(leaf("meta", 5, "none"));
    root
}

/// Identity attribute values of the selected nodes, in result order
#[allow(dead_code)]
pub fn ids(nodes: &[&Node]) -> Vec<String> {
    nodes
        .iter()
        .map(|n| n.attribute(ID_ATTR).unwrap_or("?").to_string())
        .collect()
}
