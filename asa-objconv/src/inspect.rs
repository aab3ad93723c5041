use xml_doc_core::XmlNode;

/// Render an element tree down to `max_depth`, one element per line with its
/// attributes and text.
pub fn render_tree(node: &XmlNode, max_depth: usize) -> String {
    let mut out = String::new();
    render_node(node, 0, max_depth, &mut out);
    out
}

fn render_node(node: &XmlNode, depth: usize, max_depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(&node.tag);
    for (key, value) in &node.attributes {
        out.push_str(&format!(" {key}={value}"));
    }
    if let Some(text) = &node.text {
        out.push_str(&format!(" = {}", text.trim()));
    }
    out.push('\n');

    if depth >= max_depth {
        return;
    }
    for child in &node.children {
        render_node(child, depth + 1, max_depth, out);
    }
}
