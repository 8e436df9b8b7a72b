//! Thin helpers over the `html5ever` / `markup5ever_rcdom` tree.

use html5ever::parse_document;
use html5ever::serialize::{SerializeOpts, serialize};
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

/// Parses an HTML document. Malformed markup is repaired, never rejected.
pub(crate) fn html_to_dom(html: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(html)
}

/// Serializes the whole document back to HTML.
pub(crate) fn serialize_document(dom: &RcDom) -> std::io::Result<String> {
    let mut buf: Vec<u8> = Vec::new();
    let serializable: SerializableHandle = dom.document.clone().into();
    serialize(&mut buf, &serializable, SerializeOpts::default())?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Every element under `root`, in document order.
pub(crate) fn elements_in_order(root: &Handle) -> Vec<Handle> {
    let mut found = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        if matches!(node.data, NodeData::Element { .. }) {
            found.push(node.clone());
        }
        // Reverse so the first child is visited next
        stack.extend(node.children.borrow().iter().rev().cloned());
    }
    found
}

pub(crate) fn get_node_name(node: &Handle) -> Option<&str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

pub(crate) fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// Replaces the value of an existing attribute. Missing attributes are left
/// missing.
pub(crate) fn set_node_attr(node: &Handle, attr_name: &str, attr_value: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        for attr in attrs
            .borrow_mut()
            .iter_mut()
            .filter(|attr| &*attr.name.local == attr_name)
        {
            attr.value.clear();
            attr.value.push_slice(attr_value);
        }
    }
}

/// Whether the whitespace-separated `rel` list contains `stylesheet`.
pub(crate) fn is_stylesheet_link(node: &Handle) -> bool {
    get_node_attr(node, "rel").is_some_and(|rel| {
        rel.split_whitespace()
            .any(|token| token.eq_ignore_ascii_case("stylesheet"))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_elements_in_order_is_document_order() {
        let dom = html_to_dom("<html><head><link></head><body><img><p><script></script></p></body></html>");
        let names: Vec<String> = elements_in_order(&dom.document)
            .iter()
            .filter_map(|n| get_node_name(n).map(str::to_string))
            .collect();
        assert_eq!(names, ["html", "head", "link", "body", "img", "p", "script"]);
    }

    #[test]
    fn test_set_node_attr_round_trips_through_serializer() {
        let dom = html_to_dom(r#"<img src="/a.png" alt="x">"#);
        let img = elements_in_order(&dom.document)
            .into_iter()
            .find(|n| get_node_name(n) == Some("img"))
            .unwrap();
        set_node_attr(&img, "src", "dir/a.png");
        set_node_attr(&img, "missing", "ignored");
        assert_eq!(get_node_attr(&img, "src").as_deref(), Some("dir/a.png"));
        assert_eq!(get_node_attr(&img, "missing"), None);

        let html = serialize_document(&dom).unwrap();
        assert!(html.contains(r#"<img src="dir/a.png" alt="x">"#), "{html}");
    }

    #[test]
    fn test_is_stylesheet_link_tokenizes_rel() {
        let dom = html_to_dom(
            r#"<link rel="alternate STYLESHEET" href="a.css"><link rel="preload" href="b.css"><link href="c.css">"#,
        );
        let flags: Vec<bool> = elements_in_order(&dom.document)
            .iter()
            .filter(|n| get_node_name(n) == Some("link"))
            .map(is_stylesheet_link)
            .collect();
        assert_eq!(flags, [true, false, false]);
    }
}
