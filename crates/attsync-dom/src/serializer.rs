//! HTML serialization of document subtrees.

use std::fmt::Write;

use crate::document::{Document, NodeData, NodeId};
use crate::parser::is_void;

pub(crate) fn inner_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    for &child in &doc.node(id).children {
        serialize_node(doc, child, &mut out);
    }
    out
}

pub(crate) fn outer_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    serialize_node(doc, id, &mut out);
    out
}

fn serialize_node(doc: &Document, id: NodeId, out: &mut String) {
    let node = doc.node(id);
    match &node.data {
        NodeData::Text(text) => out.push_str(&escape_text(text)),
        NodeData::Document => {
            for &child in &node.children {
                serialize_node(doc, child, out);
            }
        }
        NodeData::Element { tag, attrs } => {
            out.push('<');
            out.push_str(tag);
            for (key, value) in attrs {
                let _ = write!(out, r#" {}="{}""#, key, escape_attr(value));
            }
            out.push('>');

            if is_void(tag) {
                return;
            }

            for &child in &node.children {
                serialize_node(doc, child, out);
            }
            let _ = write!(out, "</{tag}>");
        }
    }
}

fn escape_text(text: &str) -> String {
    escape(text, false)
}

fn escape_attr(text: &str) -> String {
    escape(text, true)
}

fn escape(text: &str, escape_quotes: bool) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' if escape_quotes => result.push_str("&quot;"),
            _ => result.push(ch),
        }
    }
    result
}
