//! Lenient HTML parser built on quick-xml.
//!
//! Server responses are HTML, not XML, so the reader is configured to accept
//! unmatched end tags and dangling ampersands, void elements are never pushed
//! on the open-element stack, and `script`/`style` blocks are dropped before
//! tokenizing.

use std::borrow::Cow;
use std::sync::LazyLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;

use crate::document::{Document, NodeId};
use crate::entities::convert_html_entities;
use crate::error::DomError;

/// Elements that never have content.
pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Raw-text blocks whose content is not markup.
static RAW_TEXT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
        .expect("invalid raw text regex")
});

pub(crate) fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Parse `html` into detached nodes owned by `doc`.
pub(crate) fn parse_fragment(doc: &mut Document, html: &str) -> Result<Vec<NodeId>, DomError> {
    // Parse under a scratch container, then detach its children
    let holder = doc.create_element("#fragment");
    if let Err(e) = parse_into(doc, holder, html) {
        doc.discard(holder);
        return Err(e);
    }
    let children: Vec<NodeId> = doc.node(holder).children.clone();
    for &child in &children {
        doc.remove(child);
    }
    doc.discard(holder);
    Ok(children)
}

/// Parse `html` and append the resulting nodes to `parent`.
pub(crate) fn parse_into(doc: &mut Document, parent: NodeId, html: &str) -> Result<(), DomError> {
    let html = RAW_TEXT_PATTERN.replace_all(html, "");
    let html = convert_html_entities(&html);

    let mut reader = Reader::from_str(&html);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.allow_dangling_amp = true;

    // Open elements; index 0 is the insertion root and is never popped
    let mut stack = vec![parent];

    loop {
        let current = *stack.last().unwrap_or(&parent);
        match reader.read_event()? {
            Event::Start(e) => {
                let id = create_element(doc, &reader, &e);
                doc.append_child(current, id);
                let void = doc.tag(id).is_some_and(is_void);
                if !void {
                    stack.push(id);
                }
            }
            Event::Empty(e) => {
                let id = create_element(doc, &reader, &e);
                doc.append_child(current, id);
            }
            Event::End(e) => {
                let name = decode_name(&reader, e.name().as_ref()).to_ascii_lowercase();
                // Close the nearest open element with this name, ignore strays
                if let Some(pos) = stack
                    .iter()
                    .skip(1)
                    .rposition(|&open| doc.tag(open) == Some(name.as_str()))
                {
                    stack.truncate(pos + 1);
                }
            }
            Event::Text(e) => {
                let text = reader.decoder().decode(&e)?;
                doc.append_text(current, &text);
            }
            Event::GeneralRef(e) => {
                let entity = reader.decoder().decode(&e)?;
                doc.append_text(current, &decode_entity(&entity));
            }
            Event::CData(e) => {
                doc.append_text(current, &String::from_utf8_lossy(&e));
            }
            Event::Eof => return Ok(()),
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }
}

fn create_element(doc: &mut Document, reader: &Reader<&[u8]>, e: &BytesStart) -> NodeId {
    let tag = decode_name(reader, e.name().as_ref()).to_ascii_lowercase();
    let attrs = decode_attrs(reader, e);
    doc.create_element_with_attrs(tag, attrs)
}

fn decode_name(reader: &Reader<&[u8]>, name: &[u8]) -> String {
    reader.decoder().decode(name).map_or_else(
        |_| String::from_utf8_lossy(name).into_owned(),
        Cow::into_owned,
    )
}

fn decode_attrs(reader: &Reader<&[u8]>, e: &BytesStart) -> Vec<(String, String)> {
    let mut attrs: Vec<(String, String)> = Vec::new();
    for attr in e.html_attributes().with_checks(false).flatten() {
        let key = decode_name(reader, attr.key.as_ref()).to_ascii_lowercase();
        let value = attr.unescape_value().map_or_else(
            |_| String::from_utf8_lossy(&attr.value).into_owned(),
            Cow::into_owned,
        );
        // First occurrence wins, as in browsers
        if !attrs.iter().any(|(existing, _)| *existing == key) {
            attrs.push((key, value));
        }
    }
    attrs
}

/// Decode XML entity references to their character values.
fn decode_entity(entity: &str) -> String {
    match entity {
        "lt" => "<".to_owned(),
        "gt" => ">".to_owned(),
        "amp" => "&".to_owned(),
        "apos" => "'".to_owned(),
        "quot" => "\"".to_owned(),
        s if s.starts_with('#') => {
            let code = if s.starts_with("#x") || s.starts_with("#X") {
                u32::from_str_radix(&s[2..], 16).ok()
            } else {
                s[1..].parse::<u32>().ok()
            };
            code.and_then(char::from_u32)
                .map_or_else(|| format!("&{entity};"), |c| c.to_string())
        }
        _ => format!("&{entity};"),
    }
}
