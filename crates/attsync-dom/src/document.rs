//! Arena-backed document tree.

use std::collections::HashMap;

use crate::error::DomError;
use crate::parser;
use crate::selector::Selector;
use crate::serializer;

/// Class toggled by [`Document::hide`] and [`Document::show`].
pub const HIDDEN_CLASS: &str = "hidden";

/// Handle to a node in a [`Document`].
///
/// A node [removed](Document::remove) from the tree keeps its handle but is
/// no longer [attached](Document::is_attached). Once a node is
/// [discarded](Document::discard) its slot is reused and the old handle goes
/// stale: it reads as an empty detached node and mutations through it are
/// ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

/// File chosen on an `input[type=file]` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// File name as reported by the browser.
    pub name: String,
    /// MIME type.
    pub content_type: String,
    /// File contents.
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub(crate) enum NodeData {
    Document,
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) data: NodeData,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

/// What a stale handle reads as.
static VACANT: Node = Node {
    data: NodeData::Text(String::new()),
    parent: None,
    children: Vec::new(),
};

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Mutable HTML document.
///
/// Elements are addressed by [`NodeId`]. The document root is a synthetic
/// node that never matches a selector.
#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<usize>,
    files: HashMap<NodeId, Vec<SelectedFile>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(Node {
                    data: NodeData::Document,
                    parent: None,
                    children: Vec::new(),
                }),
            }],
            free: Vec::new(),
            files: HashMap::new(),
        }
    }

    /// Parse HTML into a new document.
    ///
    /// The parser is lenient: void elements, unmatched end tags, stray `&`
    /// and named HTML entities are accepted. `script` and `style` blocks are
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`DomError`] if the markup cannot be tokenized.
    pub fn parse(html: &str) -> Result<Self, DomError> {
        let mut doc = Self::new();
        let root = doc.root();
        parser::parse_into(&mut doc, root, html)?;
        Ok(doc)
    }

    /// The synthetic document root.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId {
            index: 0,
            generation: 0,
        }
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        self.get(id).unwrap_or(&VACANT)
    }

    fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Whether `id` still refers to a live node.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes, attached or not, including the root.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let node = Node {
            data,
            parent: None,
            children: Vec::new(),
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index: self.slots.len() - 1,
            generation: 0,
        }
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        })
    }

    pub(crate) fn create_element_with_attrs(
        &mut self,
        tag: String,
        attrs: Vec<(String, String)>,
    ) -> NodeId {
        self.push(NodeData::Element { tag, attrs })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_owned()))
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || !self.contains(parent) || !self.contains(child) {
            return;
        }
        self.remove(child);
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
        }
    }

    /// Insert `node` right after `reference` among its siblings.
    ///
    /// Does nothing if `reference` has no parent.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) {
        if node == reference || !self.contains(node) {
            return;
        }
        self.remove(node);
        let Some(parent) = self.node(reference).parent else {
            return;
        };
        let Some(parent_node) = self.get_mut(parent) else {
            return;
        };
        let siblings = &mut parent_node.children;
        let index = siblings
            .iter()
            .position(|&c| c == reference)
            .map_or(siblings.len(), |i| i + 1);
        siblings.insert(index, node);
        if let Some(inserted) = self.get_mut(node) {
            inserted.parent = Some(parent);
        }
    }

    /// Append text to the end of `parent`, merging with a trailing text node.
    pub(crate) fn append_text(&mut self, parent: NodeId, text: &str) {
        if let Some(&last) = self.node(parent).children.last()
            && let Some(Node {
                data: NodeData::Text(existing),
                ..
            }) = self.get_mut(last)
        {
            existing.push_str(text);
            return;
        }
        let id = self.create_text(text);
        self.append_child(parent, id);
    }

    /// Detach a node (and its subtree) from its parent.
    ///
    /// Removing a detached node or the root is a no-op.
    pub fn remove(&mut self, id: NodeId) {
        let Some(parent) = self.get_mut(id).and_then(|node| node.parent.take()) else {
            return;
        };
        if let Some(node) = self.get_mut(parent) {
            node.children.retain(|&c| c != id);
        }
    }

    /// Detach a node and free it together with its subtree.
    ///
    /// Handles into the subtree go stale and their slots are reused by later
    /// insertions. Discarding the root or a stale handle is a no-op.
    pub fn discard(&mut self, id: NodeId) {
        if id == self.root() || !self.contains(id) {
            return;
        }
        self.remove(id);
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let Some(node) = self.slots[next.index].node.take() else {
                continue;
            };
            stack.extend(node.children);
            self.files.remove(&next);
            let slot = &mut self.slots[next.index];
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(next.index);
        }
    }

    /// Discard every child of `id`.
    fn discard_children(&mut self, id: NodeId) {
        let children = self
            .get_mut(id)
            .map(|node| std::mem::take(&mut node.children))
            .unwrap_or_default();
        for child in children {
            if let Some(node) = self.get_mut(child) {
                node.parent = None;
            }
            self.discard(child);
        }
    }

    /// Whether the node is reachable from the document root.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root() {
                return true;
            }
            match self.get(current).and_then(|node| node.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Element tag name (lowercase), `None` for text nodes and the root.
    #[must_use]
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Whether the node is an element.
    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        self.tag(id).is_some()
    }

    pub(crate) fn attrs(&self, id: NodeId) -> &[(String, String)] {
        match &self.node(id).data {
            NodeData::Element { attrs, .. } => attrs,
            _ => &[],
        }
    }

    /// Attribute value.
    #[must_use]
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing any existing value. Ignored on non-elements.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(Node {
            data: NodeData::Element { attrs, .. },
            ..
        }) = self.get_mut(id)
        {
            match attrs.iter_mut().find(|(key, _)| key == name) {
                Some((_, existing)) => value.clone_into(existing),
                None => attrs.push((name.to_owned(), value.to_owned())),
            }
        }
    }

    /// Remove an attribute.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(Node {
            data: NodeData::Element { attrs, .. },
            ..
        }) = self.get_mut(id)
        {
            attrs.retain(|(key, _)| key != name);
        }
    }

    /// Form control value (`value` attribute), empty if unset.
    #[must_use]
    pub fn value(&self, id: NodeId) -> &str {
        self.attr(id, "value").unwrap_or("")
    }

    /// Set the form control value.
    pub fn set_value(&mut self, id: NodeId, value: &str) {
        self.set_attr(id, "value", value);
    }

    /// Iterate over the element's classes.
    pub fn classes(&self, id: NodeId) -> impl Iterator<Item = &str> {
        self.attr(id, "class").unwrap_or("").split_whitespace()
    }

    /// Whether the element carries `class`.
    #[must_use]
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).any(|c| c == class)
    }

    /// Add a class if not already present.
    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if !self.is_element(id) || self.has_class(id, class) {
            return;
        }
        let classes = match self.attr(id, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
            _ => class.to_owned(),
        };
        self.set_attr(id, "class", &classes);
    }

    /// Remove a class. The attribute is dropped once no class is left.
    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if !self.has_class(id, class) {
            return;
        }
        let remaining: Vec<&str> = self.classes(id).filter(|c| *c != class).collect();
        if remaining.is_empty() {
            self.remove_attr(id, "class");
        } else {
            let joined = remaining.join(" ");
            self.set_attr(id, "class", &joined);
        }
    }

    /// Hide an element.
    pub fn hide(&mut self, id: NodeId) {
        self.add_class(id, HIDDEN_CLASS);
    }

    /// Show an element.
    pub fn show(&mut self, id: NodeId) {
        self.remove_class(id, HIDDEN_CLASS);
    }

    /// Show or hide an element.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        if visible {
            self.show(id);
        } else {
            self.hide(id);
        }
    }

    /// Whether the element itself carries the hidden class.
    #[must_use]
    pub fn is_hidden(&self, id: NodeId) -> bool {
        self.has_class(id, HIDDEN_CLASS)
    }

    /// Parent node. The root's direct children report the root.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Parent element, `None` at the top level.
    #[must_use]
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|&p| self.is_element(p))
    }

    /// Element children in document order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id)
            .children
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
    }

    /// Element children matching `selector`.
    #[must_use]
    pub fn children_matching(&self, id: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.children(id)
            .filter(|&c| selector.matches(self, c))
            .collect()
    }

    /// Nearest preceding element sibling.
    #[must_use]
    pub fn prev_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = &self.node(parent).children;
        let pos = siblings.iter().position(|&c| c == id)?;
        siblings[..pos]
            .iter()
            .rev()
            .copied()
            .find(|&c| self.is_element(c))
    }

    /// Element descendants of `id` in document order, excluding `id`.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.node(id).children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            if !self.is_element(next) {
                continue;
            }
            out.push(next);
            stack.extend(self.node(next).children.iter().rev().copied());
        }
        out
    }

    /// Descendants of `scope` matching `selector`, in document order.
    ///
    /// Like a scoped jQuery lookup, ancestors referenced by the selector may
    /// lie outside `scope`.
    #[must_use]
    pub fn select(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&id| selector.matches(self, id))
            .collect()
    }

    /// First descendant of `scope` matching `selector`.
    #[must_use]
    pub fn select_first(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|&id| selector.matches(self, id))
    }

    /// The node itself or its nearest ancestor matching `selector`.
    #[must_use]
    pub fn closest(&self, id: NodeId, selector: &Selector) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if selector.matches(self, node) {
                return Some(node);
            }
            current = self.parent_element(node);
        }
        None
    }

    /// Concatenated text content of the subtree.
    #[must_use]
    pub fn text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.node(id).data {
            NodeData::Text(text) => out.push_str(text),
            _ => {
                for &child in &self.node(id).children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Serialized children of `id`.
    #[must_use]
    pub fn inner_html(&self, id: NodeId) -> String {
        serializer::inner_html(self, id)
    }

    /// Serialized node including its own tag.
    #[must_use]
    pub fn outer_html(&self, id: NodeId) -> String {
        serializer::outer_html(self, id)
    }

    /// Replace all children of `id` with parsed `html`.
    ///
    /// The markup is parsed before anything is detached, so a parse failure
    /// leaves the document untouched. The previous children are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`DomError`] if `html` cannot be tokenized.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) -> Result<(), DomError> {
        if !self.contains(id) {
            return Ok(());
        }
        let fragment = parser::parse_fragment(self, html)?;
        self.discard_children(id);
        for node in fragment {
            self.append_child(id, node);
        }
        Ok(())
    }

    /// Replace all children of `id` with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if !self.contains(id) {
            return;
        }
        self.discard_children(id);
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node);
        }
    }

    /// Record files chosen on a file input.
    pub fn select_files(&mut self, input: NodeId, files: Vec<SelectedFile>) {
        if self.contains(input) {
            self.files.insert(input, files);
        }
    }

    /// Files chosen on a file input.
    #[must_use]
    pub fn files(&self, input: NodeId) -> &[SelectedFile] {
        self.files.get(&input).map_or(&[], Vec::as_slice)
    }
}
