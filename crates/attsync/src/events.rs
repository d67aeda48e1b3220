//! UI events and the handler table.

use std::collections::HashMap;
use std::rc::Rc;

use attsync_dom::{Document, NodeId};

use crate::params::ParameterSet;

/// Event delivered to a node by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Activation of a link or control.
    Click,
    /// Text field gained focus.
    Focus,
    /// Form submission.
    Submit,
    /// Out-of-band channel finished loading the given document body.
    Load(String),
}

impl UiEvent {
    pub(crate) fn kind(&self) -> EventKind {
        match self {
            Self::Click => EventKind::Click,
            Self::Focus => EventKind::Focus,
            Self::Submit => EventKind::Submit,
            Self::Load(_) => EventKind::Load,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EventKind {
    Click,
    Focus,
    Submit,
    Load,
}

/// Confirmation-gated delete bound to one remove link.
#[derive(Debug)]
pub(crate) struct DeleteAction {
    pub(crate) container: NodeId,
    pub(crate) href: String,
    pub(crate) filename: String,
    pub(crate) params: ParameterSet,
}

#[derive(Debug, Clone)]
pub(crate) enum Handler {
    Delete(Rc<DeleteAction>),
    /// Flip visibility of the listed nodes.
    Toggle(Vec<NodeId>),
    /// Drop the hint text of an unedited comment field.
    ClearHint,
    Upload { form: NodeId },
    ChannelLoad { form: NodeId },
}

/// Handlers attached to nodes, keyed by node.
#[derive(Debug, Default)]
pub(crate) struct Bindings {
    handlers: HashMap<NodeId, Vec<(EventKind, Handler)>>,
}

impl Bindings {
    pub(crate) fn on(&mut self, node: NodeId, kind: EventKind, handler: Handler) {
        self.handlers.entry(node).or_default().push((kind, handler));
    }

    /// Detach every handler on `node`.
    pub(crate) fn off(&mut self, node: NodeId) {
        self.handlers.remove(&node);
    }

    pub(crate) fn handlers_for(&self, node: NodeId, kind: EventKind) -> Vec<Handler> {
        self.handlers
            .get(&node)
            .map(|list| {
                list.iter()
                    .filter(|(k, _)| *k == kind)
                    .map(|(_, h)| h.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, node: NodeId) -> usize {
        self.handlers.get(&node).map_or(0, Vec::len)
    }

    /// Drop handlers of nodes that left the document.
    pub(crate) fn prune(&mut self, doc: &Document) {
        self.handlers.retain(|&node, _| doc.is_attached(node));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_off_and_filter_by_kind() {
        let mut doc = Document::new();
        let node = doc.create_element("a");
        let mut bindings = Bindings::default();

        bindings.on(node, EventKind::Click, Handler::ClearHint);
        bindings.on(node, EventKind::Focus, Handler::ClearHint);
        assert_eq!(bindings.count(node), 2);
        assert_eq!(bindings.handlers_for(node, EventKind::Click).len(), 1);
        assert!(bindings.handlers_for(node, EventKind::Submit).is_empty());

        bindings.off(node);
        assert_eq!(bindings.count(node), 0);
    }

    #[test]
    fn test_prune_detached() {
        let mut doc = Document::parse("<a></a>").unwrap();
        let attached = doc.descendants(doc.root())[0];
        let detached = doc.create_element("b");
        let mut bindings = Bindings::default();
        bindings.on(attached, EventKind::Click, Handler::ClearHint);
        bindings.on(detached, EventKind::Click, Handler::ClearHint);

        bindings.prune(&doc);
        assert_eq!(bindings.count(attached), 1);
        assert_eq!(bindings.count(detached), 0);
    }
}
