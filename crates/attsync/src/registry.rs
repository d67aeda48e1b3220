//! Index of widget containers by content id.
//!
//! Entries are recorded at bind time and re-checked against the live
//! document on lookup, so containers that were detached or re-pointed at
//! another content id drop out without explicit unregistration. Lookup also
//! scans the document, so widgets rendered after binding are found and
//! recorded.

use std::collections::{BTreeMap, BTreeSet};

use attsync_dom::{Document, NodeId};

use crate::params::ContentId;
use crate::selectors::{CONFIG_FIELDSET, PAGE_ID_INPUT, TABLE_CONTAINER};

/// Bound containers grouped by the content id they displayed when bound.
#[derive(Debug, Default)]
pub(crate) struct WidgetRegistry {
    by_content: BTreeMap<ContentId, BTreeSet<NodeId>>,
}

impl WidgetRegistry {
    pub(crate) fn register(&mut self, id: ContentId, container: NodeId) {
        for containers in self.by_content.values_mut() {
            containers.remove(&container);
        }
        self.by_content.entry(id).or_default().insert(container);
    }

    /// Attached containers currently displaying `id`, in document order.
    ///
    /// Containers in the document that show `id` but were registered under
    /// another id, or never registered, are recorded under `id`.
    pub(crate) fn lookup(&mut self, doc: &Document, id: &ContentId) -> Vec<NodeId> {
        let scanned = doc
            .select(doc.root(), &TABLE_CONTAINER)
            .into_iter()
            .filter(|&container| live_content_id(doc, container).as_ref() == Some(id));
        let registered = self
            .by_content
            .get(id)
            .into_iter()
            .flatten()
            .copied()
            .filter(|&container| {
                doc.is_attached(container) && live_content_id(doc, container).as_ref() == Some(id)
            });
        let mut live: Vec<NodeId> = scanned
            .chain(registered)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        for &container in &live {
            self.register(id.clone(), container);
        }
        sort_document_order(doc, &mut live);
        live
    }

    /// Drop containers no longer attached to the document.
    pub(crate) fn prune(&mut self, doc: &Document) {
        for containers in self.by_content.values_mut() {
            containers.retain(|&c| doc.is_attached(c));
        }
        self.by_content.retain(|_, containers| !containers.is_empty());
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.by_content.values().map(BTreeSet::len).sum()
    }
}

/// Content id read from the container's own configuration grouping.
pub(crate) fn live_content_id(doc: &Document, container: NodeId) -> Option<ContentId> {
    let fieldset = doc.children_matching(container, &CONFIG_FIELDSET).into_iter().next()?;
    let input = doc.select_first(fieldset, &PAGE_ID_INPUT)?;
    let value = doc.value(input);
    (!value.is_empty()).then(|| ContentId::new(value))
}

fn sort_document_order(doc: &Document, nodes: &mut [NodeId]) {
    if nodes.len() < 2 {
        return;
    }
    let order = doc.descendants(doc.root());
    nodes.sort_by_key(|node| order.iter().position(|n| n == node).unwrap_or(usize::MAX));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"
<div class="plugin_attachments_table_container" id="a">
  <fieldset><input type="hidden" name="pageId" value="42"></fieldset>
</div>
<div class="plugin_attachments_table_container" id="b">
  <fieldset><input type="hidden" name="pageId" value="42"></fieldset>
</div>
<div class="plugin_attachments_table_container" id="c">
  <fieldset><input type="hidden" name="pageId" value="7"></fieldset>
</div>"#;

    fn setup() -> (Document, WidgetRegistry, Vec<NodeId>) {
        let doc = Document::parse(PAGE).unwrap();
        let containers = doc.select(doc.root(), &TABLE_CONTAINER);
        let mut registry = WidgetRegistry::default();
        for &c in containers.iter().rev() {
            let id = live_content_id(&doc, c).unwrap();
            registry.register(id, c);
        }
        (doc, registry, containers)
    }

    #[test]
    fn test_lookup_in_document_order() {
        let (doc, mut registry, containers) = setup();
        assert_eq!(
            registry.lookup(&doc, &ContentId::from("42")),
            vec![containers[0], containers[1]]
        );
        assert_eq!(
            registry.lookup(&doc, &ContentId::from("7")),
            vec![containers[2]]
        );
        assert!(registry.lookup(&doc, &ContentId::from("99")).is_empty());
    }

    #[test]
    fn test_lookup_skips_detached() {
        let (mut doc, mut registry, containers) = setup();
        doc.remove(containers[0]);

        assert_eq!(
            registry.lookup(&doc, &ContentId::from("42")),
            vec![containers[1]]
        );
        registry.prune(&doc);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_lookup_rechecks_live_page_id() {
        let (mut doc, mut registry, containers) = setup();
        let input = doc.select_first(containers[1], &PAGE_ID_INPUT).unwrap();
        doc.set_value(input, "7");

        assert_eq!(
            registry.lookup(&doc, &ContentId::from("42")),
            vec![containers[0]]
        );
    }

    #[test]
    fn test_reregister_moves_container() {
        let (doc, mut registry, containers) = setup();
        registry.register(ContentId::from("7"), containers[0]);
        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.lookup(&doc, &ContentId::from("7")),
            vec![containers[2]]
        );
    }

    #[test]
    fn test_lookup_includes_repointed_container() {
        let (mut doc, mut registry, containers) = setup();
        let input = doc.select_first(containers[2], &PAGE_ID_INPUT).unwrap();
        doc.set_value(input, "42");

        assert_eq!(
            registry.lookup(&doc, &ContentId::from("42")),
            vec![containers[0], containers[1], containers[2]]
        );
        assert!(registry.lookup(&doc, &ContentId::from("7")).is_empty());
    }

    #[test]
    fn test_lookup_finds_unregistered_container() {
        let mut doc = Document::parse(PAGE).unwrap();
        let mut registry = WidgetRegistry::default();
        let containers = doc.select(doc.root(), &TABLE_CONTAINER);
        registry.register(ContentId::from("42"), containers[0]);

        let late = doc.create_element("div");
        doc.set_inner_html(
            late,
            r#"<fieldset><input type="hidden" name="pageId" value="42"></fieldset>"#,
        )
        .unwrap();
        doc.add_class(late, "plugin_attachments_table_container");
        let root = doc.root();
        doc.append_child(root, late);

        assert_eq!(
            registry.lookup(&doc, &ContentId::from("42")),
            vec![containers[0], containers[1], late]
        );
        assert_eq!(registry.len(), 3);
    }
}
