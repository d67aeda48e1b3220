//! Widget binding and the confirmation-gated delete action.

use std::rc::Rc;

use attsync_dom::{Document, NodeId};
use tracing::{debug, info, warn};

use crate::broadcast::{RefreshCallbacks, RefreshHandle};
use crate::error::ActionError;
use crate::events::{DeleteAction, EventKind, Handler};
use crate::message::format_message;
use crate::params::{self, DELETE_CONFIRM_MESSAGE, ParameterSet};
use crate::prompt::Prompt;
use crate::selectors::{
    ATTACHMENT_TABLE, CONFIG_FIELDSET, DROP_DOWN, FILENAME, HISTORY_LINK, HISTORY_ROW, MENU_ITEM,
    REMOVE_LINK, ROW,
};
use crate::sync::AttachmentSync;
use crate::transport::{Request, Transport};

/// Inline style centering the delete spinner.
const CENTERED: &str = "margin-left:auto;margin-right:auto;display:block";

/// Attribute linking history links to their older-version rows.
const ATTACHMENT_ID: &str = "data-attachment-id";

impl<T: Transport + 'static, P: Prompt + 'static> AttachmentSync<T, P> {
    /// Attach widget behavior to `container`.
    ///
    /// Idempotent: every handler previously attached inside the widget is
    /// dropped before new ones are bound, so a click never fires twice.
    /// Returns the widget's parameters.
    pub fn bind(&self, container: NodeId) -> ParameterSet {
        let doc = self.document();
        let mut bindings = self.shared.bindings.borrow_mut();
        let mut registry = self.shared.registry.borrow_mut();

        bindings.prune(&doc);
        registry.prune(&doc);
        bindings.off(container);
        for node in doc.descendants(container) {
            bindings.off(node);
        }

        for link in doc.select(container, &HISTORY_LINK) {
            let rows = history_rows(&doc, container, link);
            bindings.on(link, EventKind::Click, Handler::Toggle(rows));
        }
        for item in doc.select(container, &MENU_ITEM) {
            let drop_downs = doc.select(item, &DROP_DOWN);
            bindings.on(item, EventKind::Click, Handler::Toggle(drop_downs));
        }

        let fieldset = doc
            .children_matching(container, &CONFIG_FIELDSET)
            .into_iter()
            .next();
        let params = params::extract(&doc, fieldset);

        let mut delete_links = 0;
        for link in doc.select(container, &REMOVE_LINK) {
            let Some(href) = doc.attr(link, "href").filter(|h| !h.is_empty()) else {
                warn!("Remove link without href");
                continue;
            };
            let filename = doc
                .closest(link, &ROW)
                .and_then(|row| doc.select_first(row, &FILENAME))
                .and_then(|cell| doc.attr(cell, "data-filename"))
                .unwrap_or_default();

            let action = DeleteAction {
                container,
                href: href.to_owned(),
                filename: filename.to_owned(),
                params: params.clone(),
            };
            bindings.on(link, EventKind::Click, Handler::Delete(Rc::new(action)));
            delete_links += 1;
        }

        match params.content_id() {
            Some(id) => {
                debug!(content_id = %id, delete_links, "Bound attachment widget");
                registry.register(id, container);
            }
            None => debug!(delete_links, "Bound attachment widget without content id"),
        }
        params
    }

    /// Run the delete flow for one remove link.
    ///
    /// On success returns the refreshes of every widget showing the same
    /// content. A failed request replaces the spinner with an error notice.
    pub(crate) async fn delete(
        &self,
        action: &DeleteAction,
    ) -> Result<Vec<RefreshHandle>, ActionError> {
        let config = &self.shared.config;
        let template = action
            .params
            .get(DELETE_CONFIRM_MESSAGE)
            .unwrap_or(config.messages.delete_confirm.as_str());
        let message = format_message(template, &[action.filename.as_str()]);
        if !self.shared.prompt.confirm(&message) {
            return Err(ActionError::UserCancelled);
        }

        info!(file = %action.filename, "Deleting attachment");
        let container = action.container;
        self.fade_out(container).await;

        let spinner = {
            let mut doc = self.document_mut();
            for table in doc.select(container, &ATTACHMENT_TABLE) {
                doc.discard(table);
            }
            let spinner = doc.create_element("img");
            doc.set_attr(spinner, "src", &config.server.wait_icon_url());
            doc.set_attr(spinner, "style", CENTERED);
            doc.append_child(container, spinner);
            doc.show(container);
            spinner
        };

        let request = Request::get(action.href.as_str())
            .param("decorator", "none")
            .no_cache();
        if let Err(e) = self.shared.transport.get(request).await {
            let mut doc = self.document_mut();
            doc.discard(spinner);
            let notice = doc.create_element("div");
            doc.add_class(notice, "errorBox");
            doc.set_text(notice, &config.messages.delete_failed);
            doc.append_child(container, notice);
            return Err(e.into());
        }

        let Some(id) = action.params.content_id() else {
            warn!(file = %action.filename, "Deleted attachment from widget without content id");
            return Ok(Vec::new());
        };
        Ok(self.refresh(&id, RefreshCallbacks::default()))
    }
}

/// Older-version rows revealed by a history link.
fn history_rows(doc: &Document, container: NodeId, link: NodeId) -> Vec<NodeId> {
    let Some(id) = doc.attr(link, ATTACHMENT_ID) else {
        return Vec::new();
    };
    doc.select(container, &HISTORY_ROW)
        .into_iter()
        .filter(|&row| doc.attr(row, ATTACHMENT_ID) == Some(id))
        .collect()
}
