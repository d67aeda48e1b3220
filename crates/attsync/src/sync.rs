//! The attachment sync service.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;

use attsync_config::Config;
use attsync_dom::{Document, NodeId};
use tracing::{debug, info, warn};

use crate::broadcast::RefreshHandle;
use crate::events::{Bindings, Handler, UiEvent};
use crate::error::ActionError;
use crate::prompt::Prompt;
use crate::registry::WidgetRegistry;
use crate::selectors::{TABLE_CONTAINER, UPLOAD_FORM};
use crate::transport::Transport;
use crate::upload::{SubmitOutcome, UploadSession};

/// Result of delivering one event.
#[derive(Debug, Default)]
pub struct Dispatch {
    /// Whether the host's default action (navigation, native submit) must
    /// be skipped.
    pub default_prevented: bool,
    /// Widget refreshes started by the event, one per matching widget.
    pub refreshes: Vec<RefreshHandle>,
}

/// Counts reported by [`AttachmentSync::init`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitSummary {
    /// Widget containers bound.
    pub widgets: usize,
    /// Upload forms wired to their channel.
    pub forms: usize,
}

/// Keeps every attachment widget in a document consistent with the server.
///
/// Created once per document. Cloning is cheap and yields a handle to the
/// same service. All work runs on the document's thread; refreshes are
/// spawned with [`tokio::task::spawn_local`], so event dispatch must happen
/// inside a [`tokio::task::LocalSet`].
pub struct AttachmentSync<T, P> {
    pub(crate) shared: Rc<Shared<T, P>>,
}

pub(crate) struct Shared<T, P> {
    pub(crate) document: Rc<RefCell<Document>>,
    pub(crate) transport: T,
    pub(crate) prompt: P,
    pub(crate) config: Config,
    pub(crate) registry: RefCell<WidgetRegistry>,
    pub(crate) bindings: RefCell<Bindings>,
    pub(crate) uploads: RefCell<HashMap<NodeId, UploadSession>>,
}

impl<T, P> Clone for AttachmentSync<T, P> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T: Transport + 'static, P: Prompt + 'static> AttachmentSync<T, P> {
    /// Create the service for `document`.
    pub fn new(document: Rc<RefCell<Document>>, transport: T, prompt: P, config: Config) -> Self {
        Self {
            shared: Rc::new(Shared {
                document,
                transport,
                prompt,
                config,
                registry: RefCell::default(),
                bindings: RefCell::default(),
                uploads: RefCell::default(),
            }),
        }
    }

    /// Bind every widget and wire every upload form in the document.
    ///
    /// Forms missing their channel or submit control are skipped with a
    /// warning.
    pub fn init(&self) -> InitSummary {
        let (containers, forms) = {
            let doc = self.document();
            (
                doc.select(doc.root(), &TABLE_CONTAINER),
                doc.select(doc.root(), &UPLOAD_FORM),
            )
        };

        let mut summary = InitSummary::default();
        for container in containers {
            self.bind(container);
            summary.widgets += 1;
        }
        for form in forms {
            match self.init_upload_form(form) {
                Ok(()) => summary.forms += 1,
                Err(e) => warn!(error = %e, "Skipping upload form"),
            }
        }

        info!(
            widgets = summary.widgets,
            forms = summary.forms,
            "Attachment widgets initialized"
        );
        summary
    }

    /// Number of handlers attached to `node`.
    pub fn handler_count(&self, node: NodeId) -> usize {
        self.shared.bindings.borrow().count(node)
    }

    /// Deliver `event` to `target` and its ancestors.
    ///
    /// Handlers run in order from the target outwards. The returned
    /// [`Dispatch`] carries the refreshes the event started; awaiting them is
    /// optional.
    pub async fn dispatch(&self, target: NodeId, event: UiEvent) -> Dispatch {
        let kind = event.kind();
        let handlers: Vec<(NodeId, Handler)> = {
            let doc = self.document();
            let bindings = self.shared.bindings.borrow();
            let mut path = vec![target];
            let mut current = target;
            while let Some(parent) = doc.parent_element(current) {
                path.push(parent);
                current = parent;
            }
            path.into_iter()
                .flat_map(|node| {
                    bindings
                        .handlers_for(node, kind)
                        .into_iter()
                        .map(move |h| (node, h))
                })
                .collect()
        };

        let mut dispatch = Dispatch::default();
        for (node, handler) in handlers {
            match handler {
                Handler::Delete(action) => {
                    dispatch.default_prevented = true;
                    match self.delete(&action).await {
                        Ok(handles) => dispatch.refreshes.extend(handles),
                        Err(ActionError::UserCancelled) => {
                            debug!(file = %action.filename, "Delete declined");
                        }
                        Err(e) => {
                            warn!(file = %action.filename, error = %e, "Delete failed");
                        }
                    }
                }
                Handler::Toggle(nodes) => {
                    dispatch.default_prevented = true;
                    let mut doc = self.document_mut();
                    for node in nodes {
                        let hidden = doc.is_hidden(node);
                        doc.set_visible(node, hidden);
                    }
                }
                Handler::ClearHint => {
                    crate::upload::clear_hint(&mut self.document_mut(), node);
                }
                Handler::Upload { form } => match self.submit_upload(form).await {
                    SubmitOutcome::Suppressed => dispatch.default_prevented = true,
                    SubmitOutcome::Submitted(handles) => dispatch.refreshes.extend(handles),
                },
                Handler::ChannelLoad { form } => {
                    if let UiEvent::Load(body) = &event {
                        dispatch
                            .refreshes
                            .extend(self.channel_loaded(form, Ok(body.clone())));
                    }
                }
            }
        }
        dispatch
    }

    pub(crate) fn document(&self) -> Ref<'_, Document> {
        self.shared.document.borrow()
    }

    pub(crate) fn document_mut(&self) -> RefMut<'_, Document> {
        self.shared.document.borrow_mut()
    }

    /// Wait out a fade, then hide `node`.
    pub(crate) async fn fade_out(&self, node: NodeId) {
        tokio::time::sleep(self.shared.config.effects.fade()).await;
        self.document_mut().hide(node);
    }

    /// Show `node`, then wait out a fade.
    pub(crate) async fn fade_in(&self, node: NodeId) {
        self.document_mut().show(node);
        tokio::time::sleep(self.shared.config.effects.fade()).await;
    }
}
