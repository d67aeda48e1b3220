//! Broadcast refresh of every widget showing one content item.
//!
//! After a mutation the server is the source of truth: each matching widget
//! re-fetches its own fragment from the macro-render endpoint and is rebound
//! on the new markup. Widgets refresh independently; there is no barrier.

use std::fmt;
use std::rc::Rc;

use attsync_dom::{Document, NodeId};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::RefreshError;
use crate::params::{self, ContentId};
use crate::prompt::Prompt;
use crate::selectors::{CONFIG_FIELDSET, TABLE_CONTAINER};
use crate::sync::AttachmentSync;
use crate::transport::{Request, Transport};

/// Completion of one widget's refresh task.
pub type RefreshHandle = JoinHandle<RefreshOutcome>;

/// How one widget's refresh ended.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// Widget content was replaced and rebound.
    Refreshed {
        /// The widget container.
        container: NodeId,
        /// Inner markup that was installed.
        fragment: String,
    },
    /// Widget was left as it was.
    Failed {
        /// The widget container.
        container: NodeId,
        /// Why the refresh failed.
        error: RefreshError,
    },
}

impl RefreshOutcome {
    /// The widget container.
    pub fn container(&self) -> NodeId {
        match self {
            Self::Refreshed { container, .. } | Self::Failed { container, .. } => *container,
        }
    }

    /// Whether the widget was re-rendered.
    pub fn is_refreshed(&self) -> bool {
        matches!(self, Self::Refreshed { .. })
    }
}

type SuccessFn = Rc<dyn Fn(NodeId)>;
type FailureFn = Rc<dyn Fn(NodeId, &RefreshError)>;

/// Per-widget completion hooks.
///
/// Each hook fires once per matching widget, after that widget's refresh
/// finished.
#[derive(Clone, Default)]
pub struct RefreshCallbacks {
    on_success: Option<SuccessFn>,
    on_failure: Option<FailureFn>,
}

impl RefreshCallbacks {
    /// No hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with the container after it was re-rendered.
    #[must_use]
    pub fn on_success(mut self, f: impl Fn(NodeId) + 'static) -> Self {
        self.on_success = Some(Rc::new(f));
        self
    }

    /// Called with the container when its refresh failed.
    #[must_use]
    pub fn on_failure(mut self, f: impl Fn(NodeId, &RefreshError) + 'static) -> Self {
        self.on_failure = Some(Rc::new(f));
        self
    }
}

impl fmt::Debug for RefreshCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCallbacks")
            .field("on_success", &self.on_success.is_some())
            .field("on_failure", &self.on_failure.is_some())
            .finish()
    }
}

impl<T: Transport + 'static, P: Prompt + 'static> AttachmentSync<T, P> {
    /// Re-render every widget currently showing `content_id`.
    ///
    /// Spawns one local task per matching widget and returns their handles.
    /// Zero matches is not an error.
    ///
    /// # Panics
    ///
    /// Panics if called outside a [`tokio::task::LocalSet`] while widgets match.
    pub fn refresh(&self, content_id: &ContentId, callbacks: RefreshCallbacks) -> Vec<RefreshHandle> {
        let targets = {
            let doc = self.document();
            self.shared.registry.borrow_mut().lookup(&doc, content_id)
        };
        info!(content_id = %content_id, widgets = targets.len(), "Refreshing widgets");

        targets
            .into_iter()
            .map(|container| {
                let this = self.clone();
                let callbacks = callbacks.clone();
                tokio::task::spawn_local(async move { this.refresh_widget(container, &callbacks).await })
            })
            .collect()
    }

    async fn refresh_widget(&self, container: NodeId, callbacks: &RefreshCallbacks) -> RefreshOutcome {
        let result = match self.fetch_fragment(container).await {
            Ok(fragment) => self.install_fragment(container, &fragment).await.map(|()| fragment),
            Err(e) => Err(e),
        };

        match result {
            Ok(fragment) => {
                debug!(container = ?container, "Widget refreshed");
                if let Some(on_success) = &callbacks.on_success {
                    on_success(container);
                }
                RefreshOutcome::Refreshed { container, fragment }
            }
            Err(error) => {
                warn!(container = ?container, error = %error, "Widget refresh failed");
                if let Some(on_failure) = &callbacks.on_failure {
                    on_failure(container, &error);
                }
                RefreshOutcome::Failed { container, error }
            }
        }
    }

    /// Fetch the widget's fresh inner markup from the render endpoint.
    async fn fetch_fragment(&self, container: NodeId) -> Result<String, RefreshError> {
        let request = {
            let doc = self.document();
            let fieldset = doc
                .children_matching(container, &CONFIG_FIELDSET)
                .into_iter()
                .next();
            let render_params = params::extract_render_params(&doc, fieldset);
            Request::get(self.shared.config.server.render_url())
                .params(render_params.iter())
                .no_cache()
        };

        let body = self.shared.transport.get(request).await?;
        extract_fragment(&body)
    }

    async fn install_fragment(&self, container: NodeId, fragment: &str) -> Result<(), RefreshError> {
        self.fade_out(container).await;
        if !self.document().is_attached(container) {
            return Err(RefreshError::Detached);
        }
        let installed = self.document_mut().set_inner_html(container, fragment);
        if let Err(e) = installed {
            self.document_mut().show(container);
            return Err(e.into());
        }
        self.bind(container);
        self.fade_in(container).await;
        Ok(())
    }
}

/// Inner markup of the first widget container in a render response.
fn extract_fragment(body: &str) -> Result<String, RefreshError> {
    let response = Document::parse(body)?;
    let container = response
        .select_first(response.root(), &TABLE_CONTAINER)
        .ok_or(RefreshError::MissingFragment)?;
    Ok(response.inner_html(container))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_fragment() {
        let body = r#"<html><body>
<div class="wiki-content"><div class="plugin_attachments_table_container"><fieldset><input name="pageId" value="42"></fieldset><table class="tableview attachments"></table></div></div>
</body></html>"#;
        assert_eq!(
            extract_fragment(body).unwrap(),
            r#"<fieldset><input name="pageId" value="42"></fieldset><table class="tableview attachments"></table>"#
        );
    }

    #[test]
    fn test_extract_fragment_missing_container() {
        let err = extract_fragment("<p>Not permitted</p>").unwrap_err();
        assert!(matches!(err, RefreshError::MissingFragment));
    }

    #[test]
    fn test_callbacks_debug() {
        let callbacks = RefreshCallbacks::new().on_success(|_| {});
        assert_eq!(
            format!("{callbacks:?}"),
            "RefreshCallbacks { on_success: true, on_failure: false }"
        );
    }
}
