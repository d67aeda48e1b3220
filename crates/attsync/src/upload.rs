//! Upload lifecycle over the out-of-band channel.
//!
//! Each upload form posts into a hidden channel and learns the outcome from
//! the document the channel loads. The form's visible state (spinner or
//! submit control, error or success notice) is derived from an
//! [`UploadView`] by a single render function.

use attsync_dom::{Document, NodeId};
use tracing::{debug, info, warn};

use crate::broadcast::{RefreshCallbacks, RefreshHandle};
use crate::error::{ActionError, SyncError, TransportError};
use crate::events::{EventKind, Handler};
use crate::params::{self, NOT_PERMITTED_MESSAGE, ParameterSet};
use crate::prompt::Prompt;
use crate::selectors::{
    COMMENT_FIELD, CONFIG_FIELDSET, ERROR_BOX, FORM_FIELD, SUBMIT_BUTTON, SUCCESS_BOX,
    TABLE_CONTAINER, TEXTAREA, UPLOAD_CHANNEL, WAIT_ICON,
};
use crate::sync::AttachmentSync;
use crate::transport::{FormSubmission, Transport};

/// Class marking a comment field that still shows its hint text.
pub const HINT_CLASS: &str = "blank-search";

/// Where an upload form is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadPhase {
    /// Ready for a submission.
    #[default]
    Idle,
    /// Submission accepted, form being posted.
    Submitting,
    /// Posted, waiting for the channel to load the response.
    AwaitingChannelResponse,
    /// Channel reported success, widgets are refreshing.
    Succeeded,
    /// Channel reported an error.
    Failed,
}

impl UploadPhase {
    /// Whether `next` is a legal successor of this phase.
    pub fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Submitting)
                | (Self::Submitting, Self::AwaitingChannelResponse)
                | (
                    Self::AwaitingChannelResponse,
                    Self::Succeeded | Self::Failed
                )
                | (_, Self::Idle)
        )
    }
}

/// Message box shown next to the form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Notice {
    /// Leave both boxes as they are.
    #[default]
    None,
    /// Error box with the given markup, success box hidden.
    Error(String),
    /// Success box shown, error box hidden.
    Success,
}

/// Everything the form's visible state is rendered from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadView {
    /// Lifecycle phase.
    pub phase: UploadPhase,
    /// Current notice.
    pub notice: Notice,
}

impl UploadView {
    /// The spinner replaces the submit control while an upload is in flight.
    pub fn spinner_visible(&self) -> bool {
        matches!(
            self.phase,
            UploadPhase::Submitting | UploadPhase::AwaitingChannelResponse | UploadPhase::Succeeded
        )
    }

    /// Exactly one of spinner and submit control is visible.
    pub fn submit_visible(&self) -> bool {
        !self.spinner_visible()
    }
}

/// Per-form state.
#[derive(Debug)]
pub(crate) struct UploadSession {
    channel: NodeId,
    submit: NodeId,
    spinner: NodeId,
    params: ParameterSet,
    /// Set on submission, consumed by the next channel load.
    expecting: bool,
    attempt: u64,
    view: UploadView,
}

impl UploadSession {
    fn advance(&mut self, next: UploadPhase) {
        if self.view.phase.can_advance_to(next) {
            self.view.phase = next;
        } else {
            warn!(from = ?self.view.phase, to = ?next, "Ignoring invalid upload transition");
        }
    }
}

/// How a submit event was handled.
#[derive(Debug)]
pub(crate) enum SubmitOutcome {
    /// Nothing was sent: preview mode, unknown form or upload in flight.
    Suppressed,
    /// Form was posted; carries the refreshes started on success.
    Submitted(Vec<RefreshHandle>),
}

impl<T: Transport + 'static, P: Prompt + 'static> AttachmentSync<T, P> {
    /// Wire an upload form to its channel.
    ///
    /// The form must contain an `iframe.plugin_attachments_uploadiframe`
    /// child and an `input[name=confirm]` submit control. A spinner is
    /// inserted after the submit control unless one is already there. The
    /// form's parameters come from the widget container preceding the
    /// form's parent.
    pub fn init_upload_form(&self, form: NodeId) -> Result<(), SyncError> {
        let mut doc = self.document_mut();
        let mut bindings = self.shared.bindings.borrow_mut();

        let channel = doc
            .children_matching(form, &UPLOAD_CHANNEL)
            .into_iter()
            .next()
            .ok_or(SyncError::MissingElement("its upload channel"))?;
        let submit = doc
            .select_first(form, &SUBMIT_BUTTON)
            .ok_or(SyncError::MissingElement("its submit control"))?;

        let spinner = match doc.select_first(form, &WAIT_ICON) {
            Some(existing) => existing,
            None => {
                let spinner = doc.create_element("img");
                doc.set_attr(spinner, "src", &self.shared.config.server.wait_icon_url());
                doc.set_attr(spinner, "class", "plugin_attachments_uploadwaiticon");
                doc.insert_after(submit, spinner);
                spinner
            }
        };

        let fieldset = doc
            .parent_element(form)
            .and_then(|parent| doc.prev_element_sibling(parent))
            .filter(|&sibling| TABLE_CONTAINER.matches(&doc, sibling))
            .and_then(|container| {
                doc.children_matching(container, &CONFIG_FIELDSET)
                    .into_iter()
                    .next()
            });
        let params = params::extract(&doc, fieldset);
        if params.content_id().is_none() {
            warn!("Upload form has no widget parameters");
        }

        for field in doc.select(form, &COMMENT_FIELD) {
            bindings.off(field);
            bindings.on(field, EventKind::Focus, Handler::ClearHint);
        }
        bindings.off(form);
        bindings.on(form, EventKind::Submit, Handler::Upload { form });
        bindings.off(channel);
        bindings.on(channel, EventKind::Load, Handler::ChannelLoad { form });

        let session = UploadSession {
            channel,
            submit,
            spinner,
            params,
            expecting: false,
            attempt: 0,
            view: UploadView::default(),
        };
        render(&mut doc, form, &session);
        debug!(form = ?form, content_id = ?session.params.content_id(), "Upload form initialized");
        self.shared.uploads.borrow_mut().insert(form, session);
        Ok(())
    }

    /// Current view state of an initialized upload form.
    pub fn upload_view(&self, form: NodeId) -> Option<UploadView> {
        self.shared
            .uploads
            .borrow()
            .get(&form)
            .map(|session| session.view.clone())
    }

    pub(crate) async fn submit_upload(&self, form: NodeId) -> SubmitOutcome {
        let submission = {
            let mut doc = self.document_mut();
            let mut uploads = self.shared.uploads.borrow_mut();
            let Some(session) = uploads.get_mut(&form) else {
                warn!(form = ?form, "Submit on uninitialized upload form");
                return SubmitOutcome::Suppressed;
            };
            if session.params.is_preview() {
                debug!("Upload suppressed in preview mode");
                return SubmitOutcome::Suppressed;
            }
            if session.view.phase != UploadPhase::Idle {
                debug!(phase = ?session.view.phase, "Upload already in progress");
                return SubmitOutcome::Suppressed;
            }

            for field in doc.select(form, &COMMENT_FIELD) {
                clear_hint(&mut doc, field);
            }
            let target = doc.attr(session.channel, "name").unwrap_or_default().to_owned();
            doc.set_attr(form, "target", &target);

            session.advance(UploadPhase::Submitting);
            session.expecting = true;
            session.attempt += 1;
            render(&mut doc, form, session);

            let submission = form_submission(&doc, form, target);
            session.advance(UploadPhase::AwaitingChannelResponse);
            submission
        };

        info!(
            action = %submission.action,
            files = submission.files.len(),
            "Uploading attachments"
        );
        let result = self.shared.transport.submit_form(submission).await;
        SubmitOutcome::Submitted(self.channel_loaded(form, result))
    }

    /// Handle the channel finishing a load.
    ///
    /// Loads not preceded by a submission are ignored. An error box in the
    /// channel document fails the upload; anything else refreshes every
    /// widget showing the form's content and reports through the notices.
    pub(crate) fn channel_loaded(
        &self,
        form: NodeId,
        result: Result<String, TransportError>,
    ) -> Vec<RefreshHandle> {
        let (content_id, attempt, not_permitted) = {
            let mut doc = self.document_mut();
            let mut uploads = self.shared.uploads.borrow_mut();
            let Some(session) = uploads.get_mut(&form) else {
                return Vec::new();
            };
            if !session.expecting {
                debug!(form = ?form, "Ignoring channel load without pending upload");
                return Vec::new();
            }
            session.expecting = false;

            if let Err(e) = classify(result) {
                warn!(error = %e, "Upload failed");
                let html = match e {
                    ActionError::Application(html) => html,
                    _ => self.not_permitted_message(&session.params),
                };
                session.advance(UploadPhase::Failed);
                session.view.notice = Notice::Error(html);
                render(&mut doc, form, session);
                session.advance(UploadPhase::Idle);
                render(&mut doc, form, session);
                return Vec::new();
            }

            session.advance(UploadPhase::Succeeded);
            render(&mut doc, form, session);
            (
                session.params.content_id(),
                session.attempt,
                self.not_permitted_message(&session.params),
            )
        };

        let Some(content_id) = content_id else {
            self.finish_upload(form, attempt, Notice::Success);
            return Vec::new();
        };

        let on_success = self.clone();
        let on_failure = self.clone();
        let callbacks = RefreshCallbacks::new()
            .on_success(move |_| on_success.finish_upload(form, attempt, Notice::Success))
            .on_failure(move |_, _| {
                on_failure.finish_upload(form, attempt, Notice::Error(not_permitted.clone()));
            });
        let handles = self.refresh(&content_id, callbacks);
        if handles.is_empty() {
            self.finish_upload(form, attempt, Notice::Success);
        }
        handles
    }

    /// Settle the form after a refresh reported back for `attempt`.
    fn finish_upload(&self, form: NodeId, attempt: u64, notice: Notice) {
        let mut doc = self.document_mut();
        let mut uploads = self.shared.uploads.borrow_mut();
        let Some(session) = uploads.get_mut(&form) else {
            return;
        };
        if session.attempt != attempt {
            debug!(form = ?form, attempt, "Ignoring stale upload completion");
            return;
        }
        session.view.notice = notice;
        session.advance(UploadPhase::Idle);
        render(&mut doc, form, session);
    }

    fn not_permitted_message(&self, params: &ParameterSet) -> String {
        params
            .get(NOT_PERMITTED_MESSAGE)
            .unwrap_or(self.shared.config.messages.not_permitted.as_str())
            .to_owned()
    }
}

/// Drop the hint text of a comment field the user never edited.
pub(crate) fn clear_hint(doc: &mut Document, field: NodeId) {
    if doc.has_class(field, HINT_CLASS) {
        doc.remove_class(field, HINT_CLASS);
        doc.set_value(field, "");
    }
}

/// Decide whether the channel document reports a failure.
fn classify(result: Result<String, TransportError>) -> Result<(), ActionError> {
    let body = match result {
        Ok(body) => body,
        Err(TransportError::Status { status, body }) => {
            if let Some(html) = error_box_html(&body) {
                return Err(ActionError::Application(html));
            }
            return Err(TransportError::Status { status, body }.into());
        }
        Err(e) => return Err(e.into()),
    };
    match error_box_html(&body) {
        Some(html) => Err(ActionError::Application(html)),
        None => Ok(()),
    }
}

/// Non-blank content of the first error box in `body`.
fn error_box_html(body: &str) -> Option<String> {
    let doc = match Document::parse(body) {
        Ok(doc) => doc,
        Err(e) => {
            debug!(error = %e, "Channel document is not parseable");
            return None;
        }
    };
    let error_box = doc.select_first(doc.root(), &ERROR_BOX)?;
    let html = doc.inner_html(error_box);
    (!html.trim().is_empty()).then_some(html)
}

/// Collect the fields a browser would post for `form`.
fn form_submission(doc: &Document, form: NodeId, target: String) -> FormSubmission {
    let mut fields = Vec::new();
    let mut files = Vec::new();

    for node in doc.descendants(form) {
        if TEXTAREA.matches(doc, node) {
            let name = doc.attr(node, "name").unwrap_or_default();
            fields.push((name.to_owned(), doc.text(node)));
            continue;
        }
        if !FORM_FIELD.matches(doc, node) {
            continue;
        }
        let name = doc.attr(node, "name").unwrap_or_default();
        let kind = doc
            .attr(node, "type")
            .unwrap_or("text")
            .to_ascii_lowercase();
        match kind.as_str() {
            "file" => {
                for file in doc.files(node) {
                    files.push((name.to_owned(), file.clone()));
                }
            }
            "checkbox" | "radio" if doc.attr(node, "checked").is_none() => {}
            "button" | "reset" | "image" => {}
            _ => fields.push((name.to_owned(), doc.value(node).to_owned())),
        }
    }

    FormSubmission {
        action: doc.attr(form, "action").unwrap_or_default().to_owned(),
        target,
        fields,
        files,
    }
}

/// Apply `session`'s view to the form's controls and notice boxes.
fn render(doc: &mut Document, form: NodeId, session: &UploadSession) {
    let spinner = session.view.spinner_visible();
    doc.set_visible(session.spinner, spinner);
    doc.set_visible(session.submit, !spinner);

    let Some(parent) = doc.parent_element(form) else {
        return;
    };
    let error_boxes = doc.children_matching(parent, &ERROR_BOX);
    let success_boxes = doc.children_matching(parent, &SUCCESS_BOX);

    match &session.view.notice {
        Notice::None => {}
        Notice::Error(html) => {
            for &error_box in &error_boxes {
                if doc.set_inner_html(error_box, html).is_err() {
                    doc.set_text(error_box, html);
                }
                doc.show(error_box);
            }
            for &success_box in &success_boxes {
                doc.hide(success_box);
            }
        }
        Notice::Success => {
            for &error_box in &error_boxes {
                doc.hide(error_box);
            }
            for &success_box in &success_boxes {
                doc.show(success_box);
            }
        }
    }
}
