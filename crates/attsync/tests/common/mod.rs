//! Shared page fixture for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use attsync::{AttachmentSync, MockPrompt, MockResponse, MockTransport, Request};
use attsync_config::Config;
use attsync_dom::{Document, NodeId, Selector};

pub const REMOVE_PATH: &str = "/pages/removeattachment.action";
pub const RENDER_PATH: &str = "/pages/plugins/attachments/rendermacro.action";

/// Hidden configuration grouping of one widget.
fn fieldset(page_id: &str, output_type: &str) -> String {
    format!(
        r#"<fieldset class="hidden">
      <input type="hidden" name="pageId" value="{page_id}" class="plugin_attachments_macro_render_param">
      <input type="hidden" name="sortBy" value="date" class="plugin_attachments_macro_render_param">
      <input type="hidden" name="outputType" value="{output_type}">
      <input type="hidden" name="deleteConfirmMessage" value="Delete {{0}}?">
      <input type="hidden" name="i18n-notpermitted" value="Not permitted.">
    </fieldset>"#
    )
}

fn table(page_id: &str, file: &str) -> String {
    format!(
        r##"<table class="tableview attachments">
      <tr>
        <td class="filename" data-filename="{file}">{file}</td>
        <td class="attachment-history"><a href="#" data-attachment-id="{page_id}-1">2</a></td>
        <td><a class="removeAttachmentLink" href="{REMOVE_PATH}?pageId={page_id}&amp;fileName={file}">Remove</a></td>
      </tr>
      <tr class="attachment-history-row hidden" data-attachment-id="{page_id}-1"><td>version 1</td></tr>
    </table>"##
    )
}

fn widget(id: &str, page_id: &str, file: &str, output_type: &str) -> String {
    format!(
        r#"<div class="plugin_attachments_table_container" id="{id}">
    {}
    {}
  </div>"#,
        fieldset(page_id, output_type),
        table(page_id, file)
    )
}

fn upload_container(channel: &str, page_id: &str) -> String {
    format!(
        r#"<div class="plugin_attachments_upload_container">
    <div class="errorBox hidden"></div>
    <div class="successBox hidden">Upload complete.</div>
    <form class="plugin_attachments_uploadform" action="/pages/doattachfile.action?pageId={page_id}" method="post" enctype="multipart/form-data">
      <iframe class="plugin_attachments_uploadiframe hidden" name="{channel}"></iframe>
      <input type="file" name="file_0">
      <input type="text" name="comment_0" class="blank-search" value="Comment...">
      <input type="submit" name="confirm" value="Attach">
    </form>
  </div>"#
    )
}

/// Page with widgets A and B on content 42, widget C on content 7, and an
/// upload form belonging to A.
pub fn page(output_type: &str) -> String {
    format!(
        r#"<html><body>
<div class="wiki-content">
  {}
  {}
  {}
  {}
</div>
</body></html>"#,
        widget("widget-a", "42", "report.pdf", output_type),
        upload_container("channel-a", "42"),
        widget("widget-b", "42", "report.pdf", "file"),
        widget("widget-c", "7", "notes.txt", "file"),
    )
}

/// Render endpoint response for the content in `request`.
pub fn render_response(request: &Request) -> MockResponse {
    let page_id = request.param_value("pageId").unwrap_or_default();
    MockResponse::ok(format!(
        r#"<html><body>
<div class="plugin_attachments_table_container">{}{}</div>
</body></html>"#,
        fieldset(page_id, "file"),
        table(page_id, "fresh.txt")
    ))
}

pub struct Fixture {
    pub document: Rc<RefCell<Document>>,
    pub transport: MockTransport,
    pub prompt: MockPrompt,
    pub sync: AttachmentSync<MockTransport, MockPrompt>,
}

impl Fixture {
    pub fn new(html: &str, confirm: bool) -> Self {
        let document = Rc::new(RefCell::new(Document::parse(html).unwrap()));
        let transport = MockTransport::new();
        let prompt = MockPrompt::answering(confirm);
        let sync = AttachmentSync::new(
            Rc::clone(&document),
            transport.clone(),
            prompt.clone(),
            Config::default(),
        );
        Self {
            document,
            transport,
            prompt,
            sync,
        }
    }

    pub fn find(&self, selector: &str) -> NodeId {
        self.find_all(selector)
            .into_iter()
            .next()
            .unwrap_or_else(|| panic!("no element matches {selector}"))
    }

    pub fn find_all(&self, selector: &str) -> Vec<NodeId> {
        let selector = Selector::parse(selector).unwrap();
        let doc = self.document.borrow();
        doc.select(doc.root(), &selector)
    }

    pub fn html(&self) -> String {
        let doc = self.document.borrow();
        doc.outer_html(doc.root())
    }

    pub fn text(&self, node: NodeId) -> String {
        self.document.borrow().text(node)
    }

    pub fn inner_html(&self, node: NodeId) -> String {
        self.document.borrow().inner_html(node)
    }

    pub fn is_hidden(&self, node: NodeId) -> bool {
        self.document.borrow().is_hidden(node)
    }

    pub fn value(&self, node: NodeId) -> String {
        self.document.borrow().value(node).to_owned()
    }
}
