//! Upload lifecycle through the out-of-band channel.

mod common;

use attsync::{MockResponse, Notice, SyncError, UiEvent, UploadPhase, UploadView};
use attsync_dom::SelectedFile;
use common::{Fixture, RENDER_PATH, page, render_response};
use pretty_assertions::assert_eq;
use tokio::task::LocalSet;

const FORM: &str = "form.plugin_attachments_uploadform";
const CHANNEL: &str = "iframe.plugin_attachments_uploadiframe";
const SUBMIT: &str = "input[name='confirm']";
const SPINNER: &str = "img.plugin_attachments_uploadwaiticon";
const ERROR_BOX: &str = "div.plugin_attachments_upload_container > div.errorBox";
const SUCCESS_BOX: &str = "div.plugin_attachments_upload_container > div.successBox";

fn choose_file(fixture: &Fixture) {
    let input = fixture.find("input[name='file_0']");
    fixture.document.borrow_mut().select_files(
        input,
        vec![SelectedFile {
            name: "diagram.png".to_owned(),
            content_type: "image/png".to_owned(),
            data: vec![0x89, 0x50, 0x4e, 0x47],
        }],
    );
}

#[test]
fn test_init_inserts_hidden_spinner_after_submit() {
    let fixture = Fixture::new(&page("file"), true);
    fixture.sync.init();

    let spinners = fixture.find_all(SPINNER);
    assert_eq!(spinners.len(), 1);
    assert!(fixture.is_hidden(spinners[0]));
    assert!(!fixture.is_hidden(fixture.find(SUBMIT)));

    let doc = fixture.document.borrow();
    assert_eq!(doc.prev_element_sibling(spinners[0]), Some(fixture.find(SUBMIT)));
    assert_eq!(doc.attr(spinners[0], "src"), Some("/images/icons/wait.gif"));
}

#[test]
fn test_reinit_reuses_spinner() {
    let fixture = Fixture::new(&page("file"), true);
    fixture.sync.init();
    fixture.sync.init_upload_form(fixture.find(FORM)).unwrap();

    assert_eq!(fixture.find_all(SPINNER).len(), 1);
    assert_eq!(fixture.sync.handler_count(fixture.find(FORM)), 1);
}

#[test]
fn test_form_without_channel_is_rejected() {
    let fixture = Fixture::new(
        r#"<div><form class="plugin_attachments_uploadform"><input type="submit" name="confirm"></form></div>"#,
        true,
    );

    let summary = fixture.sync.init();
    assert_eq!(summary.forms, 0);
    assert!(matches!(
        fixture.sync.init_upload_form(fixture.find(FORM)),
        Err(SyncError::MissingElement(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_focus_clears_comment_hint() {
    let fixture = Fixture::new(&page("file"), true);
    fixture.sync.init();
    let comment = fixture.find("input[name='comment_0']");
    assert_eq!(fixture.value(comment), "Comment...");

    LocalSet::new()
        .run_until(fixture.sync.dispatch(comment, UiEvent::Focus))
        .await;

    assert_eq!(fixture.value(comment), "");
    assert!(!fixture.document.borrow().has_class(comment, "blank-search"));
}

#[tokio::test(start_paused = true)]
async fn test_preview_mode_never_submits() {
    let fixture = Fixture::new(&page("preview"), true);
    fixture.sync.init();
    let form = fixture.find(FORM);
    let before = fixture.html();

    let dispatch = LocalSet::new()
        .run_until(fixture.sync.dispatch(form, UiEvent::Submit))
        .await;

    assert!(dispatch.default_prevented);
    assert!(fixture.transport.submissions().is_empty());
    assert!(fixture.transport.requests().is_empty());
    assert_eq!(fixture.html(), before);
    assert_eq!(fixture.sync.upload_view(form), Some(UploadView::default()));
}

#[tokio::test(start_paused = true)]
async fn test_unflagged_channel_load_is_ignored() {
    let fixture = Fixture::new(&page("file"), true);
    fixture.sync.init();
    let form = fixture.find(FORM);
    let channel = fixture.find(CHANNEL);
    let before = fixture.html();

    let dispatch = LocalSet::new()
        .run_until(fixture.sync.dispatch(
            channel,
            UiEvent::Load(r#"<div class="errorBox">Stale error</div>"#.to_owned()),
        ))
        .await;

    assert!(dispatch.refreshes.is_empty());
    assert_eq!(fixture.html(), before);
    assert!(fixture.transport.requests().is_empty());
    assert_eq!(fixture.sync.upload_view(form), Some(UploadView::default()));
}

#[tokio::test(start_paused = true)]
async fn test_channel_error_box_is_copied_to_form() {
    let fixture = Fixture::new(&page("file"), true);
    fixture.transport.respond_to_upload(MockResponse::ok(
        r#"<html><body><div class="errorBox">File <b>diagram.png</b> is too large.</div></body></html>"#,
    ));
    fixture.sync.init();
    choose_file(&fixture);
    let form = fixture.find(FORM);

    let dispatch = LocalSet::new()
        .run_until(fixture.sync.dispatch(form, UiEvent::Submit))
        .await;

    assert!(!dispatch.default_prevented);
    assert!(dispatch.refreshes.is_empty());

    let submissions = fixture.transport.submissions();
    assert_eq!(submissions.len(), 1);
    let submission = &submissions[0];
    assert_eq!(submission.action, "/pages/doattachfile.action?pageId=42");
    assert_eq!(submission.target, "channel-a");
    assert_eq!(submission.field("comment_0"), Some(""));
    assert_eq!(submission.files.len(), 1);
    assert_eq!(submission.files[0].0, "file_0");
    assert_eq!(submission.files[0].1.name, "diagram.png");
    assert_eq!(
        fixture.document.borrow().attr(form, "target"),
        Some("channel-a")
    );

    let error_box = fixture.find(ERROR_BOX);
    assert_eq!(
        fixture.inner_html(error_box),
        "File <b>diagram.png</b> is too large."
    );
    assert!(!fixture.is_hidden(error_box));
    assert!(fixture.is_hidden(fixture.find(SUCCESS_BOX)));
    assert!(fixture.is_hidden(fixture.find(SPINNER)));
    assert!(!fixture.is_hidden(fixture.find(SUBMIT)));
    assert!(fixture.transport.requests().is_empty());

    assert_eq!(
        fixture.sync.upload_view(form),
        Some(UploadView {
            phase: UploadPhase::Idle,
            notice: Notice::Error("File <b>diagram.png</b> is too large.".to_owned()),
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_successful_upload_refreshes_and_reports_success() {
    let fixture = Fixture::new(&page("file"), true);
    fixture
        .transport
        .respond_to_upload(MockResponse::ok("<html><body><p>Done</p></body></html>"));
    fixture.transport.respond_with(RENDER_PATH, render_response);
    fixture.sync.init();
    choose_file(&fixture);
    let form = fixture.find(FORM);
    let widget_c = fixture.find("div[id='widget-c']");
    let untouched_c = fixture.inner_html(widget_c);

    LocalSet::new()
        .run_until(async {
            let dispatch = fixture.sync.dispatch(form, UiEvent::Submit).await;
            assert_eq!(dispatch.refreshes.len(), 2);

            // Spinner stays up while the widgets refresh.
            let view = fixture.sync.upload_view(form).unwrap();
            assert_eq!(view.phase, UploadPhase::Succeeded);
            assert!(!fixture.is_hidden(fixture.find(SPINNER)));
            assert!(fixture.is_hidden(fixture.find(SUBMIT)));

            for handle in dispatch.refreshes {
                assert!(handle.await.unwrap().is_refreshed());
            }
        })
        .await;

    let renders = fixture.transport.requests_to(RENDER_PATH);
    assert_eq!(renders.len(), 2);
    assert!(
        renders
            .iter()
            .all(|r| r.param_value("pageId") == Some("42"))
    );
    assert!(fixture.text(fixture.find("div[id='widget-a']")).contains("fresh.txt"));
    assert!(fixture.text(fixture.find("div[id='widget-b']")).contains("fresh.txt"));
    assert_eq!(fixture.inner_html(widget_c), untouched_c);

    assert!(fixture.is_hidden(fixture.find(ERROR_BOX)));
    assert!(!fixture.is_hidden(fixture.find(SUCCESS_BOX)));
    assert!(fixture.is_hidden(fixture.find(SPINNER)));
    assert!(!fixture.is_hidden(fixture.find(SUBMIT)));
    assert_eq!(
        fixture.sync.upload_view(form),
        Some(UploadView {
            phase: UploadPhase::Idle,
            notice: Notice::Success,
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_rejected_refresh_shows_not_permitted() {
    let fixture = Fixture::new(&page("file"), true);
    fixture
        .transport
        .respond_to_upload(MockResponse::ok("<html><body></body></html>"));
    fixture.transport.respond(RENDER_PATH, MockResponse::Status(403));
    fixture.sync.init();
    let form = fixture.find(FORM);
    let widget_a = fixture.find("div[id='widget-a']");
    let before_a = fixture.inner_html(widget_a);

    LocalSet::new()
        .run_until(async {
            let dispatch = fixture.sync.dispatch(form, UiEvent::Submit).await;
            for handle in dispatch.refreshes {
                assert!(!handle.await.unwrap().is_refreshed());
            }
        })
        .await;

    let error_box = fixture.find(ERROR_BOX);
    assert_eq!(fixture.inner_html(error_box), "Not permitted.");
    assert!(!fixture.is_hidden(error_box));
    assert!(fixture.is_hidden(fixture.find(SUCCESS_BOX)));
    assert!(fixture.is_hidden(fixture.find(SPINNER)));
    assert!(!fixture.is_hidden(fixture.find(SUBMIT)));
    assert_eq!(fixture.inner_html(widget_a), before_a);
}

#[tokio::test(start_paused = true)]
async fn test_channel_load_consumed_once() {
    let fixture = Fixture::new(&page("file"), true);
    fixture.transport.respond_to_upload(MockResponse::ok(
        r#"<div class="errorBox">Quota exceeded</div>"#,
    ));
    fixture.sync.init();
    let form = fixture.find(FORM);
    let channel = fixture.find(CHANNEL);

    let local = LocalSet::new();
    local
        .run_until(fixture.sync.dispatch(form, UiEvent::Submit))
        .await;
    let after_upload = fixture.html();

    // The browser-side load event for the same response arrives late.
    local
        .run_until(fixture.sync.dispatch(
            channel,
            UiEvent::Load(r#"<div class="errorBox">Something else</div>"#.to_owned()),
        ))
        .await;

    assert_eq!(fixture.html(), after_upload);
}

#[tokio::test(start_paused = true)]
async fn test_failed_channel_transport_reports_error() {
    let fixture = Fixture::new(&page("file"), true);
    fixture.transport.respond_to_upload(MockResponse::ConnectionFailed);
    fixture.sync.init();
    let form = fixture.find(FORM);

    LocalSet::new()
        .run_until(fixture.sync.dispatch(form, UiEvent::Submit))
        .await;

    let error_box = fixture.find(ERROR_BOX);
    assert_eq!(fixture.inner_html(error_box), "Not permitted.");
    assert!(!fixture.is_hidden(error_box));
    assert!(!fixture.is_hidden(fixture.find(SUBMIT)));
    assert!(fixture.transport.requests().is_empty());

    // The form is usable again.
    fixture
        .transport
        .respond_to_upload(MockResponse::ok("<html><body></body></html>"));
    fixture.transport.respond_with(RENDER_PATH, render_response);
    LocalSet::new()
        .run_until(async {
            let dispatch = fixture.sync.dispatch(form, UiEvent::Submit).await;
            for handle in dispatch.refreshes {
                handle.await.unwrap();
            }
        })
        .await;
    assert_eq!(fixture.transport.submissions().len(), 2);
    assert!(!fixture.is_hidden(fixture.find(SUCCESS_BOX)));
}
