//! Selectors for the attachment widget markup.

use std::sync::LazyLock;

use attsync_dom::Selector;

macro_rules! selectors {
    ($($(#[$meta:meta])* $name:ident = $source:literal;)*) => {
        $(
            $(#[$meta])*
            pub(crate) static $name: LazyLock<Selector> =
                LazyLock::new(|| Selector::parse($source).expect("invalid widget selector"));
        )*
    };
}

selectors! {
    /// Region holding one rendered attachment list.
    TABLE_CONTAINER = "div.plugin_attachments_table_container";
    /// Hidden configuration grouping, a direct child of the container.
    CONFIG_FIELDSET = "fieldset";
    INPUT = "input";
    PAGE_ID_INPUT = "input[name='pageId']";
    ATTACHMENT_TABLE = "table.tableview.attachments";
    REMOVE_LINK = "a.removeAttachmentLink";
    ROW = "tr";
    FILENAME = ".filename";
    HISTORY_LINK = ".attachment-history a";
    HISTORY_ROW = "tr.attachment-history-row";
    MENU_ITEM = ".attachment-menu-bar .ajs-menu-item";
    DROP_DOWN = ".ajs-drop-down";

    UPLOAD_FORM = "form.plugin_attachments_uploadform";
    /// Hidden frame the upload form posts into.
    UPLOAD_CHANNEL = "iframe.plugin_attachments_uploadiframe";
    SUBMIT_BUTTON = "input[name='confirm']";
    WAIT_ICON = "img.plugin_attachments_uploadwaiticon";
    COMMENT_FIELD = "input[name^='comment_']";
    FORM_FIELD = "input[name]";
    TEXTAREA = "textarea[name]";
    ERROR_BOX = "div.errorBox";
    SUCCESS_BOX = "div.successBox";
}
