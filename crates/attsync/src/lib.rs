//! Attachment widget synchronization.
//!
//! A page can embed several attachment-list widgets showing the same content
//! item. [`AttachmentSync`] keeps them consistent after a delete or an upload
//! performed through any one of them:
//!
//! - [`AttachmentSync::bind`] wires a widget's delete links and toggles
//! - [`AttachmentSync::refresh`] re-renders every widget showing a content id
//! - [`AttachmentSync::init_upload_form`] drives uploads through the
//!   out-of-band channel and reports the outcome inline
//!
//! Everything runs on one thread. Events are delivered with
//! [`AttachmentSync::dispatch`] from inside a [`tokio::task::LocalSet`].
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use attsync::{AttachmentSync, HttpTransport};
//! use attsync_config::Config;
//! use attsync_dom::Document;
//!
//! let html = r#"
//! <div class="plugin_attachments_table_container">
//!   <fieldset><input type="hidden" name="pageId" value="42"></fieldset>
//! </div>"#;
//! let document = Rc::new(RefCell::new(Document::parse(html).unwrap()));
//! let config = Config::default();
//! let sync = AttachmentSync::new(
//!     Rc::clone(&document),
//!     HttpTransport::new(&config),
//!     |message: &str| !message.is_empty(),
//!     config,
//! );
//!
//! let summary = sync.init();
//! assert_eq!(summary.widgets, 1);
//! ```

mod binder;
mod broadcast;
mod error;
mod events;
mod message;
pub mod params;
mod prompt;
mod registry;
mod selectors;
mod sync;
pub mod transport;
mod upload;

pub use broadcast::{RefreshCallbacks, RefreshHandle, RefreshOutcome};
pub use error::{ActionError, RefreshError, SyncError, TransportError};
pub use events::UiEvent;
pub use message::format_message;
pub use params::{ContentId, ParameterSet};
#[cfg(any(test, feature = "mock"))]
pub use prompt::MockPrompt;
pub use prompt::Prompt;
pub use sync::{AttachmentSync, Dispatch, InitSummary};
#[cfg(any(test, feature = "mock"))]
pub use transport::{MockResponse, MockTransport};
pub use transport::{FormSubmission, HttpTransport, Request, Transport};
pub use upload::{HINT_CLASS, Notice, UploadPhase, UploadView};
