//! Live document model for attsync.
//!
//! A small mutable HTML tree standing in for the browser DOM that attachment
//! widgets live in:
//!
//! - [`Document`]: arena of element and text nodes addressed by [`NodeId`]
//! - [`Selector`]: the CSS subset used to locate widget parts
//! - lenient HTML parsing (quick-xml based) and serialization
//!
//! # Example
//!
//! ```
//! use attsync_dom::{Document, Selector};
//!
//! let mut doc = Document::parse(r#"<div class="box"><p>old</p></div>"#).unwrap();
//! let box_sel = Selector::parse("div.box").unwrap();
//! let div = doc.select_first(doc.root(), &box_sel).unwrap();
//!
//! doc.set_inner_html(div, "<p>new</p>").unwrap();
//! assert_eq!(doc.inner_html(div), "<p>new</p>");
//! ```

mod document;
mod entities;
mod error;
mod parser;
mod selector;
mod serializer;

pub use document::{Document, HIDDEN_CLASS, NodeId, SelectedFile};
pub use error::DomError;
pub use selector::Selector;
