//! Widget configuration parameters.
//!
//! Every widget renders a hidden `fieldset` of inputs describing itself
//! (content id, output mode, i18n templates). [`extract`] turns that grouping
//! into a [`ParameterSet`]; [`extract_render_params`] keeps only the inputs
//! whitelisted for the macro-render endpoint.

use std::collections::BTreeMap;
use std::fmt;

use attsync_dom::{Document, NodeId};

use crate::selectors::INPUT;

/// Content identifier parameter.
pub const PAGE_ID: &str = "pageId";
/// Output mode parameter (`preview` suppresses uploads).
pub const OUTPUT_TYPE: &str = "outputType";
/// Delete confirmation template parameter, `{0}` is the file name.
pub const DELETE_CONFIRM_MESSAGE: &str = "deleteConfirmMessage";
/// Message shown when a post-upload refresh is rejected.
pub const NOT_PERMITTED_MESSAGE: &str = "i18n-notpermitted";
/// Class marking inputs that may be sent to the render endpoint.
pub const RENDER_PARAM_CLASS: &str = "plugin_attachments_macro_render_param";

/// Identifier of the content item an attachment list displays.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(String);

impl ContentId {
    /// Create a content id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Flat name to value mapping taken from a widget's hidden inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    values: BTreeMap<String, String>,
}

impl ParameterSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value for `name`.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no contextual metadata is available.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The widget's content id, if present and non-empty.
    #[must_use]
    pub fn content_id(&self) -> Option<ContentId> {
        self.get(PAGE_ID)
            .filter(|id| !id.is_empty())
            .map(ContentId::from)
    }

    /// Configured output mode.
    #[must_use]
    pub fn output_type(&self) -> Option<&str> {
        self.get(OUTPUT_TYPE)
    }

    /// Whether the widget is rendered in preview mode.
    #[must_use]
    pub fn is_preview(&self) -> bool {
        self.output_type() == Some("preview")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

/// Collect `name -> value` for every named input under `fieldset`.
///
/// Last write wins when names collide. A missing grouping yields an empty set.
#[must_use]
pub fn extract(doc: &Document, fieldset: Option<NodeId>) -> ParameterSet {
    collect(doc, fieldset, |_| true)
}

/// Like [`extract`], but keeps only inputs marked as render parameters.
///
/// Everything else in the grouping (i18n strings, in-progress form state)
/// stays out of the render request.
#[must_use]
pub fn extract_render_params(doc: &Document, fieldset: Option<NodeId>) -> ParameterSet {
    collect(doc, fieldset, |input| doc.has_class(input, RENDER_PARAM_CLASS))
}

fn collect(
    doc: &Document,
    fieldset: Option<NodeId>,
    keep: impl Fn(NodeId) -> bool,
) -> ParameterSet {
    let Some(fieldset) = fieldset else {
        return ParameterSet::new();
    };
    doc.select(fieldset, &INPUT)
        .into_iter()
        .filter(|&input| keep(input))
        .filter_map(|input| {
            let name = doc.attr(input, "name").filter(|n| !n.is_empty())?;
            Some((name, doc.value(input)))
        })
        .collect()
}
