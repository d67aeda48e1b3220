//! Error types for the document model.

/// Error while parsing markup or selectors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DomError {
    /// Markup could not be tokenized.
    #[error("HTML parse error")]
    Parse(#[from] quick_xml::Error),

    /// Encoding error while decoding text or names.
    #[error("encoding error")]
    Encoding(#[from] quick_xml::encoding::EncodingError),

    /// Invalid selector syntax.
    #[error("invalid selector {selector:?}: {message}")]
    Selector {
        /// Selector source text.
        selector: String,
        /// What went wrong.
        message: &'static str,
    },
}
