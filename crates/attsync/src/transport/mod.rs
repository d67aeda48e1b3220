//! Transports used by the sync layer.
//!
//! [`Transport`] covers both asynchronous paths a widget uses: background
//! GET requests (delete, render) and form submission through the out-of-band
//! upload channel.

mod http;
#[cfg(any(test, feature = "mock"))]
mod mock;

use std::future::Future;

use attsync_dom::SelectedFile;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::error::TransportError;

pub use http::HttpTransport;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockResponse, MockTransport};

/// Query component encoding (RFC 3986 unreserved characters stay as-is).
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Cache-busting parameter name.
pub const CACHE_BUSTER: &str = "_";

/// Background GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Target URL, absolute or relative to the server base URL. May carry a query.
    pub url: String,
    /// Extra query parameters.
    pub query: Vec<(String, String)>,
    /// Whether a cache-busting parameter is appended.
    pub no_cache: bool,
}

impl Request {
    /// Create a GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            no_cache: false,
        }
    }

    /// Add a query parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Add several query parameters.
    #[must_use]
    pub fn params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Ask for a fresh response, bypassing caches.
    #[must_use]
    pub fn no_cache(mut self) -> Self {
        self.no_cache = true;
        self
    }

    /// Last value of a query parameter.
    #[must_use]
    pub fn param_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// URL without any query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.url.split_once('?').map_or(&self.url, |(path, _)| path)
    }

    /// Full URL with the query appended.
    ///
    /// `cache_buster` is added as `_=<value>` when the request asks for it.
    #[must_use]
    pub fn to_url(&self, cache_buster: u128) -> String {
        let mut pairs: Vec<(&str, String)> = self
            .query
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect();
        if self.no_cache {
            pairs.push((CACHE_BUSTER, cache_buster.to_string()));
        }
        if pairs.is_empty() {
            return self.url.clone();
        }

        let encoded = pairs
            .iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(k, QUERY_ENCODE_SET),
                    utf8_percent_encode(v, QUERY_ENCODE_SET)
                )
            })
            .collect::<Vec<_>>()
            .join("&");

        let separator = match self.url.rfind('?') {
            None => '?',
            Some(pos) if pos + 1 == self.url.len() || self.url.ends_with('&') => {
                return format!("{}{encoded}", self.url);
            }
            Some(_) => '&',
        };
        format!("{}{separator}{encoded}", self.url)
    }
}

/// Form posted through the out-of-band upload channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmission {
    /// Form `action` URL.
    pub action: String,
    /// Name of the channel the response is delivered to.
    pub target: String,
    /// Text fields in document order.
    pub fields: Vec<(String, String)>,
    /// File fields: input name and the chosen file.
    pub files: Vec<(String, SelectedFile)>,
}

impl FormSubmission {
    /// Value of a text field.
    #[cfg(any(test, feature = "mock"))]
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Asynchronous transport for background calls and channel submissions.
///
/// Both methods resolve to the response body. Futures run on the document's
/// event loop and need not be `Send`.
pub trait Transport {
    /// Issue a background GET request.
    fn get(&self, request: Request) -> impl Future<Output = Result<String, TransportError>>;

    /// Post a form through the out-of-band channel and wait for the channel's
    /// resulting document.
    fn submit_form(
        &self,
        submission: FormSubmission,
    ) -> impl Future<Output = Result<String, TransportError>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_to_url_without_query() {
        let request = Request::get("/pages/render.action");
        assert_eq!(request.to_url(1), "/pages/render.action");
    }

    #[test]
    fn test_to_url_encodes_query() {
        let request = Request::get("/render")
            .param("pageId", "42")
            .param("title", "A & B/é");
        assert_eq!(
            request.to_url(1),
            "/render?pageId=42&title=A%20%26%20B%2F%C3%A9"
        );
    }

    #[test]
    fn test_to_url_appends_to_existing_query() {
        let request = Request::get("/remove.action?pageId=42&fileName=a.txt")
            .param("decorator", "none")
            .no_cache();
        assert_eq!(
            request.to_url(1_700_000_000_000),
            "/remove.action?pageId=42&fileName=a.txt&decorator=none&_=1700000000000"
        );
    }

    #[test]
    fn test_to_url_trailing_question_mark() {
        let request = Request::get("/remove.action?").param("decorator", "none");
        assert_eq!(request.to_url(1), "/remove.action?decorator=none");
    }

    #[test]
    fn test_path_and_param_value() {
        let request = Request::get("/remove.action?id=1")
            .params([("decorator", "page"), ("decorator", "none")]);
        assert_eq!(request.path(), "/remove.action");
        assert_eq!(request.param_value("decorator"), Some("none"));
        assert_eq!(request.param_value("missing"), None);
    }
}
