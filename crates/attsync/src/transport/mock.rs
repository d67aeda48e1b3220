//! Scripted in-memory transport.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use super::{FormSubmission, Request, Transport};
use crate::error::TransportError;

/// Scripted outcome of a mocked call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// Successful response with the given body.
    Ok(String),
    /// Error status.
    Status(u16),
    /// Network failure before any response.
    ConnectionFailed,
}

impl MockResponse {
    /// Successful response.
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self::Ok(body.into())
    }

    fn into_result(self) -> Result<String, TransportError> {
        match self {
            Self::Ok(body) => Ok(body),
            Self::Status(status) => Err(TransportError::Status {
                status,
                body: String::new(),
            }),
            Self::ConnectionFailed => Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
        }
    }
}

type Responder = Rc<dyn Fn(&Request) -> MockResponse>;

/// Transport answering from scripted routes and recording every call.
///
/// Routes are keyed by URL path (query excluded). One-shot responses queued
/// with [`respond_once`](Self::respond_once) are used before the standing
/// route. Unscripted paths answer with status 404. Every call yields to the
/// scheduler once before answering, so concurrent calls interleave.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Rc<Inner>,
}

#[derive(Default)]
struct Inner {
    routes: RefCell<HashMap<String, Responder>>,
    queued: RefCell<HashMap<String, VecDeque<MockResponse>>>,
    upload: RefCell<VecDeque<MockResponse>>,
    requests: RefCell<Vec<Request>>,
    submissions: RefCell<Vec<FormSubmission>>,
}

impl MockTransport {
    /// Create a transport with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request to `path` with `response`.
    pub fn respond(&self, path: &str, response: MockResponse) {
        self.respond_with(path, move |_| response.clone());
    }

    /// Answer requests to `path` by calling `responder`.
    pub fn respond_with(&self, path: &str, responder: impl Fn(&Request) -> MockResponse + 'static) {
        self.inner
            .routes
            .borrow_mut()
            .insert(path.to_owned(), Rc::new(responder));
    }

    /// Answer the next request to `path` with `response`.
    pub fn respond_once(&self, path: &str, response: MockResponse) {
        self.inner
            .queued
            .borrow_mut()
            .entry(path.to_owned())
            .or_default()
            .push_back(response);
    }

    /// Queue the channel document for the next form submission.
    ///
    /// Submissions without a queued response fail with a connection error.
    pub fn respond_to_upload(&self, response: MockResponse) {
        self.inner.upload.borrow_mut().push_back(response);
    }

    /// All GET requests issued so far.
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        self.inner.requests.borrow().clone()
    }

    /// GET requests whose path equals `path`.
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<Request> {
        self.inner
            .requests
            .borrow()
            .iter()
            .filter(|r| r.path() == path)
            .cloned()
            .collect()
    }

    /// All form submissions so far.
    #[must_use]
    pub fn submissions(&self) -> Vec<FormSubmission> {
        self.inner.submissions.borrow().clone()
    }

    fn answer(&self, request: &Request) -> MockResponse {
        let path = request.path();
        if let Some(response) = self
            .inner
            .queued
            .borrow_mut()
            .get_mut(path)
            .and_then(VecDeque::pop_front)
        {
            return response;
        }
        let responder = self.inner.routes.borrow().get(path).cloned();
        responder.map_or(MockResponse::Status(404), |respond| respond(request))
    }
}

impl Transport for MockTransport {
    async fn get(&self, request: Request) -> Result<String, TransportError> {
        self.inner.requests.borrow_mut().push(request.clone());
        tokio::task::yield_now().await;
        self.answer(&request).into_result()
    }

    async fn submit_form(&self, submission: FormSubmission) -> Result<String, TransportError> {
        self.inner.submissions.borrow_mut().push(submission);
        tokio::task::yield_now().await;
        let response = self
            .inner
            .upload
            .borrow_mut()
            .pop_front()
            .unwrap_or(MockResponse::ConnectionFailed);
        response.into_result()
    }
}
