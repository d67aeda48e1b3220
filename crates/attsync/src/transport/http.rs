//! HTTP transport backed by a blocking `ureq` agent.

use std::time::{SystemTime, UNIX_EPOCH};

use attsync_config::Config;
use rand::RngExt;
use tracing::debug;
use ureq::Agent;

use super::{FormSubmission, Request, Transport};
use crate::error::TransportError;

/// Transport issuing real HTTP requests against the configured server.
///
/// Requests run on tokio's blocking pool so the event loop stays responsive.
#[derive(Clone)]
pub struct HttpTransport {
    agent: Agent,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport from configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(config.http.timeout()))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: config.server.base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Resolve a possibly relative URL against the server base URL.
    fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_owned()
        } else if url.starts_with('/') {
            format!("{}{url}", self.base_url)
        } else {
            format!("{}/{url}", self.base_url)
        }
    }
}

impl Transport for HttpTransport {
    async fn get(&self, request: Request) -> Result<String, TransportError> {
        let url = self.resolve(&request.to_url(now_millis()));
        let agent = self.agent.clone();
        debug!(url = %url, "GET");

        run_blocking(move || {
            let response = agent.get(&url).call()?;
            read_body(response)
        })
        .await
    }

    async fn submit_form(&self, submission: FormSubmission) -> Result<String, TransportError> {
        let url = self.resolve(&submission.action);
        let agent = self.agent.clone();
        debug!(
            url = %url,
            target = %submission.target,
            fields = submission.fields.len(),
            files = submission.files.len(),
            "Submitting upload form"
        );

        run_blocking(move || {
            let (boundary, body) = multipart_body(&submission);
            let response = agent
                .post(&url)
                .header(
                    "Content-Type",
                    &format!("multipart/form-data; boundary={boundary}"),
                )
                .header("X-Atlassian-Token", "nocheck")
                .send(&body[..])?;
            read_body(response)
        })
        .await
    }
}

async fn run_blocking<F>(f: F) -> Result<String, TransportError>
where
    F: FnOnce() -> Result<String, TransportError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| TransportError::Task(e.to_string()))?
}

fn read_body(response: ureq::http::Response<ureq::Body>) -> Result<String, TransportError> {
    let status = response.status().as_u16();
    let mut body_reader = response.into_body();

    if status >= 400 {
        let error_body = body_reader
            .read_to_string()
            .unwrap_or_else(|_| "(unable to read error body)".to_owned());
        return Err(TransportError::Status {
            status,
            body: error_body,
        });
    }

    Ok(body_reader.read_to_string()?)
}

/// Build a `multipart/form-data` body. Returns the boundary and the bytes.
fn multipart_body(submission: &FormSubmission) -> (String, Vec<u8>) {
    let boundary = format!(
        "----AttsyncFormBoundary{:016x}",
        rand::rng().random::<u64>()
    );
    let mut body = Vec::new();

    for (name, value) in &submission.fields {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", quote(name)).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    for (name, file) in &submission.files {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                quote(name),
                quote(&file.name)
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", file.content_type).as_bytes());
        body.extend_from_slice(&file.data);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    (boundary, body)
}

fn quote(value: &str) -> String {
    value.replace('"', "%22").replace(['\r', '\n'], " ")
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use attsync_dom::SelectedFile;

    fn transport() -> HttpTransport {
        let config = Config::from_toml("[server]\nbase_url = \"https://wiki.example.com/\"\n")
            .unwrap();
        HttpTransport::new(&config)
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let transport = transport();
        assert_eq!(
            transport.resolve("/pages/x.action"),
            "https://wiki.example.com/pages/x.action"
        );
        assert_eq!(
            transport.resolve("pages/x.action"),
            "https://wiki.example.com/pages/x.action"
        );
        assert_eq!(
            transport.resolve("http://other.example.com/a"),
            "http://other.example.com/a"
        );
    }

    #[test]
    fn test_multipart_body_layout() {
        let submission = FormSubmission {
            action: "/upload".to_owned(),
            target: "channel".to_owned(),
            fields: vec![("comment_0".to_owned(), "first".to_owned())],
            files: vec![(
                "file_0".to_owned(),
                SelectedFile {
                    name: "a \"b\".txt".to_owned(),
                    content_type: "text/plain".to_owned(),
                    data: b"hello".to_vec(),
                },
            )],
        };

        let (boundary, body) = multipart_body(&submission);
        let body = String::from_utf8(body).unwrap();

        assert!(boundary.starts_with("----AttsyncFormBoundary"));
        assert!(body.contains("name=\"comment_0\"\r\n\r\nfirst\r\n"));
        assert!(body.contains("name=\"file_0\"; filename=\"a %22b%22.txt\"\r\n"));
        assert!(body.contains("Content-Type: text/plain\r\n\r\nhello\r\n"));
        assert!(body.ends_with(&format!("--{boundary}--\r\n")));
    }
}
