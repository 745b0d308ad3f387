//! Executes plain-data requests.
//!
//! `Transport` is the only I/O seam in the crate. [`UreqTransport`] is the
//! blocking default; tests substitute an in-memory implementation.

use crate::error::TrsError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub trait Transport {
    /// Perform the round-trip. Non-2xx statuses are returned as data, not
    /// as errors; only failures to obtain a response are `Err`.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TrsError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TrsError> {
        (**self).execute(request)
    }
}

/// Blocking HTTP transport backed by `ureq`.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TrsError> {
        let url = request.url.as_str();
        let headers = request.headers.as_slice();
        let body = request.body.as_deref().unwrap_or("").as_bytes();

        let result = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(url), headers).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(url), headers).call(),
            HttpMethod::Post => with_headers(self.agent.post(url), headers).send(body),
            HttpMethod::Put => with_headers(self.agent.put(url), headers).send(body),
        };
        let mut response = result.map_err(|e| TrsError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| TrsError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
