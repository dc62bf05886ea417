//! Blocking HTTP transport backed by a `ureq` agent.

use fleet_core::{ApiError, HttpMethod, HttpRequest, HttpResponse, Transport};

pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        // Non-2xx statuses come back as data so the core can interpret them.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &[(String, String)]) -> ureq::RequestBuilder<B> {
    for (key, value) in headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    builder
}

impl Transport for UreqTransport {
    fn execute(&self, req: HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = req.path.as_str();
        let result = match (req.method, req.body.as_deref()) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(url), &req.headers).call(),
            (HttpMethod::Delete, _) => with_headers(self.agent.delete(url), &req.headers).call(),
            (HttpMethod::Post, Some(body)) => with_headers(self.agent.post(url), &req.headers).send(body.as_bytes()),
            (HttpMethod::Post, None) => with_headers(self.agent.post(url), &req.headers).send_empty(),
            (HttpMethod::Put, Some(body)) => with_headers(self.agent.put(url), &req.headers).send(body.as_bytes()),
            (HttpMethod::Put, None) => with_headers(self.agent.put(url), &req.headers).send_empty(),
        };
        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(HttpResponse { status, headers, body })
    }
}
