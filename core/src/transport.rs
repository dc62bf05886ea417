//! The seam between request building and network I/O.
//!
//! The core never opens sockets. A host implements `Transport` (the CLI uses a
//! blocking `ureq` agent, tests use scripted responses) and hands it to a
//! `Connection`, which pairs it with a `FleetClient` and logs each round trip.

use tracing::debug;

use crate::client::FleetClient;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes one HTTP request.
///
/// Implementations must return non-2xx responses as data, not as `Err`;
/// `Err` is reserved for requests that produced no response at all.
pub trait Transport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

/// A `FleetClient` bound to the transport that carries its requests.
#[derive(Debug, Clone)]
pub struct Connection<T> {
    client: FleetClient,
    transport: T,
}

impl<T: Transport> Connection<T> {
    pub fn new(client: FleetClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &FleetClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let method = request.method;
        let path = request.path.clone();
        debug!(%method, %path, "sending request");
        let response = self.transport.execute(request)?;
        debug!(%method, %path, status = response.status, "received response");
        Ok(response)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;

    /// Replays queued responses in order and records every request.
    #[derive(Default)]
    pub(crate) struct ScriptedTransport {
        responses: RefCell<VecDeque<HttpResponse>>,
        requests: RefCell<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn respond(&self, status: u16, body: &str) -> &Self {
            self.responses
                .borrow_mut()
                .push_back(HttpResponse::new(status, body));
            self
        }

        pub(crate) fn requests(&self) -> Vec<HttpRequest> {
            self.requests.borrow().clone()
        }
    }

    impl Transport for ScriptedTransport {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            self.requests.borrow_mut().push(request);
            self.responses
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| ApiError::Transport("no scripted response left".to_string()))
        }
    }

    pub(crate) fn connection() -> Connection<ScriptedTransport> {
        Connection::new(FleetClient::new("http://api.test"), ScriptedTransport::new())
    }
}
