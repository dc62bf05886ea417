//! Stateless HTTP request builder and response parser for the fleet API.
//!
//! # Design
//! `FleetClient` holds only a `base_url`. Each operation is split into a
//! `build_*` method that produces an `HttpRequest` and a `parse_*` method that
//! consumes an `HttpResponse`; the `Transport` in between belongs to the host.
//! Entity CRUD is generic over `Entity`, so segments, brands and vehicles share
//! one code path keyed by `Entity::KIND`.
//!
//! The session token is passed into each authenticated build call rather than
//! stored here, so the client never holds credentials.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{Credentials, Entity, EntityId, EntityKind, Profile, TokenResponse};

#[derive(Debug, Clone)]
pub struct FleetClient {
    base_url: String,
}

impl FleetClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // --- session ---

    pub fn build_login(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/api/auth/", None, credentials)
    }

    pub fn build_register(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/api/create/", None, credentials)
    }

    pub fn build_profile(&self, token: Option<&str>) -> HttpRequest {
        self.request(HttpMethod::Get, "/api/profile/", token)
    }

    /// Returns the session token issued by the server.
    pub fn parse_login(&self, response: HttpResponse) -> Result<String, ApiError> {
        let body: TokenResponse = parse_json(&response)?;
        Ok(body.token)
    }

    /// Registration echoes the created user's id and name.
    pub fn parse_register(&self, response: HttpResponse) -> Result<Profile, ApiError> {
        parse_json(&response)
    }

    pub fn parse_profile(&self, response: HttpResponse) -> Result<Profile, ApiError> {
        parse_json(&response)
    }

    // --- entities ---

    pub fn build_list(&self, kind: EntityKind, token: Option<&str>) -> HttpRequest {
        self.request(HttpMethod::Get, &collection_path(kind), token)
    }

    pub fn build_create<E: Entity>(&self, record: &E, token: Option<&str>) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, &collection_path(E::KIND), token, record)
    }

    pub fn build_update<E: Entity>(&self, record: &E, token: Option<&str>) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, &member_path(E::KIND, record.id()), token, record)
    }

    pub fn build_delete(&self, kind: EntityKind, id: EntityId, token: Option<&str>) -> HttpRequest {
        self.request(HttpMethod::Delete, &member_path(kind, id), token)
    }

    pub fn parse_list<E: Entity>(&self, response: HttpResponse) -> Result<Vec<E>, ApiError> {
        parse_json(&response)
    }

    pub fn parse_create<E: Entity>(&self, response: HttpResponse) -> Result<E, ApiError> {
        parse_json(&response)
    }

    pub fn parse_update<E: Entity>(&self, response: HttpResponse) -> Result<E, ApiError> {
        parse_json(&response)
    }

    pub fn parse_delete(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    fn request(&self, method: HttpMethod, path: &str, token: Option<&str>) -> HttpRequest {
        let mut headers = Vec::new();
        if let Some(token) = token {
            headers.push(("authorization".to_string(), format!("token {token}")));
        }
        HttpRequest {
            method,
            path: format!("{}{path}", self.base_url),
            headers,
            body: None,
        }
    }

    fn json_request<B: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        let mut req = self.request(method, path, token);
        req.headers
            .insert(0, ("content-type".to_string(), "application/json".to_string()));
        req.body = Some(body);
        Ok(req)
    }
}

fn collection_path(kind: EntityKind) -> String {
    format!("/api/{}/", kind.resource())
}

fn member_path(kind: EntityKind, id: EntityId) -> String {
    format!("/api/{}/{id}/", kind.resource())
}

fn parse_json<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    check_status(response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Map non-2xx status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}
