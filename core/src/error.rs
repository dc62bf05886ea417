//! Error types for the fleet client.
//!
//! # Design
//! `ApiError` describes what went wrong on the wire. The store and session
//! layers wrap it in the error their callers care about: `AuthError` for the
//! session, `FetchError` for list retrieval, `WriteError` for
//! create/update/delete. None of them carry structured codes beyond
//! success/failure; the UI turns them into a short status string.

use std::fmt;

use thiserror::Error;

use crate::types::EntityKind;

/// Errors returned by `FleetClient` parse methods and by transports.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 404: the requested record does not exist.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The request never produced a response (connection refused, DNS, ...).
    #[error("transport failed: {0}")]
    Transport(String),
}

/// Errors from the durable token storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

/// Login, registration and profile failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The server refused the credentials or the token.
    #[error("authentication rejected: {0}")]
    Rejected(#[source] ApiError),

    /// A profile fetch was attempted without a stored token.
    #[error("no session token stored")]
    MissingToken,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A fetch-all request for one entity kind failed.
#[derive(Debug, Error)]
#[error("failed to fetch {kind}s: {source}")]
pub struct FetchError {
    pub kind: EntityKind,
    #[source]
    pub source: ApiError,
}

/// The write a `WriteError` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Create,
    Update,
    Delete,
}

impl fmt::Display for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WriteOp::Create => "create",
            WriteOp::Update => "update",
            WriteOp::Delete => "delete",
        })
    }
}

/// A create, update or delete failed. The collection is left untouched.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Update or delete was called with the sentinel id 0. No request is sent.
    #[error("cannot {op} an unsaved {kind}")]
    Unpersisted { kind: EntityKind, op: WriteOp },

    #[error("failed to {op} {kind}: {source}")]
    Rejected {
        kind: EntityKind,
        op: WriteOp,
        #[source]
        source: ApiError,
    },
}

impl WriteError {
    pub fn kind(&self) -> EntityKind {
        match self {
            WriteError::Unpersisted { kind, .. } | WriteError::Rejected { kind, .. } => *kind,
        }
    }

    pub fn op(&self) -> WriteOp {
        match self {
            WriteError::Unpersisted { op, .. } | WriteError::Rejected { op, .. } => *op,
        }
    }
}
