//! Client core for the fleet catalogue service (segments, brands, vehicles).
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). The host supplies a
//! `Transport`; everything above it is deterministic and testable.
//!
//! # Design
//! - `FleetClient` is stateless: it holds only `base_url`. Tokens are passed
//!   into each authenticated `build_*` call.
//! - `SessionStore` persists the token through a `TokenStorage`.
//! - `EntityStore` keeps the three collections and their drafts, and mirrors
//!   the server's cascade delete on vehicles.
//! - `App` is the explicitly created state container the host passes to its
//!   `EntityForm` / `AuthForm` controllers. There is no global state.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod app;
pub mod client;
pub mod controller;
pub mod error;
pub mod http;
pub mod session;
pub mod store;
pub mod transport;
pub mod types;

pub use app::App;
pub use client::FleetClient;
pub use controller::{AuthForm, AuthMode, EntityForm, Status};
pub use error::{ApiError, AuthError, FetchError, StorageError, WriteError, WriteOp};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::{FileTokenStorage, MemoryTokenStorage, SessionStore, TokenStorage, TOKEN_KEY};
pub use store::{CascadePolicy, Collection, Draft, EntityStore, Stored};
pub use transport::{Connection, Transport};
pub use types::{Brand, Credentials, Entity, EntityId, EntityKind, Profile, Segment, Vehicle};

pub use rust_decimal::Decimal;
