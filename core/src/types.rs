//! Domain DTOs for the fleet API.
//!
//! # Design
//! Rust field names follow the domain (`name`, `segment_id`); serde renames
//! map them onto the server's wire names (`segment_name`, `segment`). These
//! types are defined independently of the mock-server crate; integration tests
//! catch any schema drift between the two.
//!
//! Id `0` is the "not yet persisted" sentinel for every entity kind.

use std::fmt;

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Server-assigned primary key. `0` means unsaved.
pub type EntityId = i64;

/// Release year used by an empty vehicle draft.
pub const DEFAULT_RELEASE_YEAR: i32 = 2020;

/// The three collections the client manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Segment,
    Brand,
    Vehicle,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Segment, EntityKind::Brand, EntityKind::Vehicle];

    /// Path segment of the REST resource, e.g. `segments`.
    pub fn resource(self) -> &'static str {
        match self {
            EntityKind::Segment => "segments",
            EntityKind::Brand => "brands",
            EntityKind::Vehicle => "vehicles",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Segment => "segment",
            EntityKind::Brand => "brand",
            EntityKind::Vehicle => "vehicle",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behavior shared by every record the API serves.
///
/// `Default` must produce the empty draft sentinel (id 0).
pub trait Entity: Clone + fmt::Debug + PartialEq + Default + Serialize + DeserializeOwned {
    const KIND: EntityKind;

    fn id(&self) -> EntityId;

    /// Presence check run before a form may submit.
    fn is_complete(&self) -> bool;

    fn is_new(&self) -> bool {
        self.id() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default)]
    pub id: EntityId,
    #[serde(rename = "segment_name")]
    pub name: String,
}

impl Segment {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

impl Entity for Segment {
    const KIND: EntityKind = EntityKind::Segment;

    fn id(&self) -> EntityId {
        self.id
    }

    fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    #[serde(default)]
    pub id: EntityId,
    #[serde(rename = "brand_name")]
    pub name: String,
}

impl Brand {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

impl Entity for Brand {
    const KIND: EntityKind = EntityKind::Brand;

    fn id(&self) -> EntityId {
        self.id
    }

    fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// A vehicle with foreign keys to one segment and one brand.
///
/// `segment_name` and `brand_name` are filled in by the server on reads and
/// are never sent back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    #[serde(default)]
    pub id: EntityId,
    #[serde(rename = "vehicle_name")]
    pub name: String,
    pub release_year: i32,
    pub price: Decimal,
    #[serde(rename = "segment")]
    pub segment_id: EntityId,
    #[serde(rename = "brand")]
    pub brand_id: EntityId,
    #[serde(default, skip_serializing)]
    pub segment_name: String,
    #[serde(default, skip_serializing)]
    pub brand_name: String,
}

impl Default for Vehicle {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            release_year: DEFAULT_RELEASE_YEAR,
            price: Decimal::ZERO,
            segment_id: 0,
            brand_id: 0,
            segment_name: String::new(),
            brand_name: String::new(),
        }
    }
}

impl Entity for Vehicle {
    const KIND: EntityKind = EntityKind::Vehicle;

    fn id(&self) -> EntityId {
        self.id
    }

    fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && self.segment_id != 0 && self.brand_id != 0
    }
}

/// The logged-in user as reported by `/api/profile/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: EntityId,
    pub username: String,
}

/// Login and registration payload.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keeps passwords out of logs and panic messages.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Body of a successful `/api/auth/` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}
