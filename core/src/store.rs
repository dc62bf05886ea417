//! Client-side state for segments, brands and vehicles.
//!
//! # Design
//! `EntityStore` owns one `Collection<E>` per entity kind. Each collection is
//! a list of records plus a `Draft<E>` holding the record being edited. The
//! `Stored` trait maps an entity type onto its collection so every operation
//! is written once, generically.
//!
//! Network operations (`fetch_all`, `create`, `update`, `delete`) build a
//! request, send it over a `Connection`, and on success hand the parsed result
//! to a pure reducer (`replace_all`, `apply_created`, `apply_updated`,
//! `apply_deleted`). On failure the collection keeps its last-known-good state.
//!
//! Deleting a segment or brand also drops the vehicles that reference it.
//! Whether that cascade is computed locally or re-read from the server is
//! chosen by `CascadePolicy`.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::error::{FetchError, WriteError, WriteOp};
use crate::transport::{Connection, Transport};
use crate::types::{Brand, Entity, EntityId, EntityKind, Segment, Vehicle};

/// The record currently being composed or edited for one entity kind.
///
/// A draft with id 0 becomes a create on submit; any other id an update.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft<T> {
    record: T,
}

impl<T: Entity> Draft<T> {
    /// The empty sentinel for `T`.
    pub fn empty() -> Self {
        Self { record: T::default() }
    }

    pub fn get(&self) -> &T {
        &self.record
    }

    pub fn set(&mut self, record: T) {
        self.record = record;
    }

    pub fn reset(&mut self) {
        self.record = T::default();
    }

    pub fn is_new(&self) -> bool {
        self.record.is_new()
    }

    pub fn is_empty(&self) -> bool {
        self.record == T::default()
    }

    pub fn into_inner(self) -> T {
        self.record
    }
}

impl<T: Entity> Default for Draft<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Records of one kind, unique by id, in server order.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    items: Vec<T>,
    draft: Draft<T>,
}

impl<T: Entity> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            draft: Draft::empty(),
        }
    }
}

impl<T: Entity> Collection<T> {
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn draft(&self) -> &Draft<T> {
        &self.draft
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    fn position(&self, id: EntityId) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }
}

/// How dependent vehicles are reconciled after a segment or brand delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CascadePolicy {
    /// Drop referencing vehicles locally, mirroring `ON DELETE CASCADE`.
    #[default]
    Mirror,
    /// Re-fetch the vehicle list from the server. Falls back to `Mirror` if
    /// the re-fetch fails.
    Refetch,
}

/// Maps an entity type onto its collection inside `EntityStore`.
pub trait Stored: Entity {
    fn collection(store: &EntityStore) -> &Collection<Self>;
    fn collection_mut(store: &mut EntityStore) -> &mut Collection<Self>;

    /// Drop vehicles that reference the deleted record `id`. Returns how many
    /// were removed.
    fn cascade(_vehicles: &mut Vec<Vehicle>, _id: EntityId) -> usize {
        0
    }
}

impl Stored for Segment {
    fn collection(store: &EntityStore) -> &Collection<Self> {
        &store.segments
    }

    fn collection_mut(store: &mut EntityStore) -> &mut Collection<Self> {
        &mut store.segments
    }

    fn cascade(vehicles: &mut Vec<Vehicle>, id: EntityId) -> usize {
        let before = vehicles.len();
        vehicles.retain(|vehicle| vehicle.segment_id != id);
        before - vehicles.len()
    }
}

impl Stored for Brand {
    fn collection(store: &EntityStore) -> &Collection<Self> {
        &store.brands
    }

    fn collection_mut(store: &mut EntityStore) -> &mut Collection<Self> {
        &mut store.brands
    }

    fn cascade(vehicles: &mut Vec<Vehicle>, id: EntityId) -> usize {
        let before = vehicles.len();
        vehicles.retain(|vehicle| vehicle.brand_id != id);
        before - vehicles.len()
    }
}

impl Stored for Vehicle {
    fn collection(store: &EntityStore) -> &Collection<Self> {
        &store.vehicles
    }

    fn collection_mut(store: &mut EntityStore) -> &mut Collection<Self> {
        &mut store.vehicles
    }
}

#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    segments: Collection<Segment>,
    brands: Collection<Brand>,
    vehicles: Collection<Vehicle>,
    cascade: CascadePolicy,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cascade_policy(cascade: CascadePolicy) -> Self {
        Self {
            cascade,
            ..Self::default()
        }
    }

    pub fn cascade_policy(&self) -> CascadePolicy {
        self.cascade
    }

    pub fn items<E: Stored>(&self) -> &[E] {
        E::collection(self).items()
    }

    pub fn get<E: Stored>(&self, id: EntityId) -> Option<&E> {
        E::collection(self).get(id)
    }

    pub fn draft<E: Stored>(&self) -> &Draft<E> {
        E::collection(self).draft()
    }

    /// Replace the draft wholesale. Field-level merging is the caller's job.
    pub fn set_draft<E: Stored>(&mut self, record: E) {
        E::collection_mut(self).draft.set(record);
    }

    pub fn reset_draft<E: Stored>(&mut self) {
        E::collection_mut(self).draft.reset();
    }

    // --- reducers ---

    /// Replace the whole collection. Later duplicates of an id are dropped.
    pub fn replace_all<E: Stored>(&mut self, records: Vec<E>) {
        let mut seen = HashSet::with_capacity(records.len());
        let total = records.len();
        let items: Vec<E> = records.into_iter().filter(|r| seen.insert(r.id())).collect();
        if items.len() != total {
            warn!(kind = %E::KIND, dropped = total - items.len(), "server list contained duplicate ids");
        }
        E::collection_mut(self).items = items;
    }

    /// Append a server-created record and reset the draft.
    pub fn apply_created<E: Stored>(&mut self, record: E) {
        let collection = E::collection_mut(self);
        match collection.position(record.id()) {
            Some(index) => {
                warn!(kind = %E::KIND, id = record.id(), "created record already listed, replacing");
                collection.items[index] = record;
            }
            None => collection.items.push(record),
        }
        collection.draft.reset();
    }

    /// Replace the record with the same id and reset the draft.
    pub fn apply_updated<E: Stored>(&mut self, record: E) {
        let collection = E::collection_mut(self);
        match collection.position(record.id()) {
            Some(index) => collection.items[index] = record,
            None => {
                warn!(kind = %E::KIND, id = record.id(), "updated record was not listed, appending");
                collection.items.push(record);
            }
        }
        collection.draft.reset();
    }

    /// Remove the record and cascade to dependent vehicles. Returns the number
    /// of vehicles removed by the cascade.
    pub fn apply_deleted<E: Stored>(&mut self, id: EntityId) -> usize {
        E::collection_mut(self).items.retain(|item| item.id() != id);
        E::cascade(&mut self.vehicles.items, id)
    }

    // --- network operations ---

    /// Load every record of kind `E`, replacing the collection on success.
    pub fn fetch_all<E: Stored, T: Transport>(
        &mut self,
        conn: &Connection<T>,
        token: Option<&str>,
    ) -> Result<&[E], FetchError> {
        let req = conn.client().build_list(E::KIND, token);
        let records = conn
            .send(req)
            .and_then(|resp| conn.client().parse_list::<E>(resp))
            .map_err(|source| FetchError { kind: E::KIND, source })?;
        info!(kind = %E::KIND, count = records.len(), "fetched collection");
        self.replace_all(records);
        Ok(self.items::<E>())
    }

    pub fn create<E: Stored, T: Transport>(
        &mut self,
        conn: &Connection<T>,
        token: Option<&str>,
        record: &E,
    ) -> Result<E, WriteError> {
        let rejected = |source| WriteError::Rejected {
            kind: E::KIND,
            op: WriteOp::Create,
            source,
        };
        let req = conn.client().build_create(record, token).map_err(rejected)?;
        let created = conn
            .send(req)
            .and_then(|resp| conn.client().parse_create::<E>(resp))
            .map_err(rejected)?;
        info!(kind = %E::KIND, id = created.id(), "created record");
        self.apply_created(created.clone());
        Ok(created)
    }

    pub fn update<E: Stored, T: Transport>(
        &mut self,
        conn: &Connection<T>,
        token: Option<&str>,
        record: &E,
    ) -> Result<E, WriteError> {
        if record.is_new() {
            return Err(WriteError::Unpersisted {
                kind: E::KIND,
                op: WriteOp::Update,
            });
        }
        let rejected = |source| WriteError::Rejected {
            kind: E::KIND,
            op: WriteOp::Update,
            source,
        };
        let req = conn.client().build_update(record, token).map_err(rejected)?;
        let updated = conn
            .send(req)
            .and_then(|resp| conn.client().parse_update::<E>(resp))
            .map_err(rejected)?;
        info!(kind = %E::KIND, id = updated.id(), "updated record");
        self.apply_updated(updated.clone());
        Ok(updated)
    }

    pub fn delete<E: Stored, T: Transport>(
        &mut self,
        conn: &Connection<T>,
        token: Option<&str>,
        id: EntityId,
    ) -> Result<(), WriteError> {
        if id == 0 {
            return Err(WriteError::Unpersisted {
                kind: E::KIND,
                op: WriteOp::Delete,
            });
        }
        let req = conn.client().build_delete(E::KIND, id, token);
        conn.send(req)
            .and_then(|resp| conn.client().parse_delete(resp))
            .map_err(|source| WriteError::Rejected {
                kind: E::KIND,
                op: WriteOp::Delete,
                source,
            })?;

        let cascades = E::KIND != EntityKind::Vehicle;
        if cascades && self.cascade == CascadePolicy::Refetch {
            E::collection_mut(self).items.retain(|item| item.id() != id);
            match self.fetch_all::<Vehicle, T>(conn, token).map(|vehicles| vehicles.len()) {
                Ok(fetched) => {
                    // The server list must not reintroduce orphans.
                    let orphans = E::cascade(&mut self.vehicles.items, id);
                    if orphans > 0 {
                        warn!(kind = %E::KIND, id, orphans, "server still lists vehicles of deleted record, dropping them");
                    }
                    info!(kind = %E::KIND, id, vehicles = fetched - orphans, "deleted record, vehicles re-fetched");
                    return Ok(());
                }
                Err(e) => warn!(error = %e, "vehicle re-fetch failed, mirroring cascade locally"),
            }
        }

        let removed = self.apply_deleted::<E>(id);
        info!(kind = %E::KIND, id, cascaded = removed, "deleted record");
        Ok(())
    }
}
