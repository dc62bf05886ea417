//! The application state container.
//!
//! `App` bundles the connection, the session and the entity store. The host
//! creates one at start-up and passes it to its form controllers; dropping it
//! discards every collection. Only the session token outlives it, through the
//! session's `TokenStorage`.

use crate::error::{AuthError, FetchError, WriteError};
use crate::session::{SessionStore, TokenStorage};
use crate::store::{EntityStore, Stored};
use crate::transport::{Connection, Transport};
use crate::types::{EntityId, Profile};

#[derive(Debug)]
pub struct App<T, S> {
    conn: Connection<T>,
    session: SessionStore<S>,
    entities: EntityStore,
}

impl<T: Transport, S: TokenStorage> App<T, S> {
    pub fn new(conn: Connection<T>, storage: S) -> Self {
        Self::with_store(conn, storage, EntityStore::new())
    }

    pub fn with_store(conn: Connection<T>, storage: S, entities: EntityStore) -> Self {
        Self {
            conn,
            session: SessionStore::new(storage),
            entities,
        }
    }

    pub fn connection(&self) -> &Connection<T> {
        &self.conn
    }

    pub fn session(&self) -> &SessionStore<S> {
        &self.session
    }

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    // --- session ---

    pub fn login(&mut self, username: &str, password: &str) -> Result<String, AuthError> {
        self.session.login(&self.conn, username, password)
    }

    pub fn register(&self, username: &str, password: &str) -> Result<(), AuthError> {
        self.session.register(&self.conn, username, password)
    }

    pub fn logout(&mut self) {
        self.session.logout();
    }

    pub fn fetch_profile(&mut self) -> Result<Profile, AuthError> {
        self.session.fetch_profile(&self.conn)
    }

    // --- entities ---

    pub fn fetch_all<E: Stored>(&mut self) -> Result<&[E], FetchError> {
        let token = self.session.token();
        self.entities.fetch_all::<E, T>(&self.conn, token.as_deref())
    }

    pub fn set_draft<E: Stored>(&mut self, record: E) {
        self.entities.set_draft(record);
    }

    pub fn create<E: Stored>(&mut self, record: &E) -> Result<E, WriteError> {
        let token = self.session.token();
        self.entities.create(&self.conn, token.as_deref(), record)
    }

    pub fn update<E: Stored>(&mut self, record: &E) -> Result<E, WriteError> {
        let token = self.session.token();
        self.entities.update(&self.conn, token.as_deref(), record)
    }

    pub fn delete<E: Stored>(&mut self, id: EntityId) -> Result<(), WriteError> {
        let token = self.session.token();
        self.entities.delete::<E, T>(&self.conn, token.as_deref(), id)
    }
}
