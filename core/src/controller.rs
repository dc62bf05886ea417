//! Form logic for the entity editors and the login screen.
//!
//! A form never touches the network itself. It reads and writes the draft
//! through `App`, calls the named store operations, and turns each `Result`
//! into a transient `Status` for the view to show.

use std::fmt;
use std::marker::PhantomData;

use tracing::debug;

use crate::app::App;
use crate::session::TokenStorage;
use crate::store::Stored;
use crate::transport::Transport;
use crate::types::EntityId;

/// Transient, human-readable outcome of the last form action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Success(String),
    Failure(String),
}

impl Status {
    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Status::Success(msg) | Status::Failure(msg) => msg,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Editor for one entity kind: list, draft, submit, delete.
#[derive(Debug)]
pub struct EntityForm<E> {
    status: Option<Status>,
    _entity: PhantomData<E>,
}

impl<E> Default for EntityForm<E> {
    fn default() -> Self {
        Self {
            status: None,
            _entity: PhantomData,
        }
    }
}

impl<E: Stored> EntityForm<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    /// Load the collection. Returns whether the fetch succeeded.
    pub fn mount<T: Transport, S: TokenStorage>(&mut self, app: &mut App<T, S>) -> bool {
        match app.fetch_all::<E>() {
            Ok(_) => true,
            Err(e) => {
                self.status = Some(Status::Failure(format!("Could not load {}s: {e}", E::KIND)));
                false
            }
        }
    }

    /// Apply a field change to a copy of the draft and store it back.
    pub fn edit<T: Transport, S: TokenStorage>(&mut self, app: &mut App<T, S>, change: impl FnOnce(&mut E)) {
        let mut draft = app.entities().draft::<E>().get().clone();
        change(&mut draft);
        app.set_draft(draft);
    }

    /// Copy a listed record into the draft. Returns false if `id` is unknown.
    pub fn begin_edit<T: Transport, S: TokenStorage>(&mut self, app: &mut App<T, S>, id: EntityId) -> bool {
        match app.entities().get::<E>(id).cloned() {
            Some(record) => {
                app.set_draft(record);
                true
            }
            None => false,
        }
    }

    /// Discard the draft.
    pub fn cancel<T: Transport, S: TokenStorage>(&mut self, app: &mut App<T, S>) {
        app.set_draft(E::default());
    }

    pub fn can_submit<T: Transport, S: TokenStorage>(&self, app: &App<T, S>) -> bool {
        app.entities().draft::<E>().get().is_complete()
    }

    /// Create or update the draft depending on its id.
    pub fn submit<T: Transport, S: TokenStorage>(&mut self, app: &mut App<T, S>) -> Option<E> {
        let draft = app.entities().draft::<E>().get().clone();
        if !draft.is_complete() {
            self.status = Some(Status::Failure(format!("The {} is missing required fields", E::KIND)));
            return None;
        }

        let (verb, result) = if draft.is_new() {
            ("Created", app.create(&draft))
        } else {
            ("Updated", app.update(&draft))
        };
        debug!(kind = %E::KIND, verb, ok = result.is_ok(), "form submitted");
        match result {
            Ok(saved) => {
                self.status = Some(Status::Success(format!("{verb} {} #{}", E::KIND, saved.id())));
                Some(saved)
            }
            Err(e) => {
                self.status = Some(Status::Failure(e.to_string()));
                None
            }
        }
    }

    /// Delete a listed record. Returns whether the delete succeeded.
    pub fn remove<T: Transport, S: TokenStorage>(&mut self, app: &mut App<T, S>, id: EntityId) -> bool {
        match app.delete::<E>(id) {
            Ok(()) => {
                self.status = Some(Status::Success(format!("Deleted {} #{id}", E::KIND)));
                true
            }
            Err(e) => {
                self.status = Some(Status::Failure(e.to_string()));
                false
            }
        }
    }
}

/// Which action the login screen performs on submit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

/// Login / registration screen.
#[derive(Debug, Default)]
pub struct AuthForm {
    mode: AuthMode,
    status: Option<Status>,
}

impl AuthForm {
    pub fn new(mode: AuthMode) -> Self {
        Self { mode, status: None }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn toggle(&mut self) {
        self.mode = match self.mode {
            AuthMode::Login => AuthMode::Register,
            AuthMode::Register => AuthMode::Login,
        };
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    /// Log in, or register and then log in. Returns whether a session now exists.
    pub fn submit<T: Transport, S: TokenStorage>(
        &mut self,
        app: &mut App<T, S>,
        username: &str,
        password: &str,
    ) -> bool {
        if self.mode == AuthMode::Register {
            if let Err(e) = app.register(username, password) {
                self.status = Some(Status::Failure(format!("Registration failed: {e}")));
                return false;
            }
        }
        match app.login(username, password) {
            Ok(_) => {
                self.status = Some(Status::Success("Logged in".to_string()));
                true
            }
            Err(e) => {
                self.status = Some(Status::Failure(format!("Login failed: {e}")));
                false
            }
        }
    }
}
