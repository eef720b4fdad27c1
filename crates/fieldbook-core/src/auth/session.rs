use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::storage::{Storage, StorageError};
use crate::models::UserProfile;

/// Storage key holding the raw bearer token.
pub const AUTH_TOKEN_KEY: &str = "authToken";

/// Storage key holding the serialized session record.
pub const USER_DATA_KEY: &str = "userData";

/// The authenticated user: bearer token merged with the profile record.
///
/// Serializes flat, as `{"token": ..., "uuid": ..., "name": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    #[serde(flatten)]
    pub user: UserProfile,
}

impl Session {
    pub fn new(token: impl Into<String>, user: UserProfile) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated,
}

/// Rebuild a session from persisted storage alone.
///
/// This is what `SessionManager::hydrate` does, available to code that runs
/// before a manager has hydrated. Returns `None` unless both entries are
/// present and readable; the `authToken` entry is authoritative for the token.
pub fn read_persisted(storage: &dyn Storage) -> Option<Session> {
    let token = match storage.get(AUTH_TOKEN_KEY) {
        Ok(Some(token)) if !token.is_empty() => token,
        Ok(_) => return None,
        Err(e) => {
            warn!(error = %e, "Failed to read persisted token");
            return None;
        }
    };

    let user_data = match storage.get(USER_DATA_KEY) {
        Ok(Some(data)) if !data.is_empty() => data,
        Ok(_) => return None,
        Err(e) => {
            warn!(error = %e, "Failed to read persisted user data");
            return None;
        }
    };

    // The stored record also carries a copy of the token; the profile parser ignores it.
    match serde_json::from_str::<UserProfile>(&user_data) {
        Ok(user) => Some(Session { token, user }),
        Err(e) => {
            warn!(error = %e, "Persisted user data is not a valid profile");
            None
        }
    }
}

/// Owns the current session and keeps persisted storage in step with it.
///
/// The in-memory copy is only synchronised with storage by `hydrate`,
/// `login` and `logout`; changes made to storage by another process are
/// not seen until the next hydration.
pub struct SessionManager<S: Storage> {
    storage: S,
    session: Option<Session>,
    hydrated: bool,
}

impl<S: Storage> SessionManager<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            session: None,
            hydrated: false,
        }
    }

    /// Load the persisted session, if any. Call once at startup, before any
    /// route decision is made.
    pub fn hydrate(&mut self) -> Option<&Session> {
        self.session = read_persisted(&self.storage);
        self.hydrated = true;
        match self.session {
            Some(ref session) => debug!(user = %session.user.uuid, "Session hydrated"),
            None => debug!("No persisted session"),
        }
        self.session.as_ref()
    }

    /// Replace the session after the auth service accepted the credentials.
    ///
    /// The in-memory session is updated before anything is written, so a
    /// storage failure leaves the process authenticated but not persisted;
    /// that failure is returned to the caller.
    pub fn login(&mut self, token: impl Into<String>, user: UserProfile) -> Result<(), StorageError> {
        let session = Session::new(token, user);
        let record = serde_json::to_string(&session).map_err(|source| StorageError::Encode {
            key: USER_DATA_KEY.to_string(),
            source,
        })?;
        let token = session.token.clone();
        info!(user = %session.user.uuid, "Logged in");
        self.session = Some(session);
        self.hydrated = true;

        self.storage.set(AUTH_TOKEN_KEY, &token)?;
        self.storage.set(USER_DATA_KEY, &record)?;
        Ok(())
    }

    /// Clear the session and both persisted entries. Safe to call when
    /// already logged out.
    pub fn logout(&mut self) -> Result<(), StorageError> {
        if self.session.take().is_some() {
            info!("Logged out");
        }
        self.hydrated = true;

        let token_result = self.storage.remove(AUTH_TOKEN_KEY);
        let data_result = self.storage.remove(USER_DATA_KEY);
        token_result.and(data_result)
    }

    /// The in-memory session; never re-reads storage.
    pub fn current_session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }

    pub fn state(&self) -> AuthState {
        if self.session.is_some() {
            AuthState::Authenticated
        } else {
            AuthState::Anonymous
        }
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }
}
