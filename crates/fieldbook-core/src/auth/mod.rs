//! Client-side authentication state.
//!
//! This module provides:
//! - `SessionManager`: the current session, hydrated at startup and kept in
//!   step with persisted storage on every login/logout
//! - `Storage`: key/value persistence with file, keychain and in-memory backends
//! - `guard`: the redirect rules shared by every entry point
//!
//! Sessions never expire on the client; a 401 from a backend service is the
//! only signal that a token is no longer valid.

pub mod guard;
pub mod session;
pub mod storage;

pub use guard::{guard, Guard, Route};
pub use session::{read_persisted, AuthState, Session, SessionManager, AUTH_TOKEN_KEY, USER_DATA_KEY};
pub use storage::{FileStorage, KeyringStorage, MemoryStorage, Storage, StorageError};
