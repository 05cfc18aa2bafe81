#![deny(missing_docs)]

//! Contains the [`Authenticator`] and [`UserDetail`] traits used to authenticate clients and
//! describe what they're allowed to do, along with the [`StaticAuthenticator`] implementation
//! shipped with the server.
//!
//! ```no_run
//! use unftp_core_server::auth::{StaticAuthenticator, StoragePermissions};
//!
//! let auth = StaticAuthenticator::new("alice", "hunter2", StoragePermissions::all());
//! ```

pub(crate) mod authenticator;
pub use authenticator::{AuthenticationError, Authenticator, StaticAuthenticator};

mod user;
pub use user::{StaticUser, StoragePermissions, UserDetail};
