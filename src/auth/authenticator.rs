//! The `Authenticator` seam: validates a username/password pair and returns an
//! authenticated [`UserDetail`] token on success.

use super::user::{StaticUser, StoragePermissions};
use super::UserDetail;

use async_trait::async_trait;
use derive_more::Display;
use thiserror::Error;

/// Defines the requirements for authentication backend implementations.
///
/// The server only ever calls `authenticate` once per `USER`/`PASS` pair, after the control
/// channel has collected both. Implementations should treat unknown usernames and wrong
/// passwords the same way from the caller's perspective (both yield [`AuthenticationError`]),
/// so as not to leak which usernames are valid.
#[async_trait]
pub trait Authenticator<U>: Sync + Send
where
    U: UserDetail,
{
    /// Authenticates the given user with the given password.
    async fn authenticate(&self, username: &str, password: &str) -> Result<U, AuthenticationError>;
}

/// The error returned when authentication fails.
#[derive(Debug, Error, Display, PartialEq, Eq)]
pub enum AuthenticationError {
    /// The username is not known to the authenticator.
    #[display("unknown username")]
    UnknownUsername,
    /// The username is known, but the password does not match.
    #[display("bad password")]
    BadPassword,
}

/// An [`Authenticator`] that validates against a single, statically configured
/// username/password pair, as set up on the [`Server`](crate::Server) builder.
#[derive(Debug)]
pub struct StaticAuthenticator {
    username: String,
    password: String,
    permissions: StoragePermissions,
}

impl StaticAuthenticator {
    /// Creates a new authenticator that accepts only `username`/`password`, issuing a
    /// [`StaticUser`] with the given storage permissions on success.
    pub fn new(username: impl Into<String>, password: impl Into<String>, permissions: StoragePermissions) -> Self {
        StaticAuthenticator {
            username: username.into(),
            password: password.into(),
            permissions,
        }
    }
}

#[async_trait]
impl Authenticator<StaticUser> for StaticAuthenticator {
    async fn authenticate(&self, username: &str, password: &str) -> Result<StaticUser, AuthenticationError> {
        if username != self.username {
            return Err(AuthenticationError::UnknownUsername);
        }
        if password != self.password {
            return Err(AuthenticationError::BadPassword);
        }
        Ok(StaticUser::new(username, self.permissions))
    }
}
