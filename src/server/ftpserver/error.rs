//! The [`ServerError`] type returned by [`Server::listen`](super::Server::listen).

use derive_more::Display;
use thiserror::Error;

/// An error preventing the server from starting or continuing to run.
#[derive(Debug, Error, Display)]
pub enum ServerError {
    /// The configured listen address could not be bound.
    #[display("failed to bind listener: {_0}")]
    BindFailed(std::io::Error),
    /// Accepting a new connection failed in a way that isn't simply "try again".
    #[display("failed to accept connection: {_0}")]
    AcceptFailed(std::io::Error),
}
