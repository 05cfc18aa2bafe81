//! Contains the [`StorageBackend`] trait that can be implemented to create virtual file
//! systems for the server, and the reference [`Filesystem`](crate::storage::Filesystem)
//! backend that serves files from a directory on the host's local filesystem.
//!
//! To create a new storage back-end, implement the [`StorageBackend`] trait and optionally
//! the [`Metadata`] trait for your own metadata type.

pub(crate) mod error;
pub use error::{Error, ErrorKind};

pub(crate) mod storage_backend;
pub use storage_backend::{Fileinfo, Metadata, Permissions, Result, StorageBackend, FEATURE_RESTART};

pub(crate) mod path;

mod filesystem;
pub use filesystem::{Filesystem, FilesystemMetadata};
