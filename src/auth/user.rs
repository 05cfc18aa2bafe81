use bitflags::bitflags;
use std::fmt::{self, Debug, Display, Formatter};
use std::path::Path;

/// `UserDetail` defines the requirements for implementations that hold _Security Subject_
/// information for use by the server: account status and authorization information.
pub trait UserDetail: Send + Sync + Display + Debug {
    /// Tells if this subject's account is enabled. The default implementation returns true.
    fn account_enabled(&self) -> bool {
        true
    }

    /// Returns the user's home directory, if any. This default implementation returns `None`,
    /// meaning the session is rooted at the backend's configured root.
    fn home(&self) -> Option<&Path> {
        None
    }

    /// Tells what the user is authorised to do in terms of FTP filesystem operations.
    /// The default implementation gives all permissions.
    fn storage_permissions(&self) -> StoragePermissions {
        StoragePermissions::all()
    }
}

bitflags! {
    /// The FTP operations that can be enabled/disabled for an authenticated user.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct StoragePermissions: u32 {
        /// If set allows FTP make directory (MKD).
        const MK_DIR = 0b0000_0001;
        /// If set allows FTP remove directory (RMD).
        const RM_DIR = 0b0000_0010;
        /// If set allows FTP GET i.e. clients can download files (RETR).
        const GET    = 0b0000_0100;
        /// If set allows FTP PUT i.e. clients can upload files (STOR/APPE).
        const PUT    = 0b0000_1000;
        /// If set allows FTP DELE i.e. clients can remove files.
        const DEL    = 0b0001_0000;
        /// If set allows FTP RENAME i.e. clients can rename directories and files (RNFR/RNTO).
        const RENAME = 0b0010_0000;
        /// If set allows clients to list the contents of a directory (LIST/NLST).
        const LIST   = 0b0100_0000;

        /// Convenience aggregation of all the write operation bits.
        const WRITE_OPS = Self::MK_DIR.bits() | Self::RM_DIR.bits() | Self::PUT.bits() | Self::DEL.bits() | Self::RENAME.bits();
    }
}

impl StoragePermissions {
    /// The permission set granted to a `serverType = ReadOnly` user: everything except the
    /// write operations.
    pub fn read_only() -> Self {
        Self::all() - Self::WRITE_OPS
    }
}

/// The authenticated-user token produced by [`StaticAuthenticator`](crate::auth::StaticAuthenticator).
///
/// It carries only the username and the storage permissions implied by the server's
/// `serverType` setting; it holds no secrets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticUser {
    name: String,
    permissions: StoragePermissions,
}

impl StaticUser {
    /// Creates a new user token for `name` with the given storage permissions.
    pub fn new(name: impl Into<String>, permissions: StoragePermissions) -> Self {
        StaticUser {
            name: name.into(),
            permissions,
        }
    }

    /// The authenticated username.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl UserDetail for StaticUser {
    fn storage_permissions(&self) -> StoragePermissions {
        self.permissions
    }
}

impl Display for StaticUser {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
