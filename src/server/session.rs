//! Per-connection session state (C6): authentication progress, working directory, transfer
//! type, pending data endpoint, REST offset and rename-source scratch state.

use crate::auth::UserDetail;
use crate::storage::StorageBackend;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// A `Session` shared between the control-channel task and any in-flight transfer sub-task.
pub(crate) type SharedSession<Storage, User> = Arc<Mutex<Session<Storage, User>>>;

/// Authentication progress of a control channel, per RFC 959's `USER`/`PASS` exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthState {
    AwaitingUser,
    AwaitingPass,
    Authenticated,
}

/// The transfer representation negotiated by `TYPE`. Only the two RFC 959 types that matter in
/// practice are supported; EBCDIC and local-byte-size are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransferType {
    Ascii,
    Image,
}

impl Default for TransferType {
    fn default() -> Self {
        TransferType::Image
    }
}

/// The data channel endpoint negotiated by `PORT`/`EPRT` (active) or `PASV`/`EPSV` (passive).
/// Torn down and discarded after each transfer; a new one must be negotiated per transfer.
pub(crate) enum DataChanEndpoint {
    Active(SocketAddr),
    Passive(TcpListener),
}

impl std::fmt::Debug for DataChanEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataChanEndpoint::Active(addr) => write!(f, "DataChanEndpoint::Active({})", addr),
            DataChanEndpoint::Passive(_) => write!(f, "DataChanEndpoint::Passive(..)"),
        }
    }
}

/// Per-connection session state threaded through every command handler.
pub(crate) struct Session<Storage, User>
where
    User: UserDetail,
{
    pub auth_state: AuthState,
    pub username: Option<String>,
    pub user: Option<User>,
    pub cwd: PathBuf,
    pub transfer_type: TransferType,
    pub rest_offset: u64,
    pub rename_from: Option<PathBuf>,
    pub data_chan: Option<DataChanEndpoint>,
    pub storage: Arc<Storage>,
    pub control_local_addr: SocketAddr,
    pub control_peer_addr: SocketAddr,
}

impl<Storage, User> Session<Storage, User>
where
    User: UserDetail,
{
    pub fn new(storage: Arc<Storage>, control_local_addr: SocketAddr, control_peer_addr: SocketAddr) -> Self {
        Session {
            auth_state: AuthState::AwaitingUser,
            username: None,
            user: None,
            cwd: PathBuf::from("/"),
            transfer_type: TransferType::default(),
            rest_offset: 0,
            rename_from: None,
            data_chan: None,
            storage,
            control_local_addr,
            control_peer_addr,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_state == AuthState::Authenticated
    }

    /// Consumes and resets the REST offset, as required after the next STOR/RETR/APPE or on
    /// an intervening unrelated command.
    pub fn take_rest_offset(&mut self) -> u64 {
        std::mem::take(&mut self.rest_offset)
    }
}

impl<Storage, User> std::fmt::Debug for Session<Storage, User>
where
    Storage: StorageBackend<User>,
    User: UserDetail,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("auth_state", &self.auth_state)
            .field("username", &self.username)
            .field("cwd", &self.cwd)
            .field("transfer_type", &self.transfer_type)
            .field("rest_offset", &self.rest_offset)
            .finish()
    }
}
