//! The [`Server`] builder: configures and runs an FTP server instance backed by the local
//! filesystem and a single configured username/password pair (C9).

pub mod error;
pub mod options;

use crate::auth::{StaticAuthenticator, StaticUser, StoragePermissions};
use crate::server::controlchan::{self, ControlParams};
use crate::server::shutdown;
use crate::storage::Filesystem;
use error::ServerError;

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Configures and runs an FTP server rooted at a single directory, authenticating clients
/// against a single configured username/password pair.
pub struct Server {
    root: PathBuf,
    username: String,
    password: String,
    read_only: bool,
    greeting: String,
    idle_session_timeout: Duration,
    passive_ports: RangeInclusive<u16>,
    shutdown: Arc<shutdown::Notifier>,
}

impl Server {
    /// Creates a builder serving `root` to a client authenticating as `username`/`password`,
    /// with read/write access and the other knobs at their defaults.
    pub fn new(root: impl Into<PathBuf>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Server {
            root: root.into(),
            username: username.into(),
            password: password.into(),
            read_only: false,
            greeting: options::DEFAULT_GREETING.to_string(),
            idle_session_timeout: options::default_idle_session_timeout(),
            passive_ports: options::default_passive_ports(),
            shutdown: Arc::new(shutdown::Notifier::new()),
        }
    }

    /// Restricts the configured user to read-only operations (`serverType = ReadOnly`).
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Overrides the `220` greeting text.
    pub fn greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    /// Overrides how long a control channel may sit idle before being closed.
    pub fn idle_session_timeout(mut self, timeout: Duration) -> Self {
        self.idle_session_timeout = timeout;
        self
    }

    /// Overrides the port range scanned by `PASV`/`EPSV`.
    pub fn passive_ports(mut self, ports: RangeInclusive<u16>) -> Self {
        self.passive_ports = ports;
        self
    }

    /// Binds `bind_addr` and accepts connections until [`shutdown`](Self::shutdown) is called.
    /// Accept failures other than a deliberate shutdown are logged and the loop continues.
    pub async fn listen(&self, bind_addr: impl AsRef<str>) -> Result<(), ServerError> {
        let listener = TcpListener::bind(bind_addr.as_ref()).await.map_err(ServerError::BindFailed)?;
        info!(addr = bind_addr.as_ref(), "FTP server listening");

        let permissions = if self.read_only { StoragePermissions::read_only() } else { StoragePermissions::all() };
        let params = Arc::new(ControlParams {
            storage: Arc::new(Filesystem::new(self.root.clone())),
            authenticator: Arc::new(StaticAuthenticator::new(self.username.clone(), self.password.clone(), permissions)) as Arc<dyn crate::auth::Authenticator<StaticUser>>,
            greeting: self.greeting.clone(),
            idle_session_timeout: self.idle_session_timeout,
            passive_ports: self.passive_ports.clone(),
        });

        let mut shutdown_listener = self.shutdown.subscribe().await;
        loop {
            tokio::select! {
                biased;
                _ = shutdown_listener.listen() => {
                    info!("shutdown requested, closing listener");
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((socket, _peer)) => {
                            let params = Arc::clone(&params);
                            let conn_listener = self.shutdown.subscribe().await;
                            tokio::spawn(async move {
                                controlchan::spawn(socket, params, conn_listener).await;
                            });
                        }
                        Err(e) => warn!(error = %e, "failed to accept connection"),
                    }
                }
            }
        }
        Ok(())
    }

    /// Signals shutdown and waits for all in-flight sessions to finish.
    pub async fn shutdown(&self) {
        self.shutdown.notify().await;
        self.shutdown.linger().await;
        info!("server shutdown complete");
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("root", &self.root)
            .field("username", &self.username)
            .field("read_only", &self.read_only)
            .finish()
    }
}
