//! Drives a single control channel connection end to end: sends the greeting, reads and
//! dispatches commands, and runs transfers (which need to run concurrently with a potential
//! `ABOR` on the same connection) until the client disconnects, quits, goes idle, or the
//! server starts shutting down.

use super::command::{Command, HostPort};
use super::dispatch;
use super::reply::{Reply, ReplyCode};
use super::{codecs::FtpCodec, error::ControlChanError};
use crate::auth::{Authenticator, StoragePermissions, UserDetail};
use crate::server::datachan;
use crate::server::session::{DataChanEndpoint, Session, SharedSession};
use crate::server::shutdown;
use crate::storage::{path::virtual_join, Metadata, StorageBackend};

use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

/// Configuration shared by every control channel spawned off the listener.
pub(crate) struct ControlParams<Storage, User>
where
    Storage: StorageBackend<User>,
    User: UserDetail,
{
    pub storage: Arc<Storage>,
    pub authenticator: Arc<dyn Authenticator<User>>,
    pub greeting: String,
    pub idle_session_timeout: Duration,
    pub passive_ports: RangeInclusive<u16>,
}

/// Drives `socket` to completion: sends the greeting, then loops reading and dispatching
/// commands until the client disconnects or the idle timeout elapses.
pub(crate) async fn spawn<Storage, User>(socket: TcpStream, params: Arc<ControlParams<Storage, User>>, mut shutdown_listener: shutdown::Listener)
where
    Storage: StorageBackend<User> + 'static,
    Storage::Metadata: Metadata,
    User: UserDetail + Clone + 'static,
{
    let local_addr = match socket.local_addr() {
        Ok(addr) => addr,
        Err(e) => {
            warn!(error = %e, "could not read local address of accepted connection");
            return;
        }
    };
    let peer_addr = socket.peer_addr().unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 0)));
    info!(%peer_addr, "accepted control connection");

    let mut framed = Framed::new(socket, FtpCodec::new());
    if framed.send(Reply::new(ReplyCode::ServiceReady, params.greeting.clone())).await.is_err() {
        return;
    }

    let session: SharedSession<Storage, User> = Arc::new(Mutex::new(Session::new(Arc::clone(&params.storage), local_addr, peer_addr)));

    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown_listener.listen() => {
                let _ = framed.send(Reply::new(ReplyCode::ServiceNotAvailable, "Service not available, server is shutting down")).await;
                break;
            }
            res = tokio::time::timeout(params.idle_session_timeout, framed.next()) => res,
        };

        let Ok(next) = next else {
            debug!(%peer_addr, "control channel idle timeout elapsed");
            break;
        };

        let cmd = match next {
            Some(Ok(cmd)) => cmd,
            Some(Err(e)) => {
                let reply = reply_for_error(&e);
                let _ = framed.send(reply).await;
                if is_fatal(&e) {
                    break;
                }
                continue;
            }
            None => break,
        };

        debug!(%peer_addr, ?cmd, "received command");

        apply_sequencing_resets(&cmd, &session).await;

        let reply = match cmd {
            Command::Pasv => handle_pasv(&session, &params.passive_ports, false).await,
            Command::Epsv => handle_pasv(&session, &params.passive_ports, true).await,
            Command::Port { endpoint } => handle_port(&session, endpoint).await,
            Command::Eprt { endpoint } => handle_port(&session, endpoint).await,
            Command::List { path } => run_transfer(&mut framed, &session, TransferKind::List { nlst: false, path }).await,
            Command::Nlst { path } => run_transfer(&mut framed, &session, TransferKind::List { nlst: true, path }).await,
            Command::Retr { path } => run_transfer(&mut framed, &session, TransferKind::Retr { path }).await,
            Command::Stor { path } => run_transfer(&mut framed, &session, TransferKind::Stor { path, append: false }).await,
            Command::Appe { path } => run_transfer(&mut framed, &session, TransferKind::Stor { path, append: true }).await,
            Command::Quit => {
                let reply = dispatch::handle(Command::Quit, &session, &params.authenticator).await;
                let _ = framed.send(reply).await;
                break;
            }
            other => dispatch::handle(other, &session, &params.authenticator).await,
        };

        if framed.send(reply).await.is_err() {
            break;
        }
    }

    info!(%peer_addr, "control connection closed");
}

/// `RNFR`/`RNTO` and `REST`/{`STOR`,`RETR`,`APPE`} form two-step sequences; any intervening
/// command other than the expected pair-member cancels the pending state.
async fn apply_sequencing_resets<Storage, User>(cmd: &Command, session: &SharedSession<Storage, User>)
where
    Storage: StorageBackend<User>,
    User: UserDetail,
{
    let mut s = session.lock().await;
    if !matches!(cmd, Command::Rnto { .. }) {
        s.rename_from = None;
    }
    if !matches!(cmd, Command::Rest { .. } | Command::Retr { .. } | Command::Stor { .. } | Command::Appe { .. }) {
        s.rest_offset = 0;
    }
}

async fn handle_pasv<Storage, User>(session: &SharedSession<Storage, User>, ports: &RangeInclusive<u16>, extended: bool) -> Reply
where
    Storage: StorageBackend<User>,
    User: UserDetail,
{
    let local_ip = session.lock().await.control_local_addr.ip();
    let listener = match datachan::bind_passive(local_ip, ports.clone()).await {
        Ok(l) => l,
        Err(e) => return Reply::new(ReplyCode::CantOpenDataConnection, e.to_string()),
    };
    let bound_port = listener.local_addr().map(|a| a.port()).unwrap_or(0);
    session.lock().await.data_chan = Some(DataChanEndpoint::Passive(listener));

    if extended {
        Reply::new(ReplyCode::EnteringExtendedPassiveMode, format!("Entering Extended Passive Mode (|||{}|)", bound_port))
    } else {
        match local_ip {
            std::net::IpAddr::V4(ip) => {
                let octets = ip.octets();
                Reply::new(
                    ReplyCode::EnteringPassiveMode,
                    format!(
                        "Entering Passive Mode ({},{},{},{},{},{})",
                        octets[0],
                        octets[1],
                        octets[2],
                        octets[3],
                        bound_port / 256,
                        bound_port % 256
                    ),
                )
            }
            std::net::IpAddr::V6(_) => Reply::new(ReplyCode::CommandNotImplementedForParameter, "PASV unsupported on IPv6; use EPSV"),
        }
    }
}

async fn handle_port<Storage, User>(session: &SharedSession<Storage, User>, endpoint: HostPort) -> Reply
where
    Storage: StorageBackend<User>,
    User: UserDetail,
{
    session.lock().await.data_chan = Some(DataChanEndpoint::Active(SocketAddr::new(endpoint.ip, endpoint.port)));
    Reply::new(ReplyCode::CommandOkay, "PORT command successful")
}

enum TransferKind {
    List { nlst: bool, path: Option<String> },
    Retr { path: String },
    Stor { path: String, append: bool },
}

async fn run_transfer<Storage, User>(
    framed: &mut Framed<TcpStream, FtpCodec>,
    session: &SharedSession<Storage, User>,
    kind: TransferKind,
) -> Reply
where
    Storage: StorageBackend<User> + 'static,
    Storage::Metadata: Metadata,
    User: UserDetail + Clone + 'static,
{
    let (authenticated, permitted) = {
        let s = session.lock().await;
        let authed = s.is_authenticated();
        let perm = s.user.as_ref().map(|u| match &kind {
            TransferKind::List { .. } => u.storage_permissions().contains(StoragePermissions::LIST),
            TransferKind::Retr { .. } => u.storage_permissions().contains(StoragePermissions::GET),
            TransferKind::Stor { .. } => u.storage_permissions().contains(StoragePermissions::PUT),
        });
        (authed, perm.unwrap_or(false))
    };
    if !authenticated {
        return Reply::new(ReplyCode::NotLoggedIn, "Not logged in");
    }
    if !permitted {
        return Reply::new(ReplyCode::FileError, "Permission denied");
    }

    let endpoint = session.lock().await.data_chan.take();
    let Some(endpoint) = endpoint else {
        return Reply::new(ReplyCode::CantOpenDataConnection, "Can't open data connection");
    };

    let transfer_type = session.lock().await.transfer_type;
    let type_word = match transfer_type {
        crate::server::session::TransferType::Ascii => "ASCII",
        crate::server::session::TransferType::Image => "BINARY",
    };
    let subject = match &kind {
        TransferKind::List { nlst: false, .. } => "file list".to_string(),
        TransferKind::List { nlst: true, .. } => "name list".to_string(),
        TransferKind::Retr { path } | TransferKind::Stor { path, .. } => path.clone(),
    };
    let _ = framed
        .send(Reply::new(ReplyCode::FileStatusOkay, format!("Opening {} mode data connection for {}", type_word, subject)))
        .await;

    let session_for_task = Arc::clone(session);
    let mut handle = tokio::spawn(async move { execute_transfer(session_for_task, endpoint, kind).await });

    loop {
        tokio::select! {
            biased;
            result = &mut handle => {
                return match result {
                    Ok(Ok(())) => Reply::new(ReplyCode::ClosingDataConnection, "Transfer complete"),
                    Ok(Err(msg)) => Reply::new(ReplyCode::LocalError, msg),
                    Err(e) if e.is_cancelled() => Reply::new(ReplyCode::ClosingDataConnection, "Closing data connection"),
                    Err(_) => Reply::new(ReplyCode::LocalError, "Transfer task panicked"),
                };
            }
            next = framed.next() => {
                match next {
                    Some(Ok(Command::Abor)) => {
                        handle.abort();
                        let _ = framed.send(Reply::new(ReplyCode::ConnectionClosed, "Connection closed; transfer aborted")).await;
                        let _ = (&mut handle).await;
                        return Reply::new(ReplyCode::ClosingDataConnection, "Closing data connection");
                    }
                    Some(Ok(_other)) => {
                        let _ = framed.send(Reply::new(ReplyCode::BadCommandSequence, "Transfer in progress")).await;
                    }
                    _ => {
                        handle.abort();
                        return Reply::new(ReplyCode::ConnectionClosed, "Connection closed; transfer aborted");
                    }
                }
            }
        }
    }
}

async fn execute_transfer<Storage, User>(session: SharedSession<Storage, User>, endpoint: DataChanEndpoint, kind: TransferKind) -> Result<(), String>
where
    Storage: StorageBackend<User> + 'static,
    Storage::Metadata: Metadata,
    User: UserDetail + Clone,
{
    let mut stream = datachan::establish(endpoint).await.map_err(|e| e.to_string())?;

    let (cwd, user, storage, rest_offset, transfer_type) = {
        let mut s = session.lock().await;
        (s.cwd.clone(), s.user.clone().expect("authenticated"), Arc::clone(&s.storage), s.take_rest_offset(), s.transfer_type)
    };

    match kind {
        TransferKind::List { nlst, path } => {
            let target = virtual_join(&cwd, path.as_deref().unwrap_or("."));
            let cursor = if nlst {
                storage.nlst(&user, &target).await.map_err(|e| e.to_string())?
            } else {
                storage.list_fmt(&user, &target).await.map_err(|e| e.to_string())?
            };
            let bytes = datachan::to_wire(transfer_type, cursor.get_ref());
            stream.write_all(&bytes).await.map_err(|e| e.to_string())?;
            stream.shutdown().await.map_err(|e| e.to_string())
        }
        TransferKind::Retr { path } => {
            let target = virtual_join(&cwd, &path);
            let mut reader = storage.get(&user, &target, rest_offset).await.map_err(|e| e.to_string())?;
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).await.map_err(|e| e.to_string())?;
            let bytes = datachan::to_wire(transfer_type, &buf);
            stream.write_all(&bytes).await.map_err(|e| e.to_string())?;
            stream.shutdown().await.map_err(|e| e.to_string())
        }
        TransferKind::Stor { path, append } => {
            let target = virtual_join(&cwd, &path);
            let mut raw = Vec::new();
            stream.read_to_end(&mut raw).await.map_err(|e| e.to_string())?;
            let data = datachan::from_wire(transfer_type, &raw);
            let start = if append {
                storage.metadata(&user, &target).await.map(|m| m.len()).unwrap_or(0)
            } else {
                rest_offset
            };
            storage
                .put(&user, std::io::Cursor::new(data), &target, start)
                .await
                .map(|_| ())
                .map_err(|e| e.to_string())
        }
    }
}

fn reply_for_error(err: &ControlChanError) -> Reply {
    use super::error::ControlChanErrorKind::*;
    match err.kind() {
        UnknownCommand { command } => Reply::new(ReplyCode::CommandNotImplemented, format!("Unknown command {}", command)),
        InvalidCommand | ParseError => Reply::new(ReplyCode::ParameterSyntaxError, "Invalid command"),
        Utf8Error => Reply::new(ReplyCode::CommandSyntaxError, "Non-UTF8 character in command"),
        _ => Reply::new(ReplyCode::LocalError, "Local error"),
    }
}

fn is_fatal(err: &ControlChanError) -> bool {
    matches!(err.kind(), super::error::ControlChanErrorKind::IoError)
}
