//! Handles every control-channel command that doesn't open a data connection. Transfer
//! commands (`LIST`/`NLST`/`RETR`/`STOR`/`APPE`) are handled in
//! [`control_loop`](super::control_loop) instead, since they need to run concurrently with a
//! potential `ABOR` on the same control channel.

use super::command::{Command, TypeParam};
use super::reply::{Reply, ReplyCode};
use crate::auth::{AuthenticationError, Authenticator, UserDetail};
use crate::server::session::{AuthState, SharedSession, TransferType};
use crate::storage::{path::virtual_join, Metadata, StorageBackend};

use std::sync::Arc;

const FEATURES: &[&str] = &["EPSV", "EPRT", "SIZE", "MDTM", "REST STREAM"];

/// Handles a single non-transfer command against `session`, returning the reply to send.
pub(crate) async fn handle<Storage, User>(cmd: Command, session: &SharedSession<Storage, User>, authenticator: &Arc<dyn Authenticator<User>>) -> Reply
where
    Storage: StorageBackend<User> + 'static,
    Storage::Metadata: Metadata,
    User: UserDetail + Clone + 'static,
{
    // USER/PASS/QUIT/FEAT/NOOP are always allowed; everything else requires authentication.
    let requires_auth = !matches!(cmd, Command::User { .. } | Command::Pass { .. } | Command::Quit | Command::Feat | Command::Noop);
    if requires_auth {
        let authenticated = session.lock().await.is_authenticated();
        if !authenticated {
            return Reply::new(ReplyCode::NotLoggedIn, "Not logged in");
        }
    }

    match cmd {
        Command::User { username } => {
            let mut s = session.lock().await;
            s.username = Some(username);
            s.auth_state = AuthState::AwaitingPass;
            Reply::new(ReplyCode::NeedPassword, "User name okay, need password")
        }
        Command::Pass { password } => handle_pass(password, session, authenticator).await,
        Command::Quit => Reply::new(ReplyCode::ClosingControlConnection, "Service closing control connection"),
        Command::Syst => Reply::new(ReplyCode::SystemType, "UNIX Type: L8"),
        Command::Feat => Reply::new_multiline(ReplyCode::FeatureList, feat_lines()),
        Command::Pwd => {
            let s = session.lock().await;
            Reply::new(ReplyCode::DirCreated, format!("\"{}\" is current directory", s.cwd.display()))
        }
        Command::Cwd { path } => handle_cwd(&path, session).await,
        Command::Cdup => handle_cwd("..", session).await,
        Command::Type { param } => {
            let mut s = session.lock().await;
            s.transfer_type = match param {
                TypeParam::Ascii => TransferType::Ascii,
                TypeParam::Image => TransferType::Image,
            };
            let letter = match param {
                TypeParam::Ascii => "A",
                TypeParam::Image => "I",
            };
            Reply::new(ReplyCode::CommandOkay, format!("Type set to {}", letter))
        }
        Command::Mode => Reply::new(ReplyCode::CommandOkay, "Mode set to Stream"),
        Command::Stru => Reply::new(ReplyCode::CommandOkay, "Structure set to File"),
        Command::Dele { path } => handle_dele(&path, session).await,
        Command::Mkd { path } => handle_mkd(&path, session).await,
        Command::Rmd { path } => handle_rmd(&path, session).await,
        Command::Rnfr { path } => handle_rnfr(&path, session).await,
        Command::Rnto { path } => handle_rnto(&path, session).await,
        Command::Size { path } => handle_size(&path, session).await,
        Command::Mdtm { path } => handle_mdtm(&path, session).await,
        Command::Noop => Reply::new(ReplyCode::CommandOkay, "NOOP ok"),
        Command::Rest { offset } => {
            session.lock().await.rest_offset = offset;
            Reply::new(ReplyCode::FileActionPending, format!("Restarting at {}", offset))
        }
        Command::Abor => Reply::new(ReplyCode::ClosingDataConnection, "Closing data connection"),
        Command::Other { command_name, .. } => Reply::new(ReplyCode::CommandNotImplemented, format!("Command {} not implemented", command_name)),
        // Pasv/Epsv/Port/Eprt/List/Nlst/Retr/Stor/Appe are handled by the control loop.
        _ => Reply::new(ReplyCode::BadCommandSequence, "Command not handled here"),
    }
}

async fn handle_pass<Storage, User>(password: String, session: &SharedSession<Storage, User>, authenticator: &Arc<dyn Authenticator<User>>) -> Reply
where
    Storage: StorageBackend<User> + 'static,
    Storage::Metadata: Metadata,
    User: UserDetail + Clone + 'static,
{
    let username = {
        let s = session.lock().await;
        match (s.auth_state, s.username.clone()) {
            (AuthState::AwaitingPass, Some(u)) => u,
            _ => return Reply::new(ReplyCode::BadCommandSequence, "Send USER first"),
        }
    };
    match authenticator.authenticate(&username, &password).await {
        Ok(user) => {
            let mut s = session.lock().await;
            s.user = Some(user);
            s.auth_state = AuthState::Authenticated;
            Reply::new(ReplyCode::UserLoggedIn, "User logged in, proceed")
        }
        Err(AuthenticationError::UnknownUsername) | Err(AuthenticationError::BadPassword) => {
            let mut s = session.lock().await;
            s.auth_state = AuthState::AwaitingUser;
            s.username = None;
            Reply::new(ReplyCode::NotLoggedIn, "Not logged in")
        }
    }
}

async fn handle_cwd<Storage, User>(path: &str, session: &SharedSession<Storage, User>) -> Reply
where
    Storage: StorageBackend<User> + 'static,
    Storage::Metadata: Metadata,
    User: UserDetail,
{
    let mut s = session.lock().await;
    let target = virtual_join(&s.cwd, path);
    let user = s.user.as_ref().expect("authenticated");
    match s.storage.cwd(user, &target).await {
        Ok(()) => {
            s.cwd = target.clone();
            Reply::new(ReplyCode::FileActionOkay, format!("Directory changed to {}", target.display()))
        }
        Err(e) => Reply::new(ReplyCode::FileError, e.kind().to_string()),
    }
}

async fn handle_dele<Storage, User>(path: &str, session: &SharedSession<Storage, User>) -> Reply
where
    Storage: StorageBackend<User> + 'static,
    Storage::Metadata: Metadata,
    User: UserDetail,
{
    let s = session.lock().await;
    if !s.user.as_ref().unwrap().storage_permissions().contains(crate::auth::StoragePermissions::DEL) {
        return Reply::new(ReplyCode::FileError, "Permission denied");
    }
    let target = virtual_join(&s.cwd, path);
    match s.storage.del(s.user.as_ref().unwrap(), &target).await {
        Ok(()) => Reply::new(ReplyCode::FileActionOkay, "File deleted"),
        Err(e) => Reply::new(ReplyCode::FileError, e.kind().to_string()),
    }
}

async fn handle_mkd<Storage, User>(path: &str, session: &SharedSession<Storage, User>) -> Reply
where
    Storage: StorageBackend<User> + 'static,
    Storage::Metadata: Metadata,
    User: UserDetail,
{
    let s = session.lock().await;
    if !s.user.as_ref().unwrap().storage_permissions().contains(crate::auth::StoragePermissions::MK_DIR) {
        return Reply::new(ReplyCode::FileError, "Permission denied");
    }
    let target = virtual_join(&s.cwd, path);
    match s.storage.mkd(s.user.as_ref().unwrap(), &target).await {
        Ok(()) => Reply::new(ReplyCode::DirCreated, format!("\"{}\" created", target.display())),
        Err(e) => Reply::new(ReplyCode::FileError, e.kind().to_string()),
    }
}

async fn handle_rmd<Storage, User>(path: &str, session: &SharedSession<Storage, User>) -> Reply
where
    Storage: StorageBackend<User> + 'static,
    Storage::Metadata: Metadata,
    User: UserDetail,
{
    let s = session.lock().await;
    if !s.user.as_ref().unwrap().storage_permissions().contains(crate::auth::StoragePermissions::RM_DIR) {
        return Reply::new(ReplyCode::FileError, "Permission denied");
    }
    let target = virtual_join(&s.cwd, path);
    match s.storage.rmd(s.user.as_ref().unwrap(), &target).await {
        Ok(()) => Reply::new(ReplyCode::FileActionOkay, "Directory deleted"),
        Err(e) => Reply::new(ReplyCode::FileError, e.kind().to_string()),
    }
}

async fn handle_rnfr<Storage, User>(path: &str, session: &SharedSession<Storage, User>) -> Reply
where
    Storage: StorageBackend<User> + 'static,
    Storage::Metadata: Metadata,
    User: UserDetail,
{
    let mut s = session.lock().await;
    let target = virtual_join(&s.cwd, path);
    s.rename_from = Some(target);
    Reply::new(ReplyCode::FileActionPending, "Tell me, what would you like the new name to be?")
}

async fn handle_rnto<Storage, User>(path: &str, session: &SharedSession<Storage, User>) -> Reply
where
    Storage: StorageBackend<User> + 'static,
    Storage::Metadata: Metadata,
    User: UserDetail,
{
    let mut s = session.lock().await;
    if !s.user.as_ref().unwrap().storage_permissions().contains(crate::auth::StoragePermissions::RENAME) {
        return Reply::new(ReplyCode::FileError, "Permission denied");
    }
    let Some(from) = s.rename_from.take() else {
        return Reply::new(ReplyCode::BadCommandSequence, "Please tell me the file you want to rename first");
    };
    let to = virtual_join(&s.cwd, path);
    match s.storage.rename(s.user.as_ref().unwrap(), &from, &to).await {
        Ok(()) => Reply::new(ReplyCode::FileActionOkay, "Rename successful"),
        Err(e) => Reply::new(ReplyCode::FileError, e.kind().to_string()),
    }
}

async fn handle_size<Storage, User>(path: &str, session: &SharedSession<Storage, User>) -> Reply
where
    Storage: StorageBackend<User> + 'static,
    Storage::Metadata: Metadata,
    User: UserDetail,
{
    let s = session.lock().await;
    let target = virtual_join(&s.cwd, path);
    match s.storage.metadata(s.user.as_ref().unwrap(), &target).await {
        Ok(meta) => Reply::new(ReplyCode::FileStatus, meta.len().to_string()),
        Err(e) => Reply::new(ReplyCode::FileError, e.kind().to_string()),
    }
}

async fn handle_mdtm<Storage, User>(path: &str, session: &SharedSession<Storage, User>) -> Reply
where
    Storage: StorageBackend<User> + 'static,
    Storage::Metadata: Metadata,
    User: UserDetail,
{
    use chrono::{DateTime, Utc};

    let s = session.lock().await;
    let target = virtual_join(&s.cwd, path);
    match s.storage.metadata(s.user.as_ref().unwrap(), &target).await {
        Ok(meta) => match meta.modified() {
            Ok(modified) => {
                let dt = DateTime::<Utc>::from(modified);
                Reply::new(ReplyCode::FileStatus, dt.format("%Y%m%d%H%M%S").to_string())
            }
            Err(e) => Reply::new(ReplyCode::FileError, e.kind().to_string()),
        },
        Err(e) => Reply::new(ReplyCode::FileError, e.kind().to_string()),
    }
}

fn feat_lines() -> Vec<String> {
    let mut lines = vec!["Features:".to_string()];
    lines.extend(FEATURES.iter().map(|f| format!(" {}", f)));
    lines.push("End".to_string());
    lines
}
