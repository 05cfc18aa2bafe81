#![deny(clippy::all)]
#![forbid(unsafe_code)]

//! An async FTP server engine: a control-channel protocol core (RFC 959 plus the `EPSV`/`EPRT`,
//! `SIZE`, `MDTM` and `REST` extensions) backed by a directory on the local filesystem and a
//! single configured username/password pair.
//!
//! It runs on top of the Tokio asynchronous runtime and uses async IO throughout.
//!
//! # Quick Start
//!
//! Add this crate and tokio to your project's dependencies in Cargo.toml, then:
//!
//! ```no_run
//! #[tokio::main]
//! pub async fn main() {
//!     let ftp_home = std::env::temp_dir();
//!     let server = unftp_core_server::Server::new(ftp_home, "alice", "hunter2")
//!         .greeting("Welcome to my FTP server")
//!         .passive_ports(50000..=65535);
//!
//!     server.listen("127.0.0.1:2121").await.unwrap();
//! }
//! ```
//! You can now run your server with cargo run and connect to localhost:2121 with your favourite
//! FTP client, e.g.:
//!
//! ```sh
//! lftp -p 2121 localhost
//! ```
pub mod auth;
pub(crate) mod server;
pub mod storage;

pub use crate::server::ftpserver::{error::ServerError, options, Server};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
