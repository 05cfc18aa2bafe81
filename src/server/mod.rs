//! Contains the [`Server`](crate::Server) struct used to configure and run an FTP server
//! instance, and the modules that implement a single connection's life cycle.

pub(crate) mod controlchan;
pub(crate) mod datachan;
pub(crate) mod ftpserver;
pub(crate) mod session;
pub(crate) mod shutdown;
