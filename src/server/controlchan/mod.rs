//! Contains code pertaining to the FTP *control* channel.

pub(crate) mod command;

pub(crate) mod parser;

pub(crate) mod codecs;

pub(crate) mod reply;

pub(crate) mod error;

pub(crate) mod dispatch;

pub(crate) mod control_loop;
pub(crate) use control_loop::{spawn, ControlParams};
