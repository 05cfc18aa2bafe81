//! The `ControlChanError` type: the error type returned by control-channel command handling.

use super::parser::ParseError;
use crate::BoxError;

use derive_more::Display;
use thiserror::Error;

/// The error type returned by the control channel.
#[derive(Debug, Error)]
#[error("control channel error: {kind}")]
pub(crate) struct ControlChanError {
    kind: ControlChanErrorKind,
    #[source]
    source: Option<BoxError>,
}

/// A list specifying categories of control-channel errors.
#[derive(Eq, PartialEq, Debug, Display, Clone)]
pub(crate) enum ControlChanErrorKind {
    #[display("failed to perform IO")]
    IoError,
    #[display("failed to parse command")]
    ParseError,
    #[display("internal server error")]
    InternalServerError,
    #[display("authentication backend error")]
    AuthenticationError,
    #[display("non-UTF8 character in command")]
    Utf8Error,
    #[display("unknown command: {command}")]
    UnknownCommand { command: String },
    #[display("invalid command (invalid parameter)")]
    InvalidCommand,
    #[display("encountered read timeout on the control channel")]
    ControlChannelTimeout,
    #[display("control channel in illegal state")]
    IllegalState,
}

impl ControlChanError {
    pub(crate) fn new(kind: ControlChanErrorKind) -> Self {
        ControlChanError { kind, source: None }
    }

    pub(crate) fn kind(&self) -> &ControlChanErrorKind {
        &self.kind
    }
}

impl From<ControlChanErrorKind> for ControlChanError {
    fn from(kind: ControlChanErrorKind) -> ControlChanError {
        ControlChanError { kind, source: None }
    }
}

impl From<std::io::Error> for ControlChanError {
    fn from(err: std::io::Error) -> ControlChanError {
        ControlChanError {
            kind: ControlChanErrorKind::IoError,
            source: Some(Box::new(err)),
        }
    }
}

impl From<std::str::Utf8Error> for ControlChanError {
    fn from(err: std::str::Utf8Error) -> ControlChanError {
        ControlChanError {
            kind: ControlChanErrorKind::Utf8Error,
            source: Some(Box::new(err)),
        }
    }
}

impl From<ParseError> for ControlChanError {
    fn from(err: ParseError) -> ControlChanError {
        let kind = match &err {
            ParseError::InvalidCommand => ControlChanErrorKind::InvalidCommand,
            ParseError::InvalidUtf8 => ControlChanErrorKind::Utf8Error,
        };
        ControlChanError {
            kind,
            source: Some(Box::new(err)),
        }
    }
}
