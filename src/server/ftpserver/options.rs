//! Default values for the knobs exposed by the [`Server`](super::Server) builder.

use std::ops::RangeInclusive;
use std::time::Duration;

/// Sent as the `220` reply text when no custom greeting is configured.
pub const DEFAULT_GREETING: &str = "Welcome";

/// How long a control channel may sit idle before it is closed, if not overridden.
pub const DEFAULT_IDLE_SESSION_TIMEOUT_SECS: u64 = 600;

pub(crate) fn default_idle_session_timeout() -> Duration {
    Duration::from_secs(DEFAULT_IDLE_SESSION_TIMEOUT_SECS)
}

/// The passive port range scanned by `PASV`/`EPSV` if not overridden.
pub fn default_passive_ports() -> RangeInclusive<u16> {
    49152..=65535
}
