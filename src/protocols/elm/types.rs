use std::fmt;
use std::time::Duration;

/// Text captured from the adapter for one command, exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse(String);

impl RawResponse {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the adapter produced no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Delays used by the settle-and-poll drain loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTiming {
    /// Wait before the first read after a command.
    pub settle_delay: Duration,
    /// Pause between reads while the adapter is still producing bytes.
    pub poll_interval: Duration,
    /// Extra wait after each initialization command.
    pub init_command_delay: Duration,
}

impl Default for LinkTiming {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(150),
            poll_interval: Duration::from_millis(20),
            init_command_delay: Duration::from_millis(250),
        }
    }
}

impl LinkTiming {
    /// No delays at all; for scripted transports that answer instantly.
    pub fn immediate() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            poll_interval: Duration::ZERO,
            init_command_delay: Duration::ZERO,
        }
    }
}
