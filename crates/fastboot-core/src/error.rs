//! Protocol-level error taxonomy.

use thiserror::Error;

use crate::protocol::ResponseStatus;
use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum FastbootError {
    #[error("{operation} failed on device {serial}: {source}")]
    Transport {
        operation: &'static str,
        serial: String,
        #[source]
        source: TransportError,
    },

    #[error("Malformed frame: {len} bytes received, at least 4 required")]
    MalformedFrame { len: usize },

    #[error("Device not found: serial={serial}")]
    DeviceNotFound { serial: String },

    #[error("Variable not found: {name}")]
    VariableNotFound { name: String },

    #[error("Failed to start data phase: {status} {payload}")]
    DownloadRejected {
        status: ResponseStatus,
        payload: String,
    },

    #[error("Failed to finish data phase: {status} {payload}")]
    DownloadIncomplete {
        status: ResponseStatus,
        payload: String,
    },

    #[error("Failed to flash partition {partition}: {status} {payload}")]
    FlashFailed {
        partition: String,
        status: ResponseStatus,
        payload: String,
    },

    #[error("Failed to boot image: {status} {payload}")]
    BootFailed {
        status: ResponseStatus,
        payload: String,
    },

    #[error("Payload too large: {len} bytes, maximum {max}")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("Command '{command}' failed: {status} {payload}")]
    CommandFailed {
        command: String,
        status: ResponseStatus,
        payload: String,
    },
}

impl FastbootError {
    /// True when the failure came from the USB layer rather than the device's answer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

pub type Result<T, E = FastbootError> = std::result::Result<T, E>;
