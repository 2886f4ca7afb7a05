//! Event system for UI decoupling.
//!
//! Allows CLI or other front ends to subscribe to protocol events without
//! tight coupling to the engine.

use std::fmt;

use crate::protocol::ResponseStatus;
use crate::state::ExchangePhase;

/// Events emitted by a Fastboot session.
#[derive(Debug, Clone)]
pub enum FastbootEvent {
    /// Device bound and ready.
    DeviceOpened { serial: String },
    /// Device handle released.
    DeviceClosed { serial: String },
    /// Command written to the OUT endpoint.
    CommandSent { command: String },
    /// Frame read from the IN endpoint.
    ResponseReceived {
        status: ResponseStatus,
        payload: String,
    },
    /// Exchange phase changed.
    PhaseChanged {
        from: ExchangePhase,
        to: ExchangePhase,
    },
    /// Data phase progress.
    Progress {
        current: u64,
        total: u64,
        bytes_sent: u64,
        bytes_total: u64,
    },
}

/// Observer trait for receiving Fastboot events.
///
/// Implement this trait in your UI layer to receive updates.
pub trait FastbootObserver: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &FastbootEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl FastbootObserver for NullObserver {
    fn on_event(&self, _event: &FastbootEvent) {}
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl FastbootObserver for TracingObserver {
    fn on_event(&self, event: &FastbootEvent) {
        match event {
            FastbootEvent::DeviceOpened { serial } => {
                tracing::info!(serial = %serial, "Device opened");
            }
            FastbootEvent::DeviceClosed { serial } => {
                tracing::info!(serial = %serial, "Device closed");
            }
            FastbootEvent::CommandSent { command } => {
                tracing::debug!(command = %command, "Command sent");
            }
            FastbootEvent::ResponseReceived { status, payload } => {
                if *status == ResponseStatus::Info {
                    tracing::info!("(bootloader) {}", payload);
                } else {
                    tracing::debug!(status = %status, payload = %payload, "Response received");
                }
            }
            FastbootEvent::PhaseChanged { from, to } => {
                tracing::trace!(from = %from, to = %to, "Phase changed");
            }
            FastbootEvent::Progress {
                current,
                total,
                bytes_sent,
                bytes_total,
            } => {
                let pct = if *bytes_total > 0 {
                    (*bytes_sent * 100) / *bytes_total
                } else {
                    100
                };
                tracing::debug!(
                    chunk = %format!("{}/{}", current, total),
                    progress = %format!("{}%", pct),
                    "Download progress"
                );
            }
        }
    }
}

impl fmt::Display for FastbootEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FastbootEvent::DeviceOpened { serial } => write!(f, "opened {}", serial),
            FastbootEvent::DeviceClosed { serial } => write!(f, "closed {}", serial),
            FastbootEvent::CommandSent { command } => write!(f, "> {}", command),
            FastbootEvent::ResponseReceived { status, payload } => {
                write!(f, "< {}{}", status, payload)
            }
            FastbootEvent::PhaseChanged { from, to } => write!(f, "{} -> {}", from, to),
            FastbootEvent::Progress {
                current,
                total,
                bytes_sent,
                bytes_total,
            } => write!(
                f,
                "chunk {}/{} ({}/{} bytes)",
                current, total, bytes_sent, bytes_total
            ),
        }
    }
}
