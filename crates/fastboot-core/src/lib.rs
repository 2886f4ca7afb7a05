//! Fastboot-Core: host-side Fastboot protocol implementation in Rust.
//!
//! This crate locates devices running a Fastboot-compatible bootloader over
//! USB and drives the request/response protocol (`getvar`, `download`,
//! `flash`, `boot`) on top of a raw bulk transport.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Transport**: USB communication abstraction (nusb, mock)
//! - **Device**: Locating Fastboot interfaces and owning their claim
//! - **Protocol**: Command encoding, response frame decoding, status tags
//! - **Session**: The protocol engine, including the chunked data phase
//! - **Events**: Observer pattern for UI decoupling
//!
//! # Example
//!
//! ```no_run
//! use fastboot_core::{FastbootSession, NusbBackend, TransportConfig, find_device};
//!
//! let backend = NusbBackend::new(TransportConfig::default());
//! let handle = find_device(&backend, "0123456789ABCDEF").expect("device not found");
//!
//! let mut session = FastbootSession::new(handle);
//! println!("{}", session.get_variable("product").expect("getvar failed"));
//! session.flash("boot", &std::fs::read("boot.img").unwrap()).expect("flash failed");
//! session.close().expect("close failed");
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod payload;
pub mod protocol;
pub mod session;
pub mod state;
pub mod transport;

// Re-exports for convenience
pub use config::TransportConfig;
pub use device::{DeviceHandle, find_device, find_devices, is_fastboot_device};
pub use error::{FastbootError, Result};
pub use events::{FastbootEvent, FastbootObserver, NullObserver, TracingObserver};
pub use payload::DataChunks;
pub use protocol::{Command, Response, ResponseStatus};
pub use session::FastbootSession;
pub use state::ExchangePhase;
pub use transport::{
    MockBackend, MockTransport, NusbBackend, NusbTransport, TransportError, UsbBackend,
    UsbTransport,
};
