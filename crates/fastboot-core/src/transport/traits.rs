//! USB Transport layer abstraction.
//!
//! Defines the `UsbTransport` trait for bulk communication with a bound
//! interface, and the `UsbBackend` trait used by the device locator to
//! enumerate candidates and bind them, allowing different implementations
//! (nusb, mock, etc.).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Device enumeration failed: {0}")]
    EnumerationFailed(String),

    #[error("Failed to claim interface {interface}: {message}")]
    ClaimInterfaceFailed { interface: u8, message: String },

    #[error("Endpoint not found: address=0x{address:02X}, direction={direction}")]
    EndpointNotFound { address: u8, direction: String },

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Device disconnected")]
    Disconnected,

    #[error("Timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Bound pair of bulk endpoints on a claimed interface.
///
/// Calls block until the transfer completes or fails. Any timeout is a
/// property of the implementation, not of the caller.
pub trait UsbTransport: Send {
    /// Write raw bytes to the OUT endpoint as one transfer.
    fn write(&self, data: &[u8]) -> Result<usize, TransportError>;

    /// Read one transfer of at most `max_len` bytes from the IN endpoint.
    fn read(&self, max_len: usize) -> Result<Vec<u8>, TransportError>;

    /// Max packet size of the IN endpoint.
    fn max_packet_size_in(&self) -> usize;

    /// Max packet size of the OUT endpoint.
    fn max_packet_size_out(&self) -> usize;

    /// Release the interface claim and any device resources owned by this
    /// transport. Consumes the transport so it cannot be released twice.
    fn release(self) -> Result<(), TransportError>
    where
        Self: Sized,
    {
        drop(self);
        Ok(())
    }
}

/// Class triple of one alternate setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AltSettingDescriptor {
    pub alternate_setting: u8,
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
}

/// One interface with its alternate settings in descriptor order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub interface_number: u8,
    pub alt_settings: Vec<AltSettingDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationDescriptor {
    pub configuration_value: u8,
    pub interfaces: Vec<InterfaceDescriptor>,
}

/// Descriptor tree and identity of an enumerated device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial: Option<String>,
    pub configurations: Vec<ConfigurationDescriptor>,
}

/// A device found during enumeration, not yet claimed.
pub struct Candidate<D> {
    pub descriptor: DeviceDescriptor,
    pub device: D,
}

/// Source of USB devices for the locator.
pub trait UsbBackend {
    /// Backend-specific open device.
    type Device;
    /// Transport produced by a successful bind.
    type Transport: UsbTransport;

    /// List attached devices with their descriptor trees.
    ///
    /// Devices that cannot be inspected are left out; only a failure of
    /// enumeration itself is an error.
    fn enumerate(&self) -> Result<Vec<Candidate<Self::Device>>, TransportError>;

    /// Claim the default interface and resolve the bulk endpoints at
    /// `out_address` and `in_address`.
    fn bind(
        &self,
        device: Self::Device,
        out_address: u8,
        in_address: u8,
    ) -> Result<Self::Transport, TransportError>;
}
