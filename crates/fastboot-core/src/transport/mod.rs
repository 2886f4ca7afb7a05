//! Transport layer module.

pub mod mock;
pub mod nusb;
pub mod traits;

pub use mock::{MockBackend, MockDevice, MockTransport};
pub use nusb::{NusbBackend, NusbTransport};
pub use traits::{
    AltSettingDescriptor, Candidate, ConfigurationDescriptor, DeviceDescriptor,
    InterfaceDescriptor, TransportError, UsbBackend, UsbTransport,
};
