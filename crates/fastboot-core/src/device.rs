//! Device locator and device handle.
//!
//! Devices are matched structurally by the Fastboot interface signature
//! (class 0xFF, subclass 0x42, protocol 0x03), never by vendor/product ID.

use tracing::{debug, info, instrument, warn};

use crate::error::{FastbootError, Result};
use crate::protocol::constants::*;
use crate::transport::{AltSettingDescriptor, DeviceDescriptor, UsbBackend, UsbTransport};

/// Serial used in error context when no particular device is involved.
const ANY_DEVICE: &str = "*";

/// One open, claimed Fastboot interface.
///
/// Owns the transport and its claim. `close` consumes the handle, so the
/// claim is released at most once.
pub struct DeviceHandle<T: UsbTransport> {
    serial: String,
    transport: T,
}

impl<T: UsbTransport> DeviceHandle<T> {
    pub fn new(serial: impl Into<String>, transport: T) -> Self {
        Self {
            serial: serial.into(),
            transport,
        }
    }

    /// Device-reported serial number.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Max packet size of the OUT endpoint.
    pub fn max_packet_size(&self) -> usize {
        self.transport.max_packet_size_out()
    }

    /// Max packet size of the IN endpoint, the size of every read.
    pub fn max_packet_size_in(&self) -> usize {
        self.transport.max_packet_size_in()
    }

    /// Release the interface claim and close the device.
    #[instrument(level = "debug", skip(self), fields(serial = %self.serial))]
    pub fn close(self) -> Result<()> {
        let serial = self.serial;
        self.transport
            .release()
            .map_err(|source| FastbootError::Transport {
                operation: "close",
                serial: serial.clone(),
                source,
            })?;
        debug!(serial = %serial, "Device closed");
        Ok(())
    }
}

impl<T: UsbTransport> std::fmt::Debug for DeviceHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("serial", &self.serial)
            .field("max_packet_in", &self.transport.max_packet_size_in())
            .field("max_packet_out", &self.transport.max_packet_size_out())
            .finish()
    }
}

/// Check one alternate setting against the Fastboot interface signature.
pub fn is_fastboot_alt_setting(alt: &AltSettingDescriptor) -> bool {
    alt.class == FASTBOOT_CLASS
        && alt.subclass == FASTBOOT_SUBCLASS
        && alt.protocol == FASTBOOT_PROTOCOL
}

/// Check whether a device exposes a Fastboot interface.
///
/// Only the first alternate setting of each interface is inspected, so a
/// device whose Fastboot setting is not listed first is not matched.
pub fn is_fastboot_device(descriptor: &DeviceDescriptor) -> bool {
    descriptor
        .configurations
        .iter()
        .flat_map(|config| config.interfaces.iter())
        .filter_map(|iface| iface.alt_settings.first())
        .any(is_fastboot_alt_setting)
}

/// Enumerate attached devices and bind every Fastboot-capable one.
///
/// Devices that fail to bind are skipped. An empty result is not an error.
#[instrument(level = "info", skip(backend))]
pub fn find_devices<B: UsbBackend>(backend: &B) -> Result<Vec<DeviceHandle<B::Transport>>> {
    let candidates = backend
        .enumerate()
        .map_err(|source| FastbootError::Transport {
            operation: "enumerate",
            serial: ANY_DEVICE.to_string(),
            source,
        })?;

    let mut handles = Vec::new();
    for candidate in candidates {
        let descriptor = candidate.descriptor;
        if !is_fastboot_device(&descriptor) {
            continue;
        }

        let serial = descriptor.serial.clone().unwrap_or_else(|| {
            warn!(
                vendor_id = %format!("{:04X}", descriptor.vendor_id),
                product_id = %format!("{:04X}", descriptor.product_id),
                "Fastboot device reports no serial number"
            );
            String::new()
        });

        match backend.bind(candidate.device, BULK_OUT_ENDPOINT, BULK_IN_ENDPOINT) {
            Ok(transport) => {
                info!(
                    serial = %serial,
                    vendor_id = %format!("{:04X}", descriptor.vendor_id),
                    product_id = %format!("{:04X}", descriptor.product_id),
                    "Found Fastboot device"
                );
                handles.push(DeviceHandle::new(serial, transport));
            }
            Err(e) => {
                warn!(serial = %serial, error = %e, "Skipping Fastboot device that cannot be bound");
            }
        }
    }

    debug!(count = handles.len(), "Enumeration complete");
    Ok(handles)
}

/// Find the Fastboot device with the given serial number.
///
/// Other bound devices are released before returning.
#[instrument(level = "info", skip(backend))]
pub fn find_device<B: UsbBackend>(backend: &B, serial: &str) -> Result<DeviceHandle<B::Transport>> {
    let mut found = None;
    for handle in find_devices(backend)? {
        if found.is_none() && handle.serial() == serial {
            found = Some(handle);
        } else if let Err(e) = handle.close() {
            warn!(error = %e, "Failed to release unselected device");
        }
    }

    found.ok_or_else(|| FastbootError::DeviceNotFound {
        serial: serial.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::single_interface_descriptor;
    use crate::transport::{
        ConfigurationDescriptor, InterfaceDescriptor, MockBackend, MockTransport,
    };

    fn two_device_backend() -> (MockBackend, MockTransport, MockTransport) {
        let fastboot = MockTransport::new();
        let other = MockTransport::new();
        let mut backend = MockBackend::new();
        backend.add_fastboot_device("FB0001", fastboot.clone());
        // Mass storage device
        backend.add_device(single_interface_descriptor("MS0001", 0x08, 0x06, 0x50), other.clone());
        (backend, fastboot, other)
    }

    #[test]
    fn test_find_devices_filters_signature() {
        let (backend, _, _) = two_device_backend();
        let handles = find_devices(&backend).unwrap();
        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].serial(), "FB0001");
    }

    #[test]
    fn test_find_device_by_serial() {
        let (backend, fastboot, _) = two_device_backend();
        let handle = find_device(&backend, "FB0001").unwrap();
        assert_eq!(handle.serial(), "FB0001");
        handle.close().unwrap();
        assert!(fastboot.is_released());
    }

    #[test]
    fn test_find_device_unknown_serial() {
        let (backend, _, _) = two_device_backend();
        for serial in ["MS0001", "nope", ""] {
            match find_device(&backend, serial) {
                Err(FastbootError::DeviceNotFound { serial: s }) => assert_eq!(s, serial),
                other => panic!("expected DeviceNotFound, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_find_device_releases_others() {
        let first = MockTransport::new();
        let second = MockTransport::new();
        let mut backend = MockBackend::new();
        backend.add_fastboot_device("A", first.clone());
        backend.add_fastboot_device("B", second.clone());

        let handle = find_device(&backend, "B").unwrap();
        assert_eq!(handle.serial(), "B");
        assert!(first.is_released());
        assert!(!second.is_released());
    }

    #[test]
    fn test_no_devices_is_empty() {
        let backend = MockBackend::new();
        assert!(find_devices(&backend).unwrap().is_empty());
        assert!(matches!(
            find_device(&backend, "FB0001"),
            Err(FastbootError::DeviceNotFound { .. })
        ));
    }

    #[test]
    fn test_bind_failure_skips_device() {
        let mut backend = MockBackend::new();
        backend.add_fastboot_device("BROKEN", MockTransport::new());
        backend.add_fastboot_device("GOOD", MockTransport::new());
        backend.fail_bind("BROKEN");

        let handles = find_devices(&backend).unwrap();
        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].serial(), "GOOD");
    }

    #[test]
    fn test_enumeration_failure_is_error() {
        let mut backend = MockBackend::new();
        backend.fail_enumeration();
        match find_devices(&backend) {
            Err(e) => assert!(e.is_transport()),
            Ok(_) => panic!("expected enumeration error"),
        }
    }

    #[test]
    fn test_only_first_alt_setting_is_inspected() {
        let mut desc = single_interface_descriptor("ALT", 0x0A, 0x00, 0x00);
        desc.configurations[0].interfaces[0]
            .alt_settings
            .push(AltSettingDescriptor {
                alternate_setting: 1,
                class: FASTBOOT_CLASS,
                subclass: FASTBOOT_SUBCLASS,
                protocol: FASTBOOT_PROTOCOL,
            });
        assert!(!is_fastboot_device(&desc));
    }

    #[test]
    fn test_fastboot_on_second_interface() {
        let mut desc = single_interface_descriptor("ADB", 0x02, 0x02, 0x01);
        desc.configurations.push(ConfigurationDescriptor {
            configuration_value: 2,
            interfaces: vec![InterfaceDescriptor {
                interface_number: 1,
                alt_settings: vec![AltSettingDescriptor {
                    alternate_setting: 0,
                    class: FASTBOOT_CLASS,
                    subclass: FASTBOOT_SUBCLASS,
                    protocol: FASTBOOT_PROTOCOL,
                }],
            }],
        });
        assert!(is_fastboot_device(&desc));
    }

    #[test]
    fn test_max_packet_sizes() {
        let transport = MockTransport::new().with_max_packet_sizes(64, 512);
        let handle = DeviceHandle::new("X", transport);
        assert_eq!(handle.max_packet_size(), 512);
        assert_eq!(handle.max_packet_size_in(), 64);
    }
}
