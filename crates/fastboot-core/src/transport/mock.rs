//! Mock USB transport and backend for testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::traits::{
    AltSettingDescriptor, Candidate, ConfigurationDescriptor, DeviceDescriptor,
    InterfaceDescriptor, TransportError, UsbBackend, UsbTransport,
};
use crate::protocol::{FASTBOOT_CLASS, FASTBOOT_PROTOCOL, FASTBOOT_SUBCLASS, ResponseStatus};

/// Mock transport for unit testing protocol logic.
///
/// Clones share state, so a test can keep one clone for inspection while
/// another is owned by a device handle.
#[derive(Clone)]
pub struct MockTransport {
    /// Queued inbound transfers to return on read.
    response_queue: Arc<Mutex<VecDeque<Vec<u8>>>>,
    /// Captured writes.
    write_log: Arc<Mutex<Vec<Vec<u8>>>>,
    /// Index of the write that should fail, if any.
    fail_write_at: Arc<Mutex<Option<usize>>>,
    /// Max bytes accepted per write, if limited.
    write_limit: Arc<Mutex<Option<usize>>>,
    /// Whether device is "connected".
    connected: Arc<Mutex<bool>>,
    /// Whether the transport has been released.
    released: Arc<Mutex<bool>>,
    max_packet_in: usize,
    max_packet_out: usize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            response_queue: Arc::new(Mutex::new(VecDeque::new())),
            write_log: Arc::new(Mutex::new(Vec::new())),
            fail_write_at: Arc::new(Mutex::new(None)),
            write_limit: Arc::new(Mutex::new(None)),
            connected: Arc::new(Mutex::new(true)),
            released: Arc::new(Mutex::new(false)),
            max_packet_in: 512,
            max_packet_out: 512,
        }
    }

    /// Set both endpoint max packet sizes.
    pub fn with_max_packet_sizes(mut self, max_in: usize, max_out: usize) -> Self {
        self.max_packet_in = max_in;
        self.max_packet_out = max_out;
        self
    }

    /// Queue a raw inbound transfer to be returned on next read.
    pub fn queue_response(&self, bytes: &[u8]) {
        self.response_queue
            .lock()
            .unwrap()
            .push_back(bytes.to_vec());
    }

    /// Queue a frame built from a status tag and payload.
    pub fn queue_status(&self, status: ResponseStatus, payload: &str) {
        let mut frame = status.tag().to_vec();
        frame.extend_from_slice(payload.as_bytes());
        self.queue_response(&frame);
    }

    /// Number of queued responses not yet read.
    pub fn pending_responses(&self) -> usize {
        self.response_queue.lock().unwrap().len()
    }

    /// Get all captured writes.
    pub fn get_writes(&self) -> Vec<Vec<u8>> {
        self.write_log.lock().unwrap().clone()
    }

    /// Accept at most `limit` bytes per write, like a transport that
    /// completes transfers short.
    pub fn limit_write_len(&self, limit: usize) {
        *self.write_limit.lock().unwrap() = Some(limit);
    }

    /// Make the write with the given zero-based index fail.
    pub fn fail_write_at(&self, index: usize) {
        *self.fail_write_at.lock().unwrap() = Some(index);
    }

    /// Simulate device disconnect.
    pub fn disconnect(&self) {
        *self.connected.lock().unwrap() = false;
    }

    /// Simulate device reconnect.
    pub fn reconnect(&self) {
        *self.connected.lock().unwrap() = true;
    }

    pub fn is_released(&self) -> bool {
        *self.released.lock().unwrap()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UsbTransport for MockTransport {
    fn write(&self, data: &[u8]) -> Result<usize, TransportError> {
        if !*self.connected.lock().unwrap() {
            return Err(TransportError::Disconnected);
        }
        let mut log = self.write_log.lock().unwrap();
        if *self.fail_write_at.lock().unwrap() == Some(log.len()) {
            return Err(TransportError::WriteFailed("simulated write failure".into()));
        }
        let accepted = match *self.write_limit.lock().unwrap() {
            Some(limit) => data.len().min(limit),
            None => data.len(),
        };
        log.push(data[..accepted].to_vec());
        Ok(accepted)
    }

    fn read(&self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        if !*self.connected.lock().unwrap() {
            return Err(TransportError::Disconnected);
        }
        let mut bytes = self
            .response_queue
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(TransportError::Timeout { timeout_ms: 5000 })?;
        bytes.truncate(max_len);
        Ok(bytes)
    }

    fn max_packet_size_in(&self) -> usize {
        self.max_packet_in
    }

    fn max_packet_size_out(&self) -> usize {
        self.max_packet_out
    }

    fn release(self) -> Result<(), TransportError> {
        *self.released.lock().unwrap() = true;
        Ok(())
    }
}

/// A simulated device known to `MockBackend`.
#[derive(Clone)]
pub struct MockDevice {
    pub transport: MockTransport,
    /// Make `bind` fail for this device.
    pub bind_fails: bool,
}

/// Mock backend serving a fixed list of devices.
#[derive(Default)]
pub struct MockBackend {
    devices: Vec<(DeviceDescriptor, MockDevice)>,
    enumeration_fails: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device with an arbitrary descriptor tree.
    pub fn add_device(&mut self, descriptor: DeviceDescriptor, transport: MockTransport) {
        self.devices.push((
            descriptor,
            MockDevice {
                transport,
                bind_fails: false,
            },
        ));
    }

    /// Add a device exposing the Fastboot interface on interface 0.
    pub fn add_fastboot_device(&mut self, serial: &str, transport: MockTransport) {
        self.add_device(
            single_interface_descriptor(
                serial,
                FASTBOOT_CLASS,
                FASTBOOT_SUBCLASS,
                FASTBOOT_PROTOCOL,
            ),
            transport,
        );
    }

    /// Make `bind` fail for the device with this serial.
    pub fn fail_bind(&mut self, serial: &str) {
        for (desc, device) in &mut self.devices {
            if desc.serial.as_deref() == Some(serial) {
                device.bind_fails = true;
            }
        }
    }

    /// Make `enumerate` itself fail.
    pub fn fail_enumeration(&mut self) {
        self.enumeration_fails = true;
    }
}

/// Descriptor tree with one configuration holding one interface.
pub fn single_interface_descriptor(
    serial: &str,
    class: u8,
    subclass: u8,
    protocol: u8,
) -> DeviceDescriptor {
    DeviceDescriptor {
        vendor_id: 0x18D1,
        product_id: 0x4EE0,
        serial: Some(serial.to_string()),
        configurations: vec![ConfigurationDescriptor {
            configuration_value: 1,
            interfaces: vec![InterfaceDescriptor {
                interface_number: 0,
                alt_settings: vec![AltSettingDescriptor {
                    alternate_setting: 0,
                    class,
                    subclass,
                    protocol,
                }],
            }],
        }],
    }
}

impl UsbBackend for MockBackend {
    type Device = MockDevice;
    type Transport = MockTransport;

    fn enumerate(&self) -> Result<Vec<Candidate<MockDevice>>, TransportError> {
        if self.enumeration_fails {
            return Err(TransportError::EnumerationFailed(
                "simulated enumeration failure".into(),
            ));
        }
        Ok(self
            .devices
            .iter()
            .map(|(descriptor, device)| Candidate {
                descriptor: descriptor.clone(),
                device: device.clone(),
            })
            .collect())
    }

    fn bind(
        &self,
        device: MockDevice,
        _out_address: u8,
        _in_address: u8,
    ) -> Result<MockTransport, TransportError> {
        if device.bind_fails {
            return Err(TransportError::ClaimInterfaceFailed {
                interface: 0,
                message: "simulated claim failure".into(),
            });
        }
        Ok(device.transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_response_queue() {
        let mock = MockTransport::new();
        mock.queue_status(ResponseStatus::Data, "00001000");
        mock.queue_response(b"OKAY");

        assert_eq!(mock.read(64).unwrap(), b"DATA00001000".to_vec());
        assert_eq!(mock.read(64).unwrap(), b"OKAY".to_vec());

        // Queue is empty now
        assert!(mock.read(64).is_err());
    }

    #[test]
    fn test_mock_read_truncates_to_max_len() {
        let mock = MockTransport::new();
        mock.queue_response(b"INFOlong message");
        assert_eq!(mock.read(6).unwrap(), b"INFOlo".to_vec());
    }

    #[test]
    fn test_mock_write_capture() {
        let mock = MockTransport::new();
        mock.write(b"Hello").unwrap();
        mock.write(b"World").unwrap();

        let writes = mock.get_writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0], b"Hello");
        assert_eq!(writes[1], b"World");
    }

    #[test]
    fn test_mock_write_failure() {
        let mock = MockTransport::new();
        mock.fail_write_at(1);
        assert!(mock.write(b"first").is_ok());
        assert!(matches!(
            mock.write(b"second"),
            Err(TransportError::WriteFailed(_))
        ));
        assert_eq!(mock.get_writes().len(), 1);
    }

    #[test]
    fn test_mock_short_write() {
        let mock = MockTransport::new();
        mock.limit_write_len(3);
        assert_eq!(mock.write(b"download").unwrap(), 3);
        assert_eq!(mock.write(b"ok").unwrap(), 2);
        assert_eq!(mock.get_writes(), vec![b"dow".to_vec(), b"ok".to_vec()]);
    }

    #[test]
    fn test_mock_disconnect() {
        let mock = MockTransport::new();
        mock.disconnect();
        assert!(mock.write(b"test").is_err());
        mock.reconnect();
        assert!(mock.write(b"test").is_ok());
    }

    #[test]
    fn test_mock_release_is_shared() {
        let mock = MockTransport::new();
        let observer = mock.clone();
        mock.release().unwrap();
        assert!(observer.is_released());
    }
}
