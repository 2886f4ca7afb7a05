//! nusb-based USB transport and backend implementation.
//!
//! Key nusb 0.2 API patterns:
//! - `list_devices().wait()` for blocking enumeration
//! - `device_info.open().wait()` to open a device and read its descriptors
//! - `device.claim_interface(n).wait()` to claim an interface
//! - `interface.endpoint::<Bulk, Out>(addr)` to get an endpoint
//! - endpoint `.writer(buf_size)` / `.reader(buf_size)` for blocking I/O

use nusb::descriptors::TransferType;
use nusb::transfer::{Bulk, Direction, In, Out};
use nusb::{Device, Interface, MaybeFuture, list_devices};
use std::io::{self, Read, Write};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::traits::{
    AltSettingDescriptor, Candidate, ConfigurationDescriptor, DeviceDescriptor,
    InterfaceDescriptor, TransportError, UsbBackend, UsbTransport,
};
use crate::config::TransportConfig;

/// Interface claimed when binding a device.
const DEFAULT_INTERFACE: u8 = 0;

/// Buffer size of the bulk OUT writer.
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// nusb-based USB transport bound to one claimed interface.
pub struct NusbTransport {
    interface: Interface,
    in_endpoint: u8,
    out_endpoint: u8,
    max_packet_in: usize,
    max_packet_out: usize,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

fn map_io_error(
    e: io::Error,
    timeout: Option<Duration>,
    wrap: fn(String) -> TransportError,
) -> TransportError {
    match (e.kind(), timeout) {
        (io::ErrorKind::TimedOut, Some(t)) => TransportError::Timeout {
            timeout_ms: t.as_millis() as u64,
        },
        _ => wrap(e.to_string()),
    }
}

impl UsbTransport for NusbTransport {
    #[instrument(skip(self, data), fields(len = data.len()))]
    fn write(&self, data: &[u8]) -> Result<usize, TransportError> {
        let ep = self
            .interface
            .endpoint::<Bulk, Out>(self.out_endpoint)
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;

        let mut writer = ep.writer(WRITE_BUFFER_SIZE);
        if let Some(timeout) = self.write_timeout {
            writer.set_write_timeout(timeout);
        }
        writer
            .write_all(data)
            .map_err(|e| map_io_error(e, self.write_timeout, TransportError::WriteFailed))?;
        writer
            .flush()
            .map_err(|e| map_io_error(e, self.write_timeout, TransportError::WriteFailed))?;

        debug!(bytes_written = data.len(), "Write complete");
        Ok(data.len())
    }

    #[instrument(skip(self), fields(max_len))]
    fn read(&self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        let ep = self
            .interface
            .endpoint::<Bulk, In>(self.in_endpoint)
            .map_err(|e| TransportError::ReadFailed(e.to_string()))?;

        let mut reader = ep.reader(self.max_packet_in.max(max_len));
        if let Some(timeout) = self.read_timeout {
            reader.set_read_timeout(timeout);
        }
        let mut buf = vec![0u8; max_len];

        let n = reader
            .read(&mut buf)
            .map_err(|e| map_io_error(e, self.read_timeout, TransportError::ReadFailed))?;

        buf.truncate(n);
        debug!(bytes_read = n, "Read complete");
        Ok(buf)
    }

    fn max_packet_size_in(&self) -> usize {
        self.max_packet_in
    }

    fn max_packet_size_out(&self) -> usize {
        self.max_packet_out
    }

    fn release(self) -> Result<(), TransportError> {
        // Dropping the interface releases the claim; the device closes
        // once its last reference goes away.
        drop(self.interface);
        debug!("Interface released");
        Ok(())
    }
}

/// Device source backed by the host USB stack.
#[derive(Debug, Default, Clone)]
pub struct NusbBackend {
    config: TransportConfig,
}

impl NusbBackend {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    fn read_descriptors(device_info: &nusb::DeviceInfo, device: &Device) -> DeviceDescriptor {
        let configurations = device
            .configurations()
            .map(|config| ConfigurationDescriptor {
                configuration_value: config.configuration_value(),
                interfaces: config
                    .interfaces()
                    .map(|iface| InterfaceDescriptor {
                        interface_number: iface.interface_number(),
                        alt_settings: iface
                            .alt_settings()
                            .map(|alt| AltSettingDescriptor {
                                alternate_setting: alt.alternate_setting(),
                                class: alt.class(),
                                subclass: alt.subclass(),
                                protocol: alt.protocol(),
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        DeviceDescriptor {
            vendor_id: device_info.vendor_id(),
            product_id: device_info.product_id(),
            serial: device_info.serial_number().map(str::to_string),
            configurations,
        }
    }
}

impl UsbBackend for NusbBackend {
    type Device = Device;
    type Transport = NusbTransport;

    #[instrument(level = "debug", skip(self))]
    fn enumerate(&self) -> Result<Vec<Candidate<Device>>, TransportError> {
        let devices = list_devices()
            .wait()
            .map_err(|e| TransportError::EnumerationFailed(e.to_string()))?;

        let mut candidates = Vec::new();
        for device_info in devices {
            let device = match device_info.open().wait() {
                Ok(d) => d,
                Err(e) => {
                    debug!(
                        vendor_id = %format!("{:04X}", device_info.vendor_id()),
                        product_id = %format!("{:04X}", device_info.product_id()),
                        error = %e,
                        "Skipping device that cannot be opened"
                    );
                    continue;
                }
            };

            candidates.push(Candidate {
                descriptor: Self::read_descriptors(&device_info, &device),
                device,
            });
        }

        Ok(candidates)
    }

    #[instrument(level = "debug", skip(self, device), fields(
        out_ep = %format!("0x{:02X}", out_address),
        in_ep = %format!("0x{:02X}", in_address),
    ))]
    fn bind(
        &self,
        device: Device,
        out_address: u8,
        in_address: u8,
    ) -> Result<NusbTransport, TransportError> {
        let interface = device
            .claim_interface(DEFAULT_INTERFACE)
            .wait()
            .map_err(|e| TransportError::ClaimInterfaceFailed {
                interface: DEFAULT_INTERFACE,
                message: e.to_string(),
            })?;

        let mut max_packet_in: Option<usize> = None;
        let mut max_packet_out: Option<usize> = None;

        for config in device.configurations() {
            for iface in config.interfaces() {
                if iface.interface_number() != DEFAULT_INTERFACE {
                    continue;
                }
                for alt in iface.alt_settings() {
                    for ep in alt.endpoints() {
                        if ep.transfer_type() != TransferType::Bulk {
                            continue;
                        }
                        if ep.direction() == Direction::In && ep.address() == in_address {
                            max_packet_in.get_or_insert(ep.max_packet_size());
                        } else if ep.direction() == Direction::Out && ep.address() == out_address
                        {
                            max_packet_out.get_or_insert(ep.max_packet_size());
                        }
                    }
                }
            }
        }

        let max_packet_in = max_packet_in.ok_or(TransportError::EndpointNotFound {
            address: in_address,
            direction: "In".into(),
        })?;
        let max_packet_out = max_packet_out.ok_or(TransportError::EndpointNotFound {
            address: out_address,
            direction: "Out".into(),
        })?;

        if max_packet_in == 0 {
            warn!("IN endpoint reports a max packet size of 0");
        }

        info!(
            in_ep = %format!("0x{:02X}", in_address),
            out_ep = %format!("0x{:02X}", out_address),
            max_packet_in,
            max_packet_out,
            "Interface claimed"
        );

        Ok(NusbTransport {
            interface,
            in_endpoint: in_address,
            out_endpoint: out_address,
            max_packet_in,
            max_packet_out,
            read_timeout: self.config.read_timeout(),
            write_timeout: self.config.write_timeout(),
        })
    }
}
