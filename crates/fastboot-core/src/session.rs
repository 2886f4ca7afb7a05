//! Fastboot session - the request/response protocol engine.
//!
//! Every operation is a fresh, blocking pass through the exchange state
//! machine: write one command, then do exactly one read per expected frame.
//! `INFO` frames are not drained, so a device that sends several of them
//! before its final status will desynchronize the session.

use std::sync::Arc;

use tracing::{debug, info, instrument, trace};

use crate::device::DeviceHandle;
use crate::error::{FastbootError, Result};
use crate::events::{FastbootEvent, FastbootObserver, TracingObserver};
use crate::payload::DataChunks;
use crate::protocol::{Command, Response, ResponseStatus};
use crate::state::ExchangePhase;
use crate::transport::{TransportError, UsbTransport};

/// Protocol engine bound to one open device.
pub struct FastbootSession<T: UsbTransport, O: FastbootObserver = TracingObserver> {
    handle: DeviceHandle<T>,
    observer: Arc<O>,
    phase: ExchangePhase,
}

impl<T: UsbTransport> FastbootSession<T, TracingObserver> {
    /// Create a new session with default tracing observer.
    pub fn new(handle: DeviceHandle<T>) -> Self {
        Self::with_observer(handle, Arc::new(TracingObserver))
    }
}

impl<T: UsbTransport, O: FastbootObserver> FastbootSession<T, O> {
    /// Create a new session with a custom observer.
    pub fn with_observer(handle: DeviceHandle<T>, observer: Arc<O>) -> Self {
        observer.on_event(&FastbootEvent::DeviceOpened {
            serial: handle.serial().to_string(),
        });
        Self {
            handle,
            observer,
            phase: ExchangePhase::Idle,
        }
    }

    pub fn handle(&self) -> &DeviceHandle<T> {
        &self.handle
    }

    pub fn serial(&self) -> &str {
        self.handle.serial()
    }

    /// Phase reached by the most recent operation.
    pub fn phase(&self) -> ExchangePhase {
        self.phase
    }

    /// Max packet size of the OUT endpoint.
    pub fn max_packet_size(&self) -> usize {
        self.handle.max_packet_size()
    }

    /// Give the device handle back without closing it.
    pub fn into_handle(self) -> DeviceHandle<T> {
        self.handle
    }

    /// Release the device.
    pub fn close(self) -> Result<()> {
        let serial = self.handle.serial().to_string();
        self.handle.close()?;
        self.observer
            .on_event(&FastbootEvent::DeviceClosed { serial });
        Ok(())
    }

    fn goto_phase(&mut self, new_phase: ExchangePhase) {
        let from = self.phase;
        self.phase = new_phase;
        self.observer.on_event(&FastbootEvent::PhaseChanged {
            from,
            to: new_phase,
        });
    }

    /// Record a failure and pass the error through.
    fn fail<R>(&mut self, error: FastbootError) -> Result<R> {
        self.goto_phase(ExchangePhase::Failed);
        Err(error)
    }

    /// Single blocking write to the OUT endpoint. A write that accepts
    /// fewer bytes than given is a transport failure.
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        let written = self
            .handle
            .transport()
            .write(data)
            .and_then(|n| {
                if n == data.len() {
                    Ok(n)
                } else {
                    Err(TransportError::WriteFailed(format!(
                        "short write: {} of {} bytes",
                        n,
                        data.len()
                    )))
                }
            })
            .map_err(|source| FastbootError::Transport {
                operation: "write",
                serial: self.handle.serial().to_string(),
                source,
            })?;
        trace!(bytes = written, "Sent");
        Ok(())
    }

    /// Single blocking read of up to one IN max packet, decoded as a frame.
    pub fn receive(&mut self) -> Result<Response> {
        let max_len = self.handle.max_packet_size_in();
        let bytes = self
            .handle
            .transport()
            .read(max_len)
            .map_err(|source| FastbootError::Transport {
                operation: "read",
                serial: self.handle.serial().to_string(),
                source,
            })?;

        let response = Response::decode(&bytes)?;
        self.observer.on_event(&FastbootEvent::ResponseReceived {
            status: response.status,
            payload: response.payload_text(),
        });
        Ok(response)
    }

    fn send_command(&mut self, command: &Command) -> Result<()> {
        let text = command.to_string();
        self.send(&command.encode())?;
        self.observer
            .on_event(&FastbootEvent::CommandSent { command: text });
        Ok(())
    }

    /// Send one command and read exactly one frame.
    fn exchange(&mut self, command: &Command) -> Result<Response> {
        self.goto_phase(ExchangePhase::Idle);
        if let Err(e) = self.send_command(command) {
            return self.fail(e);
        }
        self.goto_phase(ExchangePhase::CommandSent);
        self.goto_phase(ExchangePhase::AwaitingResponse);
        match self.receive() {
            Ok(response) => Ok(response),
            Err(e) => self.fail(e),
        }
    }

    /// Read a variable with `getvar:<name>`.
    ///
    /// A `FAIL` answer maps to `VariableNotFound`; the device's message is
    /// not kept.
    #[instrument(skip(self), fields(serial = %self.handle.serial()))]
    pub fn get_variable(&mut self, name: &str) -> Result<String> {
        let response = self.exchange(&Command::GetVar(name.to_string()))?;
        if response.status == ResponseStatus::Fail {
            debug!(payload = %response.payload_text(), "getvar failed");
            return self.fail(FastbootError::VariableNotFound {
                name: name.to_string(),
            });
        }
        self.goto_phase(ExchangePhase::Done);
        Ok(response.payload_text())
    }

    /// Transfer `payload` to the device's download buffer.
    #[instrument(skip(self, payload), fields(serial = %self.handle.serial(), len = payload.len()))]
    pub fn download(&mut self, payload: &[u8]) -> Result<()> {
        self.goto_phase(ExchangePhase::Idle);
        let command = match Command::download(payload.len()) {
            Ok(c) => c,
            Err(e) => return self.fail(e),
        };

        if let Err(e) = self.send_command(&command) {
            return self.fail(e);
        }
        self.goto_phase(ExchangePhase::DownloadRequested);

        let response = match self.receive() {
            Ok(r) => r,
            Err(e) => return self.fail(e),
        };
        if response.status != ResponseStatus::Data {
            return self.fail(FastbootError::DownloadRejected {
                status: response.status,
                payload: response.payload_text(),
            });
        }

        let mut chunks = DataChunks::protocol(payload);
        let total = chunks.total();
        let bytes_total = payload.len() as u64;
        while let Some(chunk) = chunks.next() {
            self.goto_phase(ExchangePhase::DataPhase {
                chunk: chunks.current(),
                total,
            });
            if let Err(e) = self.send(chunk) {
                return self.fail(e);
            }
            self.observer.on_event(&FastbootEvent::Progress {
                current: chunks.current() as u64,
                total: total as u64,
                bytes_sent: chunks.offset() as u64,
                bytes_total,
            });
        }

        self.goto_phase(ExchangePhase::AwaitingTerminalStatus);
        let response = match self.receive() {
            Ok(r) => r,
            Err(e) => return self.fail(e),
        };
        if response.status != ResponseStatus::Okay {
            return self.fail(FastbootError::DownloadIncomplete {
                status: response.status,
                payload: response.payload_text(),
            });
        }

        self.goto_phase(ExchangePhase::Done);
        info!(bytes = payload.len(), chunks = total, "Download complete");
        Ok(())
    }

    /// Download `payload` and write it to `partition`.
    #[instrument(skip(self, payload), fields(serial = %self.handle.serial(), len = payload.len()))]
    pub fn flash(&mut self, partition: &str, payload: &[u8]) -> Result<()> {
        self.download(payload)?;

        let response = self.exchange(&Command::Flash(partition.to_string()))?;
        if response.status != ResponseStatus::Okay {
            return self.fail(FastbootError::FlashFailed {
                partition: partition.to_string(),
                status: response.status,
                payload: response.payload_text(),
            });
        }

        self.goto_phase(ExchangePhase::Done);
        info!(partition = %partition, "Flash complete");
        Ok(())
    }

    /// Download `payload` and boot it.
    #[instrument(skip(self, payload), fields(serial = %self.handle.serial(), len = payload.len()))]
    pub fn boot_image(&mut self, payload: &[u8]) -> Result<()> {
        self.download(payload)?;

        let response = self.exchange(&Command::Boot)?;
        if response.status != ResponseStatus::Okay {
            return self.fail(FastbootError::BootFailed {
                status: response.status,
                payload: response.payload_text(),
            });
        }

        self.goto_phase(ExchangePhase::Done);
        info!("Boot command accepted");
        Ok(())
    }

    /// Erase a partition.
    #[instrument(skip(self), fields(serial = %self.handle.serial()))]
    pub fn erase(&mut self, partition: &str) -> Result<()> {
        self.simple_command(Command::Erase(partition.to_string()))
    }

    /// Reboot the device.
    #[instrument(skip(self), fields(serial = %self.handle.serial()))]
    pub fn reboot(&mut self) -> Result<()> {
        self.simple_command(Command::Reboot)
    }

    /// Continue the normal boot process.
    #[instrument(skip(self), fields(serial = %self.handle.serial()))]
    pub fn continue_boot(&mut self) -> Result<()> {
        self.simple_command(Command::Continue)
    }

    fn simple_command(&mut self, command: Command) -> Result<()> {
        let response = self.exchange(&command)?;
        if response.status != ResponseStatus::Okay {
            return self.fail(FastbootError::CommandFailed {
                command: command.to_string(),
                status: response.status,
                payload: response.payload_text(),
            });
        }
        self.goto_phase(ExchangePhase::Done);
        Ok(())
    }
}
