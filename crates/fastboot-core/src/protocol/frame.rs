//! Frame codec: outbound command strings and inbound response frames.
//!
//! Commands are plain ASCII with no length prefix or terminator; the USB
//! transfer boundary delimits them. Responses are a 4-byte status tag
//! followed by the rest of the transfer as payload.

use std::fmt;

use super::constants::*;
use super::status::ResponseStatus;
use crate::error::{FastbootError, Result};

/// An outbound Fastboot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    GetVar(String),
    /// Announce a data phase of the given size in bytes.
    Download(u32),
    Flash(String),
    Erase(String),
    Boot,
    Reboot,
    Continue,
}

impl Command {
    /// Serialize to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Build a `download` command, rejecting sizes that do not fit 8 hex digits.
    pub fn download(len: usize) -> Result<Self> {
        u32::try_from(len)
            .map(Self::Download)
            .map_err(|_| FastbootError::PayloadTooLarge {
                len,
                max: MAX_DOWNLOAD_SIZE,
            })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::GetVar(name) => write!(f, "{}:{}", CMD_GETVAR, name),
            Command::Download(size) => write!(f, "{}:{:08x}", CMD_DOWNLOAD, size),
            Command::Flash(partition) => write!(f, "{}:{}", CMD_FLASH, partition),
            Command::Erase(partition) => write!(f, "{}:{}", CMD_ERASE, partition),
            Command::Boot => f.write_str(CMD_BOOT),
            Command::Reboot => f.write_str(CMD_REBOOT),
            Command::Continue => f.write_str(CMD_CONTINUE),
        }
    }
}

/// Encode a raw command string as-is.
pub fn encode_command(command: &str) -> Vec<u8> {
    command.as_bytes().to_vec()
}

/// One decoded inbound transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: ResponseStatus,
    pub payload: Vec<u8>,
}

impl Response {
    /// Decode a single transfer. No reassembly across transfers is done.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        if raw.len() < STATUS_TAG_LEN {
            return Err(FastbootError::MalformedFrame { len: raw.len() });
        }

        let (tag, payload) = raw.split_at(STATUS_TAG_LEN);
        let mut tag_bytes = [0u8; STATUS_TAG_LEN];
        tag_bytes.copy_from_slice(tag);

        Ok(Self {
            status: ResponseStatus::from_tag(tag_bytes),
            payload: payload.to_vec(),
        })
    }

    /// Payload decoded as text, replacing invalid UTF-8.
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_statuses() {
        for (raw, status) in [
            (&b"OKAYdone"[..], ResponseStatus::Okay),
            (&b"FAILnope"[..], ResponseStatus::Fail),
            (&b"DATA00001000"[..], ResponseStatus::Data),
            (&b"INFOerasing"[..], ResponseStatus::Info),
        ] {
            let resp = Response::decode(raw).unwrap();
            assert_eq!(resp.status, status);
            assert_eq!(resp.payload, raw[4..].to_vec());
        }
    }

    #[test]
    fn test_decode_tag_only() {
        let resp = Response::decode(b"OKAY").unwrap();
        assert_eq!(resp.status, ResponseStatus::Okay);
        assert!(resp.payload.is_empty());
    }

    #[test]
    fn test_decode_binary_payload() {
        let raw = [b'I', b'N', b'F', b'O', 0x00, 0xFF, 0x10];
        let resp = Response::decode(&raw).unwrap();
        assert_eq!(resp.status, ResponseStatus::Info);
        assert_eq!(resp.payload, vec![0x00, 0xFF, 0x10]);
    }

    #[test]
    fn test_decode_short_frame() {
        for raw in [&b""[..], &b"O"[..], &b"OK"[..], &b"OKA"[..]] {
            match Response::decode(raw) {
                Err(FastbootError::MalformedFrame { len }) => assert_eq!(len, raw.len()),
                other => panic!("expected MalformedFrame, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_decode_unrecognized_tag() {
        let resp = Response::decode(b"WHAT?").unwrap();
        assert_eq!(resp.status, ResponseStatus::Unrecognized(*b"WHAT"));
        assert_eq!(resp.payload, b"?".to_vec());
    }

    #[test]
    fn test_encode_commands() {
        assert_eq!(
            Command::GetVar("version".into()).encode(),
            b"getvar:version".to_vec()
        );
        assert_eq!(Command::download(10).unwrap().encode(), b"download:0000000a".to_vec());
        assert_eq!(
            Command::Download(0xDEADBEEF).encode(),
            b"download:deadbeef".to_vec()
        );
        assert_eq!(Command::Flash("boot_a".into()).encode(), b"flash:boot_a".to_vec());
        assert_eq!(Command::Erase("userdata".into()).encode(), b"erase:userdata".to_vec());
        assert_eq!(Command::Boot.encode(), b"boot".to_vec());
        assert_eq!(Command::Reboot.encode(), b"reboot".to_vec());
        assert_eq!(Command::Continue.encode(), b"continue".to_vec());
        assert_eq!(encode_command("getvar:product"), b"getvar:product".to_vec());
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_download_size_limit() {
        assert!(Command::download(MAX_DOWNLOAD_SIZE).is_ok());
        match Command::download(MAX_DOWNLOAD_SIZE + 1) {
            Err(FastbootError::PayloadTooLarge { len, .. }) => {
                assert_eq!(len, MAX_DOWNLOAD_SIZE + 1)
            }
            other => panic!("expected PayloadTooLarge, got {:?}", other),
        }
    }
}
