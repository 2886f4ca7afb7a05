//! Response status tags.
//!
//! Every inbound Fastboot frame starts with a 4-byte ASCII tag.
//! This module provides type-safe parsing and display of that tag.

use std::fmt;

use super::constants::{TAG_DATA, TAG_FAIL, TAG_INFO, TAG_OKAY};

/// Status tag of a decoded response frame.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseStatus {
    /// Command succeeded.
    Okay,
    /// Command rejected by the device.
    Fail,
    /// Device is ready to receive the data phase.
    Data,
    /// Informational message, no phase transition.
    Info,
    /// Any other 4-byte tag, kept verbatim for diagnostics.
    Unrecognized([u8; 4]),
}

impl ResponseStatus {
    /// Classify a 4-byte tag. Unknown tags are not an error.
    pub fn from_tag(tag: [u8; 4]) -> Self {
        match &tag {
            TAG_OKAY => Self::Okay,
            TAG_FAIL => Self::Fail,
            TAG_DATA => Self::Data,
            TAG_INFO => Self::Info,
            _ => Self::Unrecognized(tag),
        }
    }

    /// Raw tag bytes as they appear on the wire.
    pub fn tag(&self) -> [u8; 4] {
        match self {
            Self::Okay => *TAG_OKAY,
            Self::Fail => *TAG_FAIL,
            Self::Data => *TAG_DATA,
            Self::Info => *TAG_INFO,
            Self::Unrecognized(tag) => *tag,
        }
    }

    /// Get ASCII representation if printable.
    pub fn as_ascii(&self) -> String {
        self.tag()
            .iter()
            .map(|&b| {
                if b.is_ascii_graphic() || b == b' ' {
                    b as char
                } else {
                    '.'
                }
            })
            .collect()
    }
}

impl fmt::Debug for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unrecognized(tag) => write!(
                f,
                "Unrecognized({:08X} '{}')",
                u32::from_be_bytes(*tag),
                self.as_ascii()
            ),
            _ => write!(f, "{}", self.as_ascii()),
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_ascii())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tags() {
        assert_eq!(ResponseStatus::from_tag(*b"OKAY"), ResponseStatus::Okay);
        assert_eq!(ResponseStatus::from_tag(*b"FAIL"), ResponseStatus::Fail);
        assert_eq!(ResponseStatus::from_tag(*b"DATA"), ResponseStatus::Data);
        assert_eq!(ResponseStatus::from_tag(*b"INFO"), ResponseStatus::Info);
    }

    #[test]
    fn test_unrecognized_tag_is_kept() {
        let status = ResponseStatus::from_tag(*b"okay");
        assert_eq!(status, ResponseStatus::Unrecognized(*b"okay"));
        assert_eq!(status.tag(), *b"okay");
        assert_eq!(status.to_string(), "okay");
    }

    #[test]
    fn test_non_printable_tag_display() {
        let status = ResponseStatus::from_tag([0x00, b'A', 0xFF, b'B']);
        assert_eq!(status.as_ascii(), ".A.B");
        assert_eq!(format!("{:?}", status), "Unrecognized(0041FF42 '.A.B')");
    }
}
