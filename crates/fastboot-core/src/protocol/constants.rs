// Interface signature of a Fastboot-capable USB interface
pub const FASTBOOT_CLASS: u8 = 0xFF;
pub const FASTBOOT_SUBCLASS: u8 = 0x42;
pub const FASTBOOT_PROTOCOL: u8 = 0x03;

// Bulk endpoint addresses on the default interface
pub const BULK_OUT_ENDPOINT: u8 = 0x01;
pub const BULK_IN_ENDPOINT: u8 = 0x81;

// Data phase chunk size. Fixed by the protocol, unrelated to the endpoint MTU.
pub const DATA_CHUNK_SIZE: usize = 0x40040;

// Every inbound frame starts with a 4-byte ASCII status tag
pub const STATUS_TAG_LEN: usize = 4;

pub const TAG_OKAY: &[u8; 4] = b"OKAY";
pub const TAG_FAIL: &[u8; 4] = b"FAIL";
pub const TAG_DATA: &[u8; 4] = b"DATA";
pub const TAG_INFO: &[u8; 4] = b"INFO";

// Command prefixes
pub const CMD_GETVAR: &str = "getvar";
pub const CMD_DOWNLOAD: &str = "download";
pub const CMD_FLASH: &str = "flash";
pub const CMD_ERASE: &str = "erase";
pub const CMD_BOOT: &str = "boot";
pub const CMD_REBOOT: &str = "reboot";
pub const CMD_CONTINUE: &str = "continue";

/// Largest payload whose size fits the 8 hex digit `download` field.
pub const MAX_DOWNLOAD_SIZE: usize = u32::MAX as usize;
