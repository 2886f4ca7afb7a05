//! Protocol module - Fastboot wire definitions.

pub mod constants;
pub mod frame;
pub mod status;

pub use constants::*;
pub use frame::{Command, Response, encode_command};
pub use status::ResponseStatus;
