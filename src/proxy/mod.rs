//! PROXY protocol v2 data model and encoder (spec §3, §4.4).

mod address;
mod begin_ex;
pub mod encode;
mod info;

pub use address::{AddressTuple, TransportProtocol};
pub use begin_ex::BeginEx;
pub use info::{InfoItem, SecureItem};

/// Signature every PROXY v2 header begins with.
pub const SIGNATURE: [u8; 12] = [
    0x0D, 0x0A, 0x0D, 0x0A, 0x00, 0x0D, 0x0A, b'Q', b'U', b'I', b'T', 0x0A,
];

/// Version/command byte for a header carrying no address information.
pub const COMMAND_LOCAL: u8 = 0x20;
/// Version/command byte for a header carrying address + info.
pub const COMMAND_PROXY: u8 = 0x21;
