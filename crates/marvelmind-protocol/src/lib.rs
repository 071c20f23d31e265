//! Marvelmind Protocol Library
//!
//! Wire framing for the Marvelmind hedgehog position report (packet type
//! `0x0011`, 16-byte payload) and the CRC-16/Modbus check that guards it.
//!
//! ```text
//! offset 0..5   header        FF 47 01 00 10
//! offset 5..9   timestamp_ms  u32
//! offset 9..15  x, y, z       i16 × 3 (cm)
//! offset 15     flags         u8
//! offset 16     address       u8
//! offset 17..19 angle         u16, 12 bits significant (0.1°)
//! offset 19..21 reserved      zero
//! offset 21..23 crc16         CRC-16/Modbus over [0..21)
//! ```
//!
//! Everything is little-endian. Nothing here performs I/O and nothing fails:
//! out-of-range values are truncated by the fixed-width fields exactly as
//! the beacon firmware does.

pub mod crc;
pub mod packet;

pub use crc::{crc16_modbus, Crc16Modbus};
pub use packet::{
    encode, encode_default, PositionSample, DEFAULT_ADDRESS, DEFAULT_FLAGS, HEADER, HEADER_LEN,
    PACKET_LEN, PAYLOAD_LEN,
};
