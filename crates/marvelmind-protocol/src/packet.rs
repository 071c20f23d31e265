//! Hedgehog position report encoder
//!
//! Builds the 23-byte frame `header ‖ payload ‖ crc`. The encoder never
//! fails: coordinates are already `i16` and the angle is masked to 12 bits.
//! A full turn (3600) still fits and goes out unchanged; anything above 4095
//! loses its upper bits. Compatibility with the consumer's parser depends on
//! that exact width, so the mask stays.

use serde::{Deserialize, Serialize};

use crate::crc::Crc16Modbus;

/// Destination 0xFF, type 0x47, code 0x0001, payload size 0x10
pub const HEADER: [u8; 5] = [0xFF, 0x47, 0x01, 0x00, 0x10];

pub const HEADER_LEN: usize = HEADER.len();
pub const PAYLOAD_LEN: usize = 16;
pub const CRC_LEN: usize = 2;
pub const PACKET_LEN: usize = HEADER_LEN + PAYLOAD_LEN + CRC_LEN;

/// Hedgehog address reported by the simulated beacon
pub const DEFAULT_ADDRESS: u8 = 10;

/// Status flags byte (no flags raised)
pub const DEFAULT_FLAGS: u8 = 0x00;

/// Only the low 12 bits of the angle field are significant
pub const ANGLE_MASK: u16 = 0x0FFF;

/// One position/heading sample, ready to be framed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSample {
    pub timestamp_ms: u32,
    pub x_cm: i16,
    pub y_cm: i16,
    pub z_cm: i16,
    /// Heading in tenths of a degree (0..=3599, 3600 at the wrap)
    pub angle_tenths_deg: u16,
}

/// Frame a sample with an explicit address and flags byte.
pub fn encode(sample: &PositionSample, address: u8, flags: u8) -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];

    packet[..HEADER_LEN].copy_from_slice(&HEADER);
    packet[5..9].copy_from_slice(&sample.timestamp_ms.to_le_bytes());
    packet[9..11].copy_from_slice(&sample.x_cm.to_le_bytes());
    packet[11..13].copy_from_slice(&sample.y_cm.to_le_bytes());
    packet[13..15].copy_from_slice(&sample.z_cm.to_le_bytes());
    packet[15] = flags;
    packet[16] = address;
    packet[17..19].copy_from_slice(&(sample.angle_tenths_deg & ANGLE_MASK).to_le_bytes());
    // [19..21) reserved, left zero

    let body = HEADER_LEN + PAYLOAD_LEN;
    let mut crc = Crc16Modbus::new();
    crc.update(&packet[..body]);
    packet[body..].copy_from_slice(&crc.finish().to_le_bytes());

    packet
}

/// Frame a sample as hedgehog 10 with no status flags.
pub fn encode_default(sample: &PositionSample) -> [u8; PACKET_LEN] {
    encode(sample, DEFAULT_ADDRESS, DEFAULT_FLAGS)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::crc::crc16_modbus;
    use proptest::prelude::*;

    fn any_sample() -> impl Strategy<Value = PositionSample> {
        (any::<u32>(), any::<i16>(), any::<i16>(), any::<i16>(), 0u16..=3600).prop_map(
            |(timestamp_ms, x_cm, y_cm, z_cm, angle_tenths_deg)| PositionSample {
                timestamp_ms,
                x_cm,
                y_cm,
                z_cm,
                angle_tenths_deg,
            },
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(5000))]

        // Fuzz: framing invariants hold for every sample
        #[test]
        fn fuzz_frame_invariants(s in any_sample(), address in any::<u8>(), flags in any::<u8>()) {
            let packet = encode(&s, address, flags);

            prop_assert_eq!(packet.len(), 23);
            prop_assert_eq!(&packet[..5], &HEADER[..]);
            prop_assert_eq!(
                crc16_modbus(&packet[..21]),
                u16::from_le_bytes([packet[21], packet[22]])
            );
        }

        // Fuzz: coordinate fields read back unchanged
        #[test]
        fn fuzz_fields_read_back(s in any_sample()) {
            let packet = encode_default(&s);

            prop_assert_eq!(u32::from_le_bytes([packet[5], packet[6], packet[7], packet[8]]), s.timestamp_ms);
            prop_assert_eq!(i16::from_le_bytes([packet[9], packet[10]]), s.x_cm);
            prop_assert_eq!(i16::from_le_bytes([packet[11], packet[12]]), s.y_cm);
            prop_assert_eq!(i16::from_le_bytes([packet[13], packet[14]]), s.z_cm);
            prop_assert_eq!(
                u16::from_le_bytes([packet[17], packet[18]]),
                s.angle_tenths_deg & ANGLE_MASK
            );
        }
    }
}
