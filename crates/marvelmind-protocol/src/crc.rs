//! CRC-16/Modbus
//!
//! Reflected polynomial 0xA001, init 0xFFFF, no final XOR. The value goes on
//! the wire little-endian.

/// Reflected form of polynomial 0x8005
pub const POLY: u16 = 0xA001;

/// Accumulator seed
pub const INIT: u16 = 0xFFFF;

/// CRC-16/Modbus over a complete buffer. Empty input yields `0xFFFF`.
pub fn crc16_modbus(data: &[u8]) -> u16 {
    let mut crc = Crc16Modbus::new();
    crc.update(data);
    crc.finish()
}

/// Incremental CRC-16/Modbus, for checksumming a frame assembled in pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc16Modbus {
    state: u16,
}

impl Crc16Modbus {
    pub fn new() -> Self {
        Self { state: INIT }
    }

    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.state ^= byte as u16;
            for _ in 0..8 {
                self.state = if self.state & 0x0001 != 0 {
                    (self.state >> 1) ^ POLY
                } else {
                    self.state >> 1
                };
            }
        }
    }

    pub fn finish(&self) -> u16 {
        self.state
    }
}

impl Default for Crc16Modbus {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(2000))]

        // Fuzz: chunked updates agree with the one-shot checksum
        #[test]
        fn fuzz_incremental_matches_oneshot(
            data in proptest::collection::vec(any::<u8>(), 0..256),
            split in any::<prop::sample::Index>(),
        ) {
            let at = if data.is_empty() { 0 } else { split.index(data.len() + 1) };
            let (head, tail) = data.split_at(at);

            let mut crc = Crc16Modbus::new();
            crc.update(head);
            crc.update(tail);

            prop_assert_eq!(crc.finish(), crc16_modbus(&data));
        }

        // Fuzz: any single flipped bit changes the checksum
        #[test]
        fn fuzz_single_bit_flip_detected(
            data in proptest::collection::vec(any::<u8>(), 1..64),
            byte in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let mut corrupted = data.clone();
            let i = byte.index(corrupted.len());
            corrupted[i] ^= 1 << bit;

            prop_assert_ne!(crc16_modbus(&data), crc16_modbus(&corrupted));
        }
    }
}
