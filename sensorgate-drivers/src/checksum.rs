use crc::{CRC_8_MAXIM_DOW, CRC_8_NRSC_5, Crc};

// Sensirion parts (SHT3x, SCD4x) use poly 0x31, init 0xFF, no reflection,
// which is the NRSC-5 parameter set.
const SENSIRION: Crc<u8> = Crc::<u8>::new(&CRC_8_NRSC_5);

// Dallas/Maxim 1-Wire CRC (poly 0x31 reflected, init 0x00).
const MAXIM: Crc<u8> = Crc::<u8>::new(&CRC_8_MAXIM_DOW);

#[inline]
pub fn sensirion(data: &[u8]) -> u8 {
    SENSIRION.checksum(data)
}

#[inline]
pub fn maxim(data: &[u8]) -> u8 {
    MAXIM.checksum(data)
}

/// Splits a Sensirion `[msb, lsb, crc]` word, checking its CRC.
pub fn sensirion_word(chunk: &[u8]) -> Option<u16> {
    match chunk {
        [msb, lsb, crc] if sensirion(&[*msb, *lsb]) == *crc => Some(u16::from_be_bytes([*msb, *lsb])),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensirion_datasheet_vector() {
        assert_eq!(sensirion(&[0xBE, 0xEF]), 0x92);
        assert_eq!(sensirion_word(&[0xBE, 0xEF, 0x92]), Some(0xBEEF));
        assert_eq!(sensirion_word(&[0xBE, 0xEF, 0x00]), None);
    }

    #[test]
    fn test_maxim_check_value() {
        assert_eq!(maxim(b"123456789"), 0xA1);
    }
}
