/// CRC-16/CCITT as used by IBM-style address and data fields

/// Initial register value
pub const CRC16_INIT: u16 = 0xFFFF;
/// Generator polynomial
pub const CRC16_POLY: u16 = 0x1021;

/// Feed one byte into a running CRC
#[inline]
pub fn crc16_update(mut crc: u16, byte: u8) -> u16 {
    crc ^= (byte as u16) << 8;
    for _ in 0..8 {
        crc = if crc & 0x8000 != 0 {
            (crc << 1) ^ CRC16_POLY
        } else {
            crc << 1
        };
    }
    crc
}

/// CRC of `data` starting from 0xFFFF
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    data.iter().fold(CRC16_INIT, |crc, &b| crc16_update(crc, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        // CRC-16/CCITT-FALSE check value
        assert_eq!(crc16_ccitt(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_empty() {
        assert_eq!(crc16_ccitt(&[]), 0xFFFF);
    }

    #[test]
    fn test_trailing_crc_gives_zero() {
        let mut field = vec![0xFE, 2, 0, 5, 2];
        let crc = crc16_ccitt(&field);
        field.extend_from_slice(&crc.to_be_bytes());
        assert_eq!(crc16_ccitt(&field), 0);
    }
}
