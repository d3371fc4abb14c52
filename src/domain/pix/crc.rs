//! CRC-16 checksum terminating a payment code

const POLYNOMIAL: u16 = 0x1021;
const INITIAL: u16 = 0xFFFF;

/// CRC-16 (poly 0x1021, init 0xFFFF, MSB first, no final xor)
pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(INITIAL, |crc, &byte| {
        let mut crc = crc ^ (u16::from(byte) << 8);
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
        }
        crc
    })
}

/// Checksum rendered as four uppercase hex digits
pub fn checksum_hex(payload: &str) -> String {
    format!("{:04X}", crc16(payload.as_bytes()))
}

/// Check that the last four characters are the checksum of everything before them
pub fn verify(payload: &str) -> bool {
    if payload.len() < 4 || !payload.is_char_boundary(payload.len() - 4) {
        return false;
    }

    let (body, checksum) = payload.split_at(payload.len() - 4);
    checksum_hex(body) == checksum
}
