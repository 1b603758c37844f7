use bytes::BufMut;

const CRC16_TABLE: [u16; 256] = build_crc16_table();

const fn build_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut data = (i as u16) << 1;
        let mut crc = 0u16;
        let mut bit = 0;
        while bit < 8 {
            data >>= 1;
            if (data ^ crc) & 0x0001 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

pub fn crc16_table() -> &'static [u16; 256] {
    &CRC16_TABLE
}

/// Modbus CRC-16 (poly 0xA001, init 0xFFFF).
pub fn modbus_crc16(data: &[u8]) -> u16 {
    data.iter().fold(0xFFFF, |crc, byte| {
        (crc >> 8) ^ CRC16_TABLE[((crc ^ *byte as u16) & 0xFF) as usize]
    })
}

/// Plain byte sum truncated to 16 bits.
pub fn additive_checksum16(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |sum, byte| sum.wrapping_add(*byte as u16))
}

/// Appends the CRC low byte first, as modbus frames carry it.
pub fn append_modbus_crc(frame: &mut Vec<u8>) {
    let crc = modbus_crc16(frame);
    frame.put_u16_le(crc);
}

/// Appends the additive checksum big-endian, as AA55 frames carry it.
pub fn append_additive_checksum(frame: &mut Vec<u8>) {
    let sum = additive_checksum16(frame);
    frame.put_u16(sum);
}
