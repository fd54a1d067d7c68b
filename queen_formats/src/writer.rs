use byteorder::{BigEndian, ByteOrder};

/// Big-endian buffer builder; mirrors [`crate::ByteReader`] so tools and
/// tests can produce tables the parsers accept.
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn i16(&mut self, value: i16) -> &mut Self {
        let mut bytes = [0u8; 2];
        BigEndian::write_i16(&mut bytes, value);
        self.buf.extend_from_slice(&bytes);
        self
    }

    pub fn i16s(&mut self, values: &[i16]) -> &mut Self {
        for &value in values {
            self.i16(value);
        }
        self
    }

    pub fn u16(&mut self, value: u16) -> &mut Self {
        let mut bytes = [0u8; 2];
        BigEndian::write_u16(&mut bytes, value);
        self.buf.extend_from_slice(&bytes);
        self
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        let mut bytes = [0u8; 4];
        BigEndian::write_u32(&mut bytes, value);
        self.buf.extend_from_slice(&bytes);
        self
    }

    pub fn bytes(&mut self, data: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(data);
        self
    }

    /// Writes a length-prefixed string with the same padding rule the reader
    /// applies. Characters outside Latin-1 become `?`.
    pub fn pascal(&mut self, text: &str, align: usize) -> &mut Self {
        let encoded: Vec<u8> = text
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .collect();
        self.buf.push(encoded.len() as u8);
        if encoded.is_empty() {
            return self;
        }
        self.buf.extend_from_slice(&encoded);
        if align > 1 {
            while self.buf.len() % align != 0 {
                self.buf.push(0);
            }
        }
        self
    }

    pub fn pad_to(&mut self, offset: usize) -> &mut Self {
        if self.buf.len() < offset {
            self.buf.resize(offset, 0);
        }
        self
    }

    /// Overwrites a previously reserved 16-bit slot.
    pub fn patch_u16(&mut self, at: usize, value: u16) -> &mut Self {
        BigEndian::write_u16(&mut self.buf[at..at + 2], value);
        self
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ByteReader;

    #[test]
    fn writer_output_reads_back() {
        let mut writer = ByteWriter::new();
        writer.i16(-5).u16(7).pascal("door", 4).pascal("", 4).u32(9);
        let data = writer.into_inner();
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_i16().unwrap(), -5);
        assert_eq!(reader.read_u16().unwrap(), 7);
        assert_eq!(reader.read_pascal(4).unwrap(), "door");
        assert_eq!(reader.read_pascal(4).unwrap(), "");
        assert_eq!(reader.read_u32().unwrap(), 9);
    }

    #[test]
    fn patch_overwrites_reserved_offset() {
        let mut writer = ByteWriter::new();
        writer.u16(0).u16(0xbeef);
        writer.patch_u16(0, 0x0102);
        assert_eq!(writer.into_inner(), vec![0x01, 0x02, 0xbe, 0xef]);
    }
}
