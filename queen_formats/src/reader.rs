use anyhow::{Context, Result, anyhow, ensure};
use byteorder::{BigEndian, ByteOrder};

/// Longest pascal string any table is allowed to carry.
pub const MAX_STRING_LEN: usize = 128;

/// Big-endian cursor over a script or table buffer.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn at(data: &'a [u8], pos: usize) -> Result<Self> {
        let mut reader = Self::new(data);
        reader.seek(pos)?;
        Ok(reader)
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn seek(&mut self, pos: usize) -> Result<()> {
        ensure!(
            pos <= self.data.len(),
            "offset {pos} is beyond the end of a {} byte buffer",
            self.data.len()
        );
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.take(count).map(|_| ())
    }

    pub fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(count)
            .ok_or_else(|| anyhow!("read length overflow at offset {}", self.pos))?;
        ensure!(
            end <= self.data.len(),
            "truncated buffer: wanted {count} bytes at offset {}, have {}",
            self.pos,
            self.remaining()
        );
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(BigEndian::read_i16(self.take(2)?))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    /// Reads `N` consecutive signed fields.
    pub fn read_i16_array<const N: usize>(&mut self) -> Result<[i16; N]> {
        let mut fields = [0i16; N];
        for field in fields.iter_mut() {
            *field = self.read_i16()?;
        }
        Ok(fields)
    }

    /// Length-prefixed string padded so the following field starts on an
    /// `align` boundary. An empty string consumes only its length byte.
    pub fn read_pascal(&mut self, align: usize) -> Result<String> {
        let start = self.pos;
        let length = self.read_u8()? as usize;
        ensure!(
            length <= MAX_STRING_LEN,
            "string at offset {start} is {length} bytes (limit {MAX_STRING_LEN})"
        );
        if length == 0 {
            return Ok(String::new());
        }
        let bytes = self
            .take(length)
            .with_context(|| format!("reading string body at offset {start}"))?;
        let text = decode_latin1(bytes);
        if align > 1 {
            let padded = self.pos.div_ceil(align) * align;
            self.pos = padded.min(self.data.len());
        }
        Ok(text)
    }
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}
