use crate::io::err::BufferError;
use crate::types::int::VarByteInt;
use crate::types::string::MqttString;

/// Cursor over an in-memory decode buffer holding one already-framed
/// packet body. Every read advances `position`; callers read the
/// fixed header / remaining-length via [`crate::header`] first and
/// hand the remaining bytes to a `BuffReader` to parse the variable
/// header and payload.
pub struct BuffReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> BuffReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        BuffReader { buffer, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], BufferError> {
        if self.remaining() < n {
            return Err(BufferError::InsufficientBufferSize);
        }
        let slice = &self.buffer[self.position..self.position + n];
        self.position += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, BufferError> {
        Ok(self.take(1)?[0])
    }

    pub fn peek_u8(&self) -> Result<u8, BufferError> {
        if self.remaining() < 1 {
            return Err(BufferError::InsufficientBufferSize);
        }
        Ok(self.buffer[self.position])
    }

    pub fn read_u16(&mut self) -> Result<u16, BufferError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, BufferError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_variable_byte_int(&mut self) -> Result<u32, BufferError> {
        let (vbi, consumed) = VarByteInt::decode(&self.buffer[self.position..])?;
        self.position += consumed;
        Ok(vbi.value())
    }

    pub fn read_string(&mut self) -> Result<MqttString<'a>, BufferError> {
        let (s, consumed) = MqttString::decode(&self.buffer[self.position..])?;
        self.position += consumed;
        Ok(s)
    }

    pub fn read_string_pair(&mut self) -> Result<(MqttString<'a>, MqttString<'a>), BufferError> {
        let k = self.read_string()?;
        let v = self.read_string()?;
        Ok((k, v))
    }

    pub fn read_binary(&mut self) -> Result<&'a [u8], BufferError> {
        let len = self.read_u16()? as usize;
        Ok(self.take(len)?)
    }

    /// Reads the remainder of the buffer as an opaque payload (used
    /// for the publish payload, whose length is implied by the fixed
    /// header's remaining length rather than its own prefix).
    pub fn read_rest(&mut self) -> &'a [u8] {
        let rest = &self.buffer[self.position..];
        self.position = self.buffer.len();
        rest
    }

    pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8], BufferError> {
        self.take(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_fixed_width_fields() {
        let buf = [0x00, 0x2A, 0x00, 0x00, 0x00, 0x2A];
        let mut r = BuffReader::new(&buf);
        assert_eq!(r.read_u16().unwrap(), 42);
        assert_eq!(r.read_u32().unwrap(), 42);
    }

    #[test]
    fn errors_on_short_buffer() {
        let buf = [0x00];
        let mut r = BuffReader::new(&buf);
        assert_eq!(r.read_u16(), Err(BufferError::InsufficientBufferSize));
    }
}
