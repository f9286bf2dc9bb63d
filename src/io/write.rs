use crate::io::err::BufferError;
use crate::types::binary::MqttBinary;
use crate::types::int::VarByteInt;
use crate::types::string::MqttString;

/// Cursor over an output buffer an encoder writes a packet into
/// before it is handed to the transport.
pub struct BuffWriter<'a> {
    buffer: &'a mut [u8],
    position: usize,
}

impl<'a> BuffWriter<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        BuffWriter { buffer, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        if self.buffer.len() - self.position < bytes.len() {
            return Err(BufferError::InsufficientBufferSize);
        }
        self.buffer[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
        Ok(())
    }

    pub fn write_u8(&mut self, byte: u8) -> Result<(), BufferError> {
        self.put(&[byte])
    }

    pub fn write_u16(&mut self, v: u16) -> Result<(), BufferError> {
        self.put(&v.to_be_bytes())
    }

    pub fn write_u32(&mut self, v: u32) -> Result<(), BufferError> {
        self.put(&v.to_be_bytes())
    }

    pub fn write_variable_byte_int(&mut self, v: u32) -> Result<(), BufferError> {
        let vbi = VarByteInt::new(v).ok_or(BufferError::MalformedVarByteInt)?;
        let mut tmp = [0u8; 4];
        let len = vbi.encode(&mut tmp)?;
        self.put(&tmp[..len])
    }

    pub fn write_string(&mut self, s: &MqttString<'a>) -> Result<(), BufferError> {
        self.write_u16(s.len())?;
        self.put(s.as_str().as_bytes())
    }

    pub fn write_binary(&mut self, b: &MqttBinary<'a>) -> Result<(), BufferError> {
        self.write_u16(b.len())?;
        self.put(b.as_bytes())
    }

    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        self.put(bytes)
    }

    /// Remaining free space, used by packet encoders to check
    /// payload fits before committing.
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    pub fn into_written(self) -> &'a [u8] {
        &self.buffer[..self.position]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_reports_position() {
        let mut buf = [0u8; 8];
        let mut w = BuffWriter::new(&mut buf);
        w.write_u16(0x0102).unwrap();
        w.write_u8(0xFF).unwrap();
        assert_eq!(w.position(), 3);
        assert_eq!(&buf[..3], &[0x01, 0x02, 0xFF]);
    }

    #[test]
    fn errors_when_buffer_full() {
        let mut buf = [0u8; 1];
        let mut w = BuffWriter::new(&mut buf);
        assert_eq!(w.write_u16(1), Err(BufferError::InsufficientBufferSize));
    }
}
