use crate::io::err::BufferError;
use crate::io::read::BuffReader;
use crate::io::write::BuffWriter;
use crate::property::{decode_properties, encode_properties, Property};
use crate::types::reason_code::ReasonCode;
use crate::types::ProtocolVersion;

#[derive(Debug, Clone)]
pub struct ConnackPacket<'a, const MAX_PROPS: usize> {
    pub session_present: bool,
    pub reason_code: ReasonCode,
    pub properties: heapless::Vec<Property<'a>, MAX_PROPS>,
}

impl<'a, const MAX_PROPS: usize> ConnackPacket<'a, MAX_PROPS> {
    pub fn encode(&self, w: &mut BuffWriter<'a>, version: ProtocolVersion) -> Result<(), BufferError> {
        w.write_u8(if self.session_present { 1 } else { 0 })?;
        w.write_u8(self.reason_code.value())?;
        if version.has_properties() {
            encode_properties(w, &self.properties)?;
        }
        Ok(())
    }

    pub fn decode(r: &mut BuffReader<'a>, version: ProtocolVersion) -> Result<Self, BufferError> {
        let flags = r.read_u8()?;
        let reason_byte = r.read_u8()?;
        let reason_code = if version.has_properties() {
            ReasonCode::from_byte(reason_byte)?
        } else {
            ReasonCode::from_v311_connack_return_code(reason_byte)?
        };
        let properties = if version.has_properties() {
            decode_properties(r)?
        } else {
            heapless::Vec::new()
        };
        Ok(ConnackPacket {
            session_present: flags & 0x01 != 0,
            reason_code,
            properties,
        })
    }
}
