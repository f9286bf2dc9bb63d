use crate::io::err::BufferError;
use crate::io::read::BuffReader;
use crate::io::write::BuffWriter;
use crate::property::{decode_properties, encode_properties, Property};
use crate::types::reason_code::ReasonCode;

/// AUTH is v5-only, used for extended (e.g. SASL-style) authentication
/// exchanges; carries a reason code (continue-authentication or
/// success) and properties (authentication-method/data, reason
/// string, user properties).
#[derive(Debug, Clone)]
pub struct AuthPacket<'a, const MAX_PROPS: usize> {
    pub reason_code: ReasonCode,
    pub properties: heapless::Vec<Property<'a>, MAX_PROPS>,
}

impl<'a, const MAX_PROPS: usize> AuthPacket<'a, MAX_PROPS> {
    pub fn encode(&self, w: &mut BuffWriter<'a>) -> Result<(), BufferError> {
        if self.reason_code.value() == 0 && self.properties.is_empty() {
            return Ok(());
        }
        w.write_u8(self.reason_code.value())?;
        encode_properties(w, &self.properties)
    }

    pub fn decode(r: &mut BuffReader<'a>) -> Result<Self, BufferError> {
        if r.remaining() == 0 {
            return Ok(AuthPacket {
                reason_code: ReasonCode::Success,
                properties: heapless::Vec::new(),
            });
        }
        let reason_code = ReasonCode::from_byte(r.read_u8()?)?;
        let properties = if r.remaining() > 0 {
            decode_properties(r)?
        } else {
            heapless::Vec::new()
        };
        Ok(AuthPacket {
            reason_code,
            properties,
        })
    }
}
