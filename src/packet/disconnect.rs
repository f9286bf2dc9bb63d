use crate::io::err::BufferError;
use crate::io::read::BuffReader;
use crate::io::write::BuffWriter;
use crate::property::{decode_properties, encode_properties, Property};
use crate::types::reason_code::ReasonCode;
use crate::types::ProtocolVersion;

/// v5 adds an optional reason code + property list; v3.1.1 DISCONNECT
/// has no variable header or payload at all (client-to-server only,
/// no broker-initiated DISCONNECT in that version).
#[derive(Debug, Clone)]
pub struct DisconnectPacket<'a, const MAX_PROPS: usize> {
    pub reason_code: ReasonCode,
    pub properties: heapless::Vec<Property<'a>, MAX_PROPS>,
}

impl<'a, const MAX_PROPS: usize> DisconnectPacket<'a, MAX_PROPS> {
    pub fn new(reason_code: ReasonCode) -> Self {
        DisconnectPacket {
            reason_code,
            properties: heapless::Vec::new(),
        }
    }

    pub fn encode(&self, w: &mut BuffWriter<'a>, version: ProtocolVersion) -> Result<(), BufferError> {
        if !version.has_properties() {
            return Ok(());
        }
        if self.reason_code.value() == 0 && self.properties.is_empty() {
            return Ok(());
        }
        w.write_u8(self.reason_code.value())?;
        encode_properties(w, &self.properties)
    }

    pub fn decode(r: &mut BuffReader<'a>, version: ProtocolVersion) -> Result<Self, BufferError> {
        if !version.has_properties() || r.remaining() == 0 {
            return Ok(DisconnectPacket::new(ReasonCode::NormalDisconnection));
        }
        let reason_code = ReasonCode::from_byte(r.read_u8()?)?;
        let properties = if r.remaining() > 0 {
            decode_properties(r)?
        } else {
            heapless::Vec::new()
        };
        Ok(DisconnectPacket {
            reason_code,
            properties,
        })
    }
}
