use core::num::NonZeroU16;

use crate::io::err::BufferError;
use crate::io::read::BuffReader;
use crate::io::write::BuffWriter;
use crate::property::{decode_properties, encode_properties, Property};
use crate::types::reason_code::ReasonCode;
use crate::types::ProtocolVersion;

/// PUBACK, PUBREC, PUBREL and PUBCOMP share one wire shape: a packet
/// identifier, and -- in v5, when the reason code isn't plain success
/// with no properties -- a reason code byte and a property list. The
/// shortened "packet_id only" encoding is used whenever both are
/// default (MQTT-3.3.2-1's v5 "Reason Code and Property Length can be
/// omitted" rule).
#[derive(Debug, Clone)]
pub struct SimpleAck<'a, const MAX_PROPS: usize> {
    pub packet_id: NonZeroU16,
    pub reason_code: ReasonCode,
    pub properties: heapless::Vec<Property<'a>, MAX_PROPS>,
}

impl<'a, const MAX_PROPS: usize> SimpleAck<'a, MAX_PROPS> {
    pub fn new(packet_id: NonZeroU16) -> Self {
        SimpleAck {
            packet_id,
            reason_code: ReasonCode::Success,
            properties: heapless::Vec::new(),
        }
    }

    fn can_shorten(&self, version: ProtocolVersion) -> bool {
        version == ProtocolVersion::V311
            || (self.reason_code.value() == 0 && self.properties.is_empty())
    }

    pub fn encode(&self, w: &mut BuffWriter<'a>, version: ProtocolVersion) -> Result<(), BufferError> {
        w.write_u16(self.packet_id.get())?;
        if self.can_shorten(version) {
            return Ok(());
        }
        w.write_u8(self.reason_code.value())?;
        encode_properties(w, &self.properties)
    }

    pub fn decode(r: &mut BuffReader<'a>, version: ProtocolVersion) -> Result<Self, BufferError> {
        let packet_id = NonZeroU16::new(r.read_u16()?).ok_or(BufferError::ReservedFlagSet)?;
        if !version.has_properties() || r.remaining() == 0 {
            return Ok(SimpleAck {
                packet_id,
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
        Ok(SimpleAck {
            packet_id,
            reason_code,
            properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortens_v311_always() {
        let id = NonZeroU16::new(7).unwrap();
        let ack: SimpleAck<4> = SimpleAck::new(id);
        let mut buf = [0u8; 16];
        let mut w = BuffWriter::new(&mut buf);
        ack.encode(&mut w, ProtocolVersion::V311).unwrap();
        assert_eq!(w.position(), 2);
    }

    #[test]
    fn shortens_v5_on_success_no_props() {
        let id = NonZeroU16::new(7).unwrap();
        let ack: SimpleAck<4> = SimpleAck::new(id);
        let mut buf = [0u8; 16];
        let mut w = BuffWriter::new(&mut buf);
        ack.encode(&mut w, ProtocolVersion::V5).unwrap();
        assert_eq!(w.position(), 2);
    }

    #[test]
    fn round_trips_with_reason_code() {
        let id = NonZeroU16::new(7).unwrap();
        let mut ack: SimpleAck<4> = SimpleAck::new(id);
        ack.reason_code = ReasonCode::PacketIdentifierNotFound;
        let mut buf = [0u8; 16];
        let mut w = BuffWriter::new(&mut buf);
        ack.encode(&mut w, ProtocolVersion::V5).unwrap();
        let written = w.position();
        let mut r = BuffReader::new(&buf[..written]);
        let decoded: SimpleAck<4> = SimpleAck::decode(&mut r, ProtocolVersion::V5).unwrap();
        assert_eq!(decoded.packet_id, id);
        assert_eq!(decoded.reason_code, ReasonCode::PacketIdentifierNotFound);
    }
}
