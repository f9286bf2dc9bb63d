use core::num::NonZeroU16;

use crate::io::err::BufferError;
use crate::io::read::BuffReader;
use crate::io::write::BuffWriter;
use crate::property::{decode_properties, encode_properties, Property};
use crate::types::reason_code::ReasonCode;
use crate::types::topic::TopicFilter;
use crate::types::ProtocolVersion;

#[derive(Debug, Clone)]
pub struct UnsubscribePacket<'a, const MAX_FILTERS: usize, const MAX_PROPS: usize> {
    pub packet_id: NonZeroU16,
    pub filters: heapless::Vec<TopicFilter<'a>, MAX_FILTERS>,
    pub properties: heapless::Vec<Property<'a>, MAX_PROPS>,
}

impl<'a, const MAX_FILTERS: usize, const MAX_PROPS: usize> UnsubscribePacket<'a, MAX_FILTERS, MAX_PROPS> {
    pub fn encode(&self, w: &mut BuffWriter<'a>, version: ProtocolVersion) -> Result<(), BufferError> {
        w.write_u16(self.packet_id.get())?;
        if version.has_properties() {
            encode_properties(w, &self.properties)?;
        }
        for f in &self.filters {
            w.write_string(&f.as_mqtt_string())?;
        }
        Ok(())
    }

    pub fn decode(r: &mut BuffReader<'a>, version: ProtocolVersion) -> Result<Self, BufferError> {
        let packet_id = NonZeroU16::new(r.read_u16()?).ok_or(BufferError::ReservedFlagSet)?;
        let properties = if version.has_properties() {
            decode_properties(r)?
        } else {
            heapless::Vec::new()
        };
        let mut filters = heapless::Vec::new();
        while r.remaining() > 0 {
            let s = r.read_string()?;
            let filter = TopicFilter::new(s.as_str())?;
            filters.push(filter).map_err(|_| BufferError::InsufficientBufferSize)?;
        }
        Ok(UnsubscribePacket {
            packet_id,
            filters,
            properties,
        })
    }
}

#[derive(Debug, Clone)]
pub struct UnsubackPacket<'a, const MAX_FILTERS: usize, const MAX_PROPS: usize> {
    pub packet_id: NonZeroU16,
    pub reason_codes: heapless::Vec<ReasonCode, MAX_FILTERS>,
    pub properties: heapless::Vec<Property<'a>, MAX_PROPS>,
}

impl<'a, const MAX_FILTERS: usize, const MAX_PROPS: usize> UnsubackPacket<'a, MAX_FILTERS, MAX_PROPS> {
    pub fn decode(r: &mut BuffReader<'a>, version: ProtocolVersion) -> Result<Self, BufferError> {
        let packet_id = NonZeroU16::new(r.read_u16()?).ok_or(BufferError::ReservedFlagSet)?;
        let properties = if version.has_properties() {
            decode_properties(r)?
        } else {
            heapless::Vec::new()
        };
        let mut reason_codes = heapless::Vec::new();
        while r.remaining() > 0 {
            let byte = r.read_u8()?;
            let rc = if version.has_properties() {
                ReasonCode::from_byte(byte)?
            } else {
                ReasonCode::Success
            };
            reason_codes.push(rc).map_err(|_| BufferError::InsufficientBufferSize)?;
        }
        Ok(UnsubackPacket {
            packet_id,
            reason_codes,
            properties,
        })
    }

    pub fn encode(&self, w: &mut BuffWriter<'a>, version: ProtocolVersion) -> Result<(), BufferError> {
        w.write_u16(self.packet_id.get())?;
        if version.has_properties() {
            encode_properties(w, &self.properties)?;
        }
        for rc in &self.reason_codes {
            w.write_u8(rc.value())?;
        }
        Ok(())
    }
}
