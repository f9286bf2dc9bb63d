use core::num::NonZeroU16;

use crate::io::err::BufferError;
use crate::io::read::BuffReader;
use crate::io::write::BuffWriter;
use crate::property::{decode_properties, encode_properties, Property};
use crate::types::qos::QoS;
use crate::types::topic::TopicFilter;
use crate::types::ProtocolVersion;

#[derive(Debug, Clone, Copy, Default)]
pub enum RetainHandling {
    #[default]
    AlwaysSend,
    SendIfNotSubscribedBefore,
    NeverSend,
}

impl RetainHandling {
    fn bits(self) -> u8 {
        match self {
            RetainHandling::AlwaysSend => 0,
            RetainHandling::SendIfNotSubscribedBefore => 1,
            RetainHandling::NeverSend => 2,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits {
            1 => RetainHandling::SendIfNotSubscribedBefore,
            2 => RetainHandling::NeverSend,
            _ => RetainHandling::AlwaysSend,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SubscribeEntry<'a> {
    pub filter: TopicFilter<'a>,
    pub qos: QoS,
    pub no_local: bool,
    pub retain_as_published: bool,
    pub retain_handling: RetainHandling,
}

impl<'a> SubscribeEntry<'a> {
    pub fn new(filter: TopicFilter<'a>, qos: QoS) -> Self {
        SubscribeEntry {
            filter,
            qos,
            no_local: false,
            retain_as_published: false,
            retain_handling: RetainHandling::AlwaysSend,
        }
    }

    fn options_byte(&self) -> u8 {
        let mut b = self.qos.into_subscribe_bits();
        if self.no_local {
            b |= 0b0000_0100;
        }
        if self.retain_as_published {
            b |= 0b0000_1000;
        }
        b |= self.retain_handling.bits() << 4;
        b
    }
}

#[derive(Debug, Clone)]
pub struct SubscribePacket<'a, const MAX_FILTERS: usize, const MAX_PROPS: usize> {
    pub packet_id: NonZeroU16,
    pub entries: heapless::Vec<SubscribeEntry<'a>, MAX_FILTERS>,
    pub properties: heapless::Vec<Property<'a>, MAX_PROPS>,
}

impl<'a, const MAX_FILTERS: usize, const MAX_PROPS: usize> SubscribePacket<'a, MAX_FILTERS, MAX_PROPS> {
    pub fn encode(&self, w: &mut BuffWriter<'a>, version: ProtocolVersion) -> Result<(), BufferError> {
        w.write_u16(self.packet_id.get())?;
        if version.has_properties() {
            encode_properties(w, &self.properties)?;
        }
        for e in &self.entries {
            w.write_string(&e.filter.as_mqtt_string())?;
            w.write_u8(e.options_byte())?;
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
        let mut entries = heapless::Vec::new();
        while r.remaining() > 0 {
            let filter_str = r.read_string()?;
            let filter = TopicFilter::new(filter_str.as_str())?;
            let opts = r.read_u8()?;
            let qos = QoS::try_from_subscribe_bits(opts).map_err(|_| BufferError::ReservedFlagSet)?;
            let entry = SubscribeEntry {
                filter,
                qos,
                no_local: opts & 0b0000_0100 != 0,
                retain_as_published: opts & 0b0000_1000 != 0,
                retain_handling: RetainHandling::from_bits((opts >> 4) & 0b11),
            };
            entries.push(entry).map_err(|_| BufferError::InsufficientBufferSize)?;
        }
        Ok(SubscribePacket {
            packet_id,
            entries,
            properties,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SubackPacket<'a, const MAX_FILTERS: usize, const MAX_PROPS: usize> {
    pub packet_id: NonZeroU16,
    pub reason_codes: heapless::Vec<crate::types::reason_code::ReasonCode, MAX_FILTERS>,
    pub properties: heapless::Vec<Property<'a>, MAX_PROPS>,
}

impl<'a, const MAX_FILTERS: usize, const MAX_PROPS: usize> SubackPacket<'a, MAX_FILTERS, MAX_PROPS> {
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
                crate::types::reason_code::ReasonCode::from_byte(byte)?
            } else {
                crate::types::reason_code::ReasonCode::from_v311_connack_return_code(byte.min(2))?
            };
            reason_codes
                .push(rc)
                .map_err(|_| BufferError::InsufficientBufferSize)?;
        }
        Ok(SubackPacket {
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
