use core::num::NonZeroU16;

use crate::io::err::BufferError;
use crate::io::read::BuffReader;
use crate::io::write::BuffWriter;
use crate::property::{decode_properties, encode_properties, Property};
use crate::types::qos::QoS;
use crate::types::topic::TopicName;
use crate::types::ProtocolVersion;

/// A publish packet. `packet_id` is `None` for QoS 0 and required for
/// QoS >= 1. `topic` may be empty when a v5 topic alias supplies the
/// destination (see the topic-alias tables, C5) -- that is a
/// higher-layer concern validated by the engine, not the codec.
#[derive(Debug, Clone)]
pub struct PublishPacket<'a, const MAX_PROPS: usize> {
    pub topic: TopicName<'a>,
    pub packet_id: Option<NonZeroU16>,
    pub qos: QoS,
    pub dup: bool,
    pub retain: bool,
    pub payload: &'a [u8],
    pub properties: heapless::Vec<Property<'a>, MAX_PROPS>,
}

impl<'a, const MAX_PROPS: usize> PublishPacket<'a, MAX_PROPS> {
    pub fn flags(&self) -> u8 {
        let mut flags = self.qos.into_publish_bits();
        if self.dup {
            flags |= 0b0000_1000;
        }
        if self.retain {
            flags |= 0b0000_0001;
        }
        flags
    }

    pub fn encode(&self, w: &mut BuffWriter<'a>, version: ProtocolVersion) -> Result<(), BufferError> {
        w.write_string(&self.topic.as_mqtt_string())?;
        if let Some(id) = self.packet_id {
            w.write_u16(id.get())?;
        }
        if version.has_properties() {
            encode_properties(w, &self.properties)?;
        }
        w.write_raw(self.payload)
    }

    pub fn decode(
        r: &mut BuffReader<'a>,
        flags: u8,
        version: ProtocolVersion,
    ) -> Result<Self, BufferError> {
        let topic_str = r.read_string()?;
        let topic = if topic_str.as_str().is_empty() {
            TopicName::empty()
        } else {
            TopicName::new(topic_str.as_str())?
        };
        let qos = QoS::try_from_publish_bits(flags).map_err(|_| BufferError::ReservedFlagSet)?;
        let packet_id = if qos.requires_packet_id() {
            Some(NonZeroU16::new(r.read_u16()?).ok_or(BufferError::ReservedFlagSet)?)
        } else {
            None
        };
        let properties = if version.has_properties() {
            decode_properties(r)?
        } else {
            heapless::Vec::new()
        };
        let payload = r.read_rest();
        Ok(PublishPacket {
            topic,
            packet_id,
            qos,
            dup: flags & 0b0000_1000 != 0,
            retain: flags & 0b0000_0001 != 0,
            payload,
            properties,
        })
    }
}
