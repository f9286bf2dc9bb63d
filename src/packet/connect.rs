use crate::io::err::BufferError;
use crate::io::read::BuffReader;
use crate::io::write::BuffWriter;
use crate::property::{decode_properties, encode_properties, Property};
use crate::types::int::VarByteInt;
use crate::types::string::MqttString;
use crate::types::will::Will;
use crate::types::ProtocolVersion;

#[derive(Debug, Clone)]
pub struct ConnectPacket<'a, const MAX_PROPS: usize> {
    pub version: ProtocolVersion,
    pub clean_start: bool,
    pub keep_alive: u16,
    pub client_id: MqttString<'a>,
    pub will: Option<Will<'a>>,
    pub username: Option<MqttString<'a>>,
    pub password: Option<&'a [u8]>,
    pub properties: heapless::Vec<Property<'a>, MAX_PROPS>,
}

impl<'a, const MAX_PROPS: usize> ConnectPacket<'a, MAX_PROPS> {
    pub fn new(version: ProtocolVersion, client_id: MqttString<'a>, keep_alive: u16) -> Self {
        ConnectPacket {
            version,
            clean_start: true,
            keep_alive,
            client_id,
            will: None,
            username: None,
            password: None,
            properties: heapless::Vec::new(),
        }
    }

    fn connect_flags(&self) -> u8 {
        let mut flags = 0u8;
        if self.clean_start {
            flags |= 0b0000_0010;
        }
        if let Some(will) = &self.will {
            flags |= 0b0000_0100;
            flags |= will.qos.into_publish_bits();
            if will.retain {
                flags |= 0b0010_0000;
            }
        }
        if self.password.is_some() {
            flags |= 0b0100_0000;
        }
        if self.username.is_some() {
            flags |= 0b1000_0000;
        }
        flags
    }

    pub fn encode(&self, w: &mut BuffWriter<'a>) -> Result<(), BufferError> {
        let protocol_name = MqttString::new("MQTT")?;
        w.write_string(&protocol_name)?;
        w.write_u8(self.version.level_byte())?;
        w.write_u8(self.connect_flags())?;
        w.write_u16(self.keep_alive)?;
        if self.version.has_properties() {
            encode_properties(w, &self.properties)?;
        }
        w.write_string(&self.client_id)?;
        if let Some(will) = &self.will {
            if self.version.has_properties() {
                let will_props: heapless::Vec<Property, MAX_PROPS> = will.properties();
                encode_properties(w, &will_props)?;
            }
            w.write_string(&will.topic)?;
            w.write_u16(will.payload.len() as u16)?;
            w.write_raw(will.payload)?;
        }
        if let Some(u) = &self.username {
            w.write_string(u)?;
        }
        if let Some(p) = &self.password {
            w.write_u16(p.len() as u16)?;
            w.write_raw(p)?;
        }
        Ok(())
    }

    pub fn decode(r: &mut BuffReader<'a>) -> Result<Self, BufferError> {
        let protocol_name = r.read_string()?;
        if protocol_name.as_str() != "MQTT" {
            return Err(BufferError::Utf8Error);
        }
        let level = r.read_u8()?;
        let version = if level == 5 {
            ProtocolVersion::V5
        } else {
            ProtocolVersion::V311
        };
        let flags = r.read_u8()?;
        let keep_alive = r.read_u16()?;
        let properties = if version.has_properties() {
            decode_properties(r)?
        } else {
            heapless::Vec::new()
        };
        let client_id = r.read_string()?;

        let has_will = flags & 0b0000_0100 != 0;
        let will = if has_will {
            let _will_props: heapless::Vec<Property, MAX_PROPS> = if version.has_properties() {
                decode_properties(r)?
            } else {
                heapless::Vec::new()
            };
            let topic = r.read_string()?;
            let payload = r.read_binary()?;
            let qos = crate::types::qos::QoS::try_from_publish_bits(flags)
                .map_err(|_| BufferError::ReservedFlagSet)?;
            let retain = flags & 0b0010_0000 != 0;
            Some(Will::new(topic, payload, qos, retain))
        } else {
            None
        };
        let username = if flags & 0b1000_0000 != 0 {
            Some(r.read_string()?)
        } else {
            None
        };
        let password = if flags & 0b0100_0000 != 0 {
            Some(r.read_binary()?)
        } else {
            None
        };

        Ok(ConnectPacket {
            version,
            clean_start: flags & 0b0000_0010 != 0,
            keep_alive,
            client_id,
            will,
            username,
            password,
            properties,
        })
    }

    pub fn encoded_variable_header_and_payload_len(&self) -> usize {
        let mut len = 6 + 2 + self.client_id.encoded_len();
        if self.version.has_properties() {
            let props_len: usize = self.properties.iter().map(Property::encoded_len).sum();
            len += VarByteInt::new(props_len as u32).map(|v| v.encoded_len()).unwrap_or(1) + props_len;
        }
        if let Some(will) = &self.will {
            if self.version.has_properties() {
                len += 1;
            }
            len += will.topic.encoded_len() + 2 + will.payload.len();
        }
        if let Some(u) = &self.username {
            len += u.encoded_len();
        }
        if let Some(p) = &self.password {
            len += 2 + p.len();
        }
        len
    }
}
