/// Delivery guarantee level for a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QoS {
    #[default]
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl QoS {
    /// Encodes into the two qos bits of a publish fixed header,
    /// already shifted into bits 2..1.
    pub fn into_publish_bits(self) -> u8 {
        (self as u8) << 1
    }

    pub fn try_from_publish_bits(flags: u8) -> Result<Self, InvalidQoS> {
        match (flags >> 1) & 0b11 {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            _ => Err(InvalidQoS),
        }
    }

    /// Encodes into the low two bits of a subscribe option byte.
    pub fn into_subscribe_bits(self) -> u8 {
        self as u8
    }

    pub fn try_from_subscribe_bits(bits: u8) -> Result<Self, InvalidQoS> {
        match bits & 0b11 {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            _ => Err(InvalidQoS),
        }
    }

    pub fn requires_packet_id(self) -> bool {
        !matches!(self, QoS::AtMostOnce)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidQoS;
