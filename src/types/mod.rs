pub mod binary;
pub mod int;
pub mod qos;
pub mod reason_code;
pub mod string;
pub mod topic;
pub mod will;

pub use binary::MqttBinary;
pub use int::VarByteInt;
pub use qos::QoS;
pub use reason_code::ReasonCode;
pub use string::MqttString;
pub use topic::{TopicFilter, TopicName};
pub use will::Will;

/// Protocol version selector threaded through codec and config types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    V311,
    V5,
}

impl ProtocolVersion {
    pub fn level_byte(self) -> u8 {
        match self {
            ProtocolVersion::V311 => 4,
            ProtocolVersion::V5 => 5,
        }
    }

    pub fn has_properties(self) -> bool {
        matches!(self, ProtocolVersion::V5)
    }
}

/// Marker returned when an encode would overflow its destination
/// buffer or a length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TooLargeToEncode;
