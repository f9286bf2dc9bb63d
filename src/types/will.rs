use crate::property::Property;
use crate::types::qos::QoS;
use crate::types::string::MqttString;

/// The message a broker publishes on the client's behalf if the
/// connection drops ungracefully, carried in the CONNECT payload.
#[derive(Debug, Clone, Copy)]
pub struct Will<'a> {
    pub topic: MqttString<'a>,
    pub payload: &'a [u8],
    pub qos: QoS,
    pub retain: bool,
    /// v5 only: seconds the broker should wait after a network
    /// failure before publishing the will.
    pub delay_interval: Option<u32>,
    pub payload_format_indicator: Option<u8>,
    pub message_expiry_interval: Option<u32>,
    pub content_type: Option<MqttString<'a>>,
    pub response_topic: Option<MqttString<'a>>,
    pub correlation_data: Option<&'a [u8]>,
}

impl<'a> Will<'a> {
    pub fn new(topic: MqttString<'a>, payload: &'a [u8], qos: QoS, retain: bool) -> Self {
        Will {
            topic,
            payload,
            qos,
            retain,
            delay_interval: None,
            payload_format_indicator: None,
            message_expiry_interval: None,
            content_type: None,
            response_topic: None,
            correlation_data: None,
        }
    }

    pub fn with_delay_interval(mut self, secs: u32) -> Self {
        self.delay_interval = Some(secs);
        self
    }

    /// Properties this will message contributes to the CONNECT
    /// payload's will-properties block (v5 only).
    pub fn properties<const N: usize>(&self) -> heapless::Vec<Property<'a>, N> {
        let mut props = heapless::Vec::new();
        if let Some(d) = self.delay_interval {
            let _ = props.push(Property::WillDelayInterval(d));
        }
        if let Some(p) = self.payload_format_indicator {
            let _ = props.push(Property::PayloadFormatIndicator(p));
        }
        if let Some(e) = self.message_expiry_interval {
            let _ = props.push(Property::MessageExpiryInterval(e));
        }
        if let Some(ct) = self.content_type {
            let _ = props.push(Property::ContentType(ct));
        }
        if let Some(rt) = self.response_topic {
            let _ = props.push(Property::ResponseTopic(rt));
        }
        if let Some(cd) = self.correlation_data {
            let _ = props.push(Property::CorrelationData(cd));
        }
        props
    }
}
