use crate::io::err::BufferError;
use crate::types::string::MqttString;

/// A topic name used on a publish: non-empty, no embedded wildcard
/// characters (`+`, `#`), no embedded null -- MQTT-4.7.0-1,
/// MQTT-4.7.3-1, MQTT-4.7.3-2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicName<'a>(MqttString<'a>);

impl<'a> TopicName<'a> {
    pub fn new(s: &'a str) -> Result<Self, BufferError> {
        if s.is_empty() {
            return Err(BufferError::Utf8Error);
        }
        if s.contains(['+', '#']) {
            return Err(BufferError::Utf8Error);
        }
        Ok(TopicName(MqttString::new(s)?))
    }

    /// The empty topic name used on the wire alongside a v5 topic
    /// alias, where the alias (not this field) names the destination
    /// -- see the topic-alias tables (C5). Not exposed as a public
    /// constructor: callers reach this through [`MqttClient::publish`]'s
    /// alias substitution, never by passing an empty string directly.
    pub(crate) fn empty() -> Self {
        TopicName(MqttString::new("").expect("empty string is always valid"))
    }

    pub fn as_str(&self) -> &'a str {
        self.0.as_str()
    }

    pub fn as_mqtt_string(&self) -> MqttString<'a> {
        self.0
    }

    /// An empty topic name decodes successfully here (unlike `new`) so
    /// a topic-alias publish's wire-format "" + alias property can be
    /// parsed; the higher engine layer resolves the alias to a real
    /// topic before the caller ever sees the event (C5).
    pub fn decode(buf: &'a [u8]) -> Result<(Self, usize), BufferError> {
        let (s, consumed) = MqttString::decode(buf)?;
        if s.as_str().is_empty() {
            return Ok((TopicName::empty(), consumed));
        }
        Ok((TopicName::new(s.as_str())?, consumed))
    }
}

/// A topic filter used on subscribe/unsubscribe: may contain `+`
/// (single-level) and `#` (multi-level, only as the final level)
/// wildcards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicFilter<'a>(MqttString<'a>);

impl<'a> TopicFilter<'a> {
    pub fn new(s: &'a str) -> Result<Self, BufferError> {
        if s.is_empty() {
            return Err(BufferError::Utf8Error);
        }
        let level_count = s.split('/').count();
        for (i, level) in s.split('/').enumerate() {
            if level.contains('#') && (level != "#" || i != level_count - 1) {
                return Err(BufferError::Utf8Error);
            }
            if level.contains('+') && level != "+" {
                return Err(BufferError::Utf8Error);
            }
        }
        Ok(TopicFilter(MqttString::new(s)?))
    }

    pub fn as_str(&self) -> &'a str {
        self.0.as_str()
    }

    pub fn as_mqtt_string(&self) -> MqttString<'a> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wildcards_in_topic_name() {
        assert!(TopicName::new("a/+/b").is_err());
        assert!(TopicName::new("a/#").is_err());
        assert!(TopicName::new("").is_err());
        assert!(TopicName::new("a/b").is_ok());
    }

    #[test]
    fn decode_accepts_empty_topic_for_alias_use() {
        // 0x00 0x00 is an empty-string length prefix: a v5 publish
        // using a topic alias carries exactly this.
        let (topic, consumed) = TopicName::decode(&[0x00, 0x00]).unwrap();
        assert_eq!(topic.as_str(), "");
        assert_eq!(consumed, 2);
    }

    #[test]
    fn topic_filter_accepts_wildcards() {
        assert!(TopicFilter::new("sport/tennis/+").is_ok());
        assert!(TopicFilter::new("sport/#").is_ok());
        assert!(TopicFilter::new("sport/+/player1").is_ok());
    }

    #[test]
    fn topic_filter_rejects_multi_level_not_at_end() {
        assert!(TopicFilter::new("sport/#/extra").is_err());
    }

    #[test]
    fn topic_filter_rejects_partial_wildcard_level() {
        assert!(TopicFilter::new("sport+").is_err());
    }
}
