/// PINGREQ and PINGRESP carry no variable header or payload; their
/// fixed header (type byte + remaining length 0) is the entire wire
/// representation, handled directly by [`crate::header`].
#[derive(Debug, Clone, Copy)]
pub struct PingreqPacket;

#[derive(Debug, Clone, Copy)]
pub struct PingrespPacket;
