//! Shared types used across the application.

use std::fmt;

use uuid::Uuid;

use crate::common::error::InvalidGatewayId;

/// 64-bit gateway identifier (EUI-64), as reported by the concentrator
/// daemon. Fixed for the lifetime of a backend instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GatewayId([u8; 8]);

impl GatewayId {
    /// Length of the identifier in bytes.
    pub const LEN: usize = 8;

    pub fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Identifier as it appears in protobuf payloads.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl From<[u8; 8]> for GatewayId {
    fn from(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for GatewayId {
    type Error = InvalidGatewayId;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; 8] = bytes
            .try_into()
            .map_err(|_| InvalidGatewayId { len: bytes.len() })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for GatewayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Notification that the bridge started or stopped listening for a gateway.
///
/// Exactly one `subscribe = true` event is emitted per backend instance,
/// right after the gateway identifier became known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeEvent {
    pub subscribe: bool,
    pub gateway_id: GatewayId,
}

/// Read a UUID out of identifier bytes of any length.
///
/// Identifiers on the wire are 16 bytes when set and empty when not.
/// Shorter input is zero padded, longer input is truncated, so logging
/// never fails on an odd payload.
pub fn uuid_from_bytes(bytes: &[u8]) -> Uuid {
    let mut buf = [0u8; 16];
    let len = bytes.len().min(buf.len());
    buf[..len].copy_from_slice(&bytes[..len]);
    Uuid::from_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_id_displays_as_hex() {
        let id = GatewayId::new([0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);
        assert_eq!(id.to_string(), "0102030405060708");
    }

    #[test]
    fn test_gateway_id_from_slice_requires_eight_bytes() {
        let id = GatewayId::try_from(&[0xffu8; 8][..]).unwrap();
        assert_eq!(id.as_bytes(), &[0xff; 8]);

        let err = GatewayId::try_from(&[0u8; 3][..]).unwrap_err();
        assert_eq!(err.len, 3);

        let err = GatewayId::try_from(&[0u8; 9][..]).unwrap_err();
        assert_eq!(err.len, 9);
    }

    #[test]
    fn test_uuid_from_bytes_pads_short_input() {
        let uuid = uuid_from_bytes(&[]);
        assert_eq!(uuid, Uuid::nil());

        let uuid = uuid_from_bytes(&[0xab]);
        assert_eq!(uuid.as_bytes()[0], 0xab);
        assert_eq!(&uuid.as_bytes()[1..], &[0u8; 15]);
    }

    #[test]
    fn test_uuid_from_bytes_truncates_long_input() {
        let long = [0x11u8; 20];
        let uuid = uuid_from_bytes(&long);
        assert_eq!(uuid.as_bytes(), &[0x11; 16]);
    }
}
