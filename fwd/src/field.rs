// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Packet fields and matches over them

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Packet fields that the SAI server matches on or writes to.
/// `HostPortId`, `PacketPortInput` and `TrapId` are metadata fields: they are not part of the
/// wire format of the packet but are carried along with it through the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketField {
    EtherType,
    EtherMacDst,
    L4PortSrc,
    L4PortDst,
    HostPortId,
    PacketPortInput,
    TrapId,
}

impl Display for PacketField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PacketField::EtherType => "ether-type",
            PacketField::EtherMacDst => "ether-mac-dst",
            PacketField::L4PortSrc => "l4-port-src",
            PacketField::L4PortDst => "l4-port-dst",
            PacketField::HostPortId => "host-port-id",
            PacketField::PacketPortInput => "packet-port-input",
            PacketField::TrapId => "trap-id",
        };
        write!(f, "{name}")
    }
}

/// A match on a packet field. Values are in network byte order. Exact matches have no mask.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldMatch {
    pub field: PacketField,
    pub bytes: Vec<u8>,
    pub mask: Option<Vec<u8>>,
}

impl FieldMatch {
    #[must_use]
    pub fn exact(field: PacketField, bytes: &[u8]) -> Self {
        Self {
            field,
            bytes: bytes.to_vec(),
            mask: None,
        }
    }
    #[must_use]
    pub fn exact_u64(field: PacketField, value: u64) -> Self {
        Self::exact(field, &value.to_be_bytes())
    }
    /// Build a masked match. Panics if the value and the mask differ in length.
    #[must_use]
    pub fn masked(field: PacketField, bytes: &[u8], mask: &[u8]) -> Self {
        assert_eq!(bytes.len(), mask.len(), "value and mask lengths differ");
        Self {
            field,
            bytes: bytes.to_vec(),
            mask: Some(mask.to_vec()),
        }
    }
    /// A masked match that considers every bit of a 16-bit value.
    #[must_use]
    pub fn masked_u16(field: PacketField, value: u16) -> Self {
        Self::masked(field, &value.to_be_bytes(), &[0xff, 0xff])
    }
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.mask.is_none()
    }
    /// Interpret the value as a big-endian integer, if it fits in a u64.
    #[must_use]
    pub fn value_u64(&self) -> Option<u64> {
        if self.bytes.len() > 8 {
            return None;
        }
        Some(self.bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }
}

impl Display for FieldMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}=", self.field)?;
        for b in &self.bytes {
            write!(f, "{b:02x}")?;
        }
        if let Some(mask) = &self.mask {
            write!(f, "/")?;
            for b in mask {
                write!(f, "{b:02x}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldMatch, PacketField};

    #[test]
    fn test_field_match_values() {
        let m = FieldMatch::exact_u64(PacketField::HostPortId, 0x1234);
        assert!(m.is_exact());
        assert_eq!(m.bytes.len(), 8);
        assert_eq!(m.value_u64(), Some(0x1234));

        let m = FieldMatch::masked_u16(PacketField::L4PortDst, 179);
        assert!(!m.is_exact());
        assert_eq!(m.bytes, vec![0x00, 0xb3]);
        assert_eq!(m.value_u64(), Some(179));
        assert_eq!(m.to_string(), "l4-port-dst=00b3/ffff");
    }

    #[test]
    #[should_panic(expected = "value and mask lengths differ")]
    fn test_masked_length_mismatch() {
        let _ = FieldMatch::masked(PacketField::EtherMacDst, &[0x33, 0x33], &[0xff]);
    }
}
