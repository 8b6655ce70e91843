// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! SAI object identifiers

use fwd::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// An opaque SAI object identifier. Identifiers are allocated by an
/// [`crate::AttributeStore`] and never reused.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Oid(u64);

impl Oid {
    /// The null object id. Never handed out by an allocator.
    pub const NULL: Oid = Oid(0);

    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for Oid {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Oid> for u64 {
    fn from(value: Oid) -> Self {
        value.0
    }
}

/// The forwarding engine names its objects with the decimal rendering of the SAI id.
impl From<Oid> for ObjectId {
    fn from(value: Oid) -> Self {
        ObjectId::new(value.0.to_string())
    }
}

impl Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "oid:{:#x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::Oid;
    use fwd::ObjectId;

    #[test]
    fn test_oid_rendering() {
        let oid = Oid::new(26);
        assert_eq!(oid.to_string(), "oid:0x1a");
        assert_eq!(ObjectId::from(oid), ObjectId::new("26"));
        assert!(Oid::NULL.is_null());
        assert!(!oid.is_null());
    }
}
