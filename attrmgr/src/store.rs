// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Identifier allocation and attribute storage

use crate::attrs::{Attributes, PortOperStatus};
use crate::Oid;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
#[allow(unused)]
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum AttrError {
    #[error("No such object: {0}")]
    NotFound(Oid),
    #[error("Object {oid} has no attribute '{attr}'")]
    MissingAttribute { oid: Oid, attr: &'static str },
    #[error("Object {oid} is a {found}, not a {expected}")]
    KindMismatch {
        oid: Oid,
        expected: &'static str,
        found: &'static str,
    },
}

/// Allocates object identifiers and serves the typed attributes of objects.
pub trait AttributeStore: Send + Sync {
    /// Allocate a fresh identifier. Identifiers are strictly increasing and never reused.
    fn next_id(&self) -> Oid;

    /// Store the attributes of an object, merging them with any previously stored.
    fn store(&self, oid: Oid, attrs: Attributes) -> Result<(), AttrError>;

    /// Get the attributes of an object
    fn get(&self, oid: Oid) -> Option<Attributes>;

    /// Resolve the CPU port configured for the given switch.
    fn switch_cpu_port(&self, switch: Oid) -> Result<Oid, AttrError> {
        match self.get(switch) {
            None => Err(AttrError::NotFound(switch)),
            Some(Attributes::Switch(attr)) => attr.cpu_port.ok_or(AttrError::MissingAttribute {
                oid: switch,
                attr: "cpu_port",
            }),
            Some(other) => Err(AttrError::KindMismatch {
                oid: switch,
                expected: "switch",
                found: other.kind(),
            }),
        }
    }

    /// Get the operational status of a port.
    fn port_oper_status(&self, port: Oid) -> Result<PortOperStatus, AttrError> {
        match self.get(port) {
            None => Err(AttrError::NotFound(port)),
            Some(Attributes::Port(attr)) => attr.oper_status.ok_or(AttrError::MissingAttribute {
                oid: port,
                attr: "oper_status",
            }),
            Some(other) => Err(AttrError::KindMismatch {
                oid: port,
                expected: "port",
                found: other.kind(),
            }),
        }
    }
}

/// An in-memory [`AttributeStore`].
#[derive(Debug)]
pub struct AttrMgr {
    next: AtomicU64,
    objects: RwLock<HashMap<Oid, Attributes>>,
}

impl Default for AttrMgr {
    fn default() -> Self {
        Self::new()
    }
}

impl AttrMgr {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            objects: RwLock::new(HashMap::new()),
        }
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl AttributeStore for AttrMgr {
    fn next_id(&self) -> Oid {
        Oid::new(self.next.fetch_add(1, Ordering::Relaxed))
    }

    fn store(&self, oid: Oid, attrs: Attributes) -> Result<(), AttrError> {
        let mut objects = self.objects.write();
        match objects.get_mut(&oid) {
            None => {
                debug!("Storing {} attributes of {oid}", attrs.kind());
                objects.insert(oid, attrs);
                Ok(())
            }
            Some(current) => {
                if current.merge_from(&attrs) {
                    Ok(())
                } else {
                    warn!("Refusing to store {} attributes over {oid}", attrs.kind());
                    Err(AttrError::KindMismatch {
                        oid,
                        expected: current.kind(),
                        found: attrs.kind(),
                    })
                }
            }
        }
    }

    fn get(&self, oid: Oid) -> Option<Attributes> {
        self.objects.read().get(&oid).cloned()
    }
}
