// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Table entry requests

use crate::{ActionDesc, ContextId, FieldMatch, FwdError};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The key of a table entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryDesc {
    /// Entry of an exact-match table
    Exact(Vec<FieldMatch>),
    /// Entry of a flow table: fields are matched under their masks
    Flow(Vec<FieldMatch>),
}

impl EntryDesc {
    #[must_use]
    pub fn exact(field: FieldMatch) -> Self {
        EntryDesc::Exact(vec![field])
    }
    #[must_use]
    pub fn flow(field: FieldMatch) -> Self {
        EntryDesc::Flow(vec![field])
    }
    #[must_use]
    pub fn fields(&self) -> &[FieldMatch] {
        match self {
            EntryDesc::Exact(fields) | EntryDesc::Flow(fields) => fields,
        }
    }
}

impl Display for EntryDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (kind, fields) = match self {
            EntryDesc::Exact(fields) => ("exact", fields),
            EntryDesc::Flow(fields) => ("flow", fields),
        };
        write!(f, "{kind}[")?;
        for (n, field) in fields.iter().enumerate() {
            if n > 0 {
                write!(f, ",")?;
            }
            write!(f, "{field}")?;
        }
        write!(f, "]")
    }
}

/// A request to add entries to a table.
///
/// Entries and their actions may be given together ([`Self::entry`]) or separately:
/// [`Self::append_entry`] adds keys and each call to [`Self::append_actions`] provides the
/// actions of the next entry, in order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntryAddRequest {
    pub context: ContextId,
    pub table: String,
    entries: Vec<EntryDesc>,
    actions: Vec<Vec<ActionDesc>>,
}

impl TableEntryAddRequest {
    #[must_use]
    pub fn new(context: ContextId, table: impl Into<String>) -> Self {
        Self {
            context,
            table: table.into(),
            entries: vec![],
            actions: vec![],
        }
    }
    #[must_use]
    pub fn entry(mut self, entry: EntryDesc, actions: Vec<ActionDesc>) -> Self {
        self.entries.push(entry);
        self.actions.push(actions);
        self
    }
    pub fn append_entry(&mut self, entry: EntryDesc) -> &mut Self {
        self.entries.push(entry);
        self
    }
    pub fn append_actions(&mut self, actions: Vec<ActionDesc>) -> &mut Self {
        self.actions.push(actions);
        self
    }
    #[must_use]
    pub fn entries(&self) -> &[EntryDesc] {
        &self.entries
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    /// Check that every entry has exactly one list of actions.
    pub fn validate(&self) -> Result<(), FwdError> {
        if self.entries.len() == self.actions.len() {
            Ok(())
        } else {
            Err(FwdError::Invalid(format!(
                "table {}: {} entries but {} action lists",
                self.table,
                self.entries.len(),
                self.actions.len()
            )))
        }
    }
    /// Iterate over entries paired with their actions.
    pub fn iter(&self) -> impl Iterator<Item = (&EntryDesc, &[ActionDesc])> {
        self.entries
            .iter()
            .zip(self.actions.iter().map(Vec::as_slice))
    }
    #[must_use]
    pub fn into_parts(self) -> Vec<(EntryDesc, Vec<ActionDesc>)> {
        self.entries.into_iter().zip(self.actions).collect()
    }
}

/// A request to remove entries from a table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntryRemoveRequest {
    pub context: ContextId,
    pub table: String,
    pub entries: Vec<EntryDesc>,
}

impl TableEntryRemoveRequest {
    #[must_use]
    pub fn new(context: ContextId, table: impl Into<String>) -> Self {
        Self {
            context,
            table: table.into(),
            entries: vec![],
        }
    }
    #[must_use]
    pub fn entry(mut self, entry: EntryDesc) -> Self {
        self.entries.push(entry);
        self
    }
}
