// ABOUTME: Pass-scoped state: object identities already written and the global type table.
// ABOUTME: Both hand out 1-based ids in first-seen order.

use crate::reflect::Identity;
use indexmap::IndexMap;
use std::collections::HashMap;

/// Maps object identities to the id of their first appearance.
#[derive(Debug, Default)]
pub struct ReferenceTracker {
    ids: HashMap<Identity, usize>,
}

impl ReferenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of an object already written in this pass.
    #[inline]
    pub fn get(&self, identity: Identity) -> Option<usize> {
        self.ids.get(&identity).copied()
    }

    /// Register `identity`, returning its id. Registering twice returns the
    /// original id.
    pub fn register(&mut self, identity: Identity) -> usize {
        let next = self.ids.len() + 1;
        *self.ids.entry(identity).or_insert(next)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Type display names in first-seen order with their ids.
#[derive(Debug, Default)]
pub struct GlobalTypeTable {
    ids: IndexMap<&'static str, usize>,
}

impl GlobalTypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id of `type_name`, assigning the next one on first use.
    pub fn id_for(&mut self, type_name: &'static str) -> usize {
        let next = self.ids.len() + 1;
        *self.ids.entry(type_name).or_insert(next)
    }

    pub fn get(&self, type_name: &str) -> Option<usize> {
        self.ids.get(type_name).copied()
    }

    /// Entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        self.ids.iter().map(|(name, id)| (*name, *id))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
