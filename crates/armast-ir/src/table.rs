//! Content-addressed node table.
//!
//! Every node constructed by the builder is interned here. The key is the
//! node's tags (tag name plus literal payload) and its ordered child
//! identities; structurally identical nodes share one identity.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::node::NodeIndex;

/// Structural key of a node.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct NodeKey {
    pub tags: Vec<String>,
    pub args: Vec<i64>,
}

impl NodeKey {
    pub const fn new(tags: Vec<String>, args: Vec<i64>) -> Self {
        Self { tags, args }
    }
}

/// Serializable record of an interned node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NodeRecord {
    /// Identity, filled in on insertion.
    pub id: u32,
    pub tag: String,
    pub args: Vec<i64>,
    /// Literal payload (names, constant values, operators).
    #[serde(flatten)]
    pub attrs: BTreeMap<String, String>,
}

impl NodeRecord {
    pub fn new(tag: &str) -> Self {
        Self {
            id: 0,
            tag: tag.to_string(),
            args: Vec::new(),
            attrs: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_attr(mut self, name: &str, value: impl ToString) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }
}

/// Interning table with sequential identities starting at 1.
#[derive(Debug)]
pub struct NodeTable {
    keys: FxHashMap<NodeKey, NodeIndex>,
    records: Vec<NodeRecord>,
    next: u32,
}

impl Default for NodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTable {
    pub fn new() -> Self {
        Self {
            keys: FxHashMap::default(),
            records: Vec::new(),
            next: 1,
        }
    }

    /// Intern a node.
    ///
    /// The first insertion of a key allocates the next identity and stores
    /// `record`; later insertions return that identity and leave the stored
    /// record untouched.
    pub fn intern(&mut self, key: NodeKey, mut record: NodeRecord) -> NodeIndex {
        if let Some(&index) = self.keys.get(&key) {
            return index;
        }
        let index = NodeIndex(self.next);
        self.next += 1;
        record.id = index.0;
        record.args.clone_from(&key.args);
        self.keys.insert(key, index);
        self.records.push(record);
        index
    }

    /// Identity of an already interned key.
    pub fn lookup(&self, key: &NodeKey) -> Option<NodeIndex> {
        self.keys.get(key).copied()
    }

    /// Record stored for an identity.
    pub fn get(&self, index: NodeIndex) -> Option<&NodeRecord> {
        let pos = usize::try_from(index.0).ok()?.checked_sub(1)?;
        self.records.get(pos)
    }

    /// Identity the next new key will receive.
    pub const fn next_index(&self) -> NodeIndex {
        NodeIndex(self.next)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records ordered by identity.
    pub fn records(&self) -> Vec<NodeRecord> {
        self.records.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(tag: &str, args: &[i64]) -> NodeKey {
        NodeKey::new(vec![tag.to_string()], args.to_vec())
    }

    #[test]
    fn test_intern_is_idempotent() {
        let mut table = NodeTable::new();
        let a = table.intern(key("var", &[]), NodeRecord::new("var"));
        let b = table.intern(key("var", &[]), NodeRecord::new("var"));
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_identities_are_sequential_from_one() {
        let mut table = NodeTable::new();
        let ids: Vec<u32> = (0..5)
            .map(|i| table.intern(key("c", &[i]), NodeRecord::new("c")).get())
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(table.next_index().get(), 6);
    }

    #[test]
    fn test_duplicate_does_not_overwrite_record() {
        let mut table = NodeTable::new();
        let first = table.intern(key("x", &[]), NodeRecord::new("x").with_attr("name", "first"));
        table.intern(key("x", &[]), NodeRecord::new("x").with_attr("name", "second"));
        let record = table.get(first).unwrap();
        assert_eq!(record.attrs["name"], "first");
    }

    #[test]
    fn test_records_carry_identity_and_args() {
        let mut table = NodeTable::new();
        table.intern(key("a", &[]), NodeRecord::new("a"));
        table.intern(key("b", &[1, -1]), NodeRecord::new("b"));
        let records = table.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[1].id, 2);
        assert_eq!(records[1].args, vec![1, -1]);
    }

    #[test]
    fn test_tags_distinguish_payload() {
        let mut table = NodeTable::new();
        let k1 = NodeKey::new(vec!["integer-constant".into(), "1".into()], vec![]);
        let k2 = NodeKey::new(vec!["integer-constant".into(), "2".into()], vec![]);
        let a = table.intern(k1, NodeRecord::new("integer-constant"));
        let b = table.intern(k2, NodeRecord::new("integer-constant"));
        assert_ne!(a, b);
        assert!(table.get(NodeIndex(0)).is_none());
    }

    #[test]
    fn test_record_serializes_flat() {
        let mut table = NodeTable::new();
        table.intern(
            key("integer-constant", &[]),
            NodeRecord::new("integer-constant").with_attr("value", 7),
        );
        let json = serde_json::to_value(&table.records()[0]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 1, "tag": "integer-constant", "args": [], "value": "7"})
        );
    }
}
