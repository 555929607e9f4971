//! Recorded state of managed resources
//!
//! The state document is the last known view of every resource this tool
//! created. It is keyed by [`Address`]; persistence is up to the caller.

use crate::types::Address;
use serde::{Deserialize, Serialize};

/// One managed resource as last observed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub resource_type: String,
    pub name: String,
    /// Remote-issued or synthetic identifier
    pub id: String,
    /// Attribute document (a JSON object)
    pub attributes: serde_json::Value,
}

impl StateRecord {
    /// Address of this record
    pub fn address(&self) -> Address {
        Address::new(&self.resource_type, &self.name)
    }

    /// Check if this record lives at `address`
    pub fn is_at(&self, address: &Address) -> bool {
        self.resource_type == address.resource_type && self.name == address.name
    }
}

/// All recorded resources
///
/// `serial` increases with every mutation so callers can tell whether the
/// document needs to be written back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(default)]
    pub serial: u64,
    #[serde(default)]
    pub resources: Vec<StateRecord>,
}

impl StateDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a record
    pub fn get(&self, address: &Address) -> Option<&StateRecord> {
        self.resources.iter().find(|r| r.is_at(address))
    }

    /// Insert a record, replacing any record at the same address in place
    pub fn upsert(&mut self, record: StateRecord) {
        let address = record.address();
        match self.resources.iter_mut().find(|r| r.is_at(&address)) {
            Some(existing) => *existing = record,
            None => self.resources.push(record),
        }
        self.serial += 1;
    }

    /// Remove a record, returning it if it existed
    pub fn remove(&mut self, address: &Address) -> Option<StateRecord> {
        let index = self.resources.iter().position(|r| r.is_at(address))?;
        self.serial += 1;
        Some(self.resources.remove(index))
    }

    /// Addresses of all records, in recorded order
    pub fn addresses(&self) -> Vec<Address> {
        self.resources.iter().map(StateRecord::address).collect()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Check if there are no records
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(name: &str, id: &str) -> StateRecord {
        StateRecord {
            resource_type: "application_role_membership".into(),
            name: name.into(),
            id: id.into(),
            attributes: json!({ "id": id }),
        }
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut doc = StateDocument::new();
        doc.upsert(record("a", "1"));
        doc.upsert(record("b", "2"));
        doc.upsert(record("a", "3"));

        assert_eq!(doc.len(), 2);
        assert_eq!(doc.resources[0].id, "3");
        assert_eq!(doc.serial, 3);
    }

    #[test]
    fn test_remove() {
        let mut doc = StateDocument::new();
        doc.upsert(record("a", "1"));

        let address = Address::new("application_role_membership", "a");
        assert!(doc.remove(&address).is_some());
        assert!(doc.remove(&address).is_none());
        assert!(doc.is_empty());
        assert_eq!(doc.serial, 2);
    }

    #[test]
    fn test_get_and_addresses() {
        let mut doc = StateDocument::new();
        doc.upsert(record("a", "1"));
        doc.upsert(record("b", "2"));

        let b = Address::new("application_role_membership", "b");
        assert_eq!(doc.get(&b).map(|r| r.id.as_str()), Some("2"));
        assert_eq!(doc.addresses().len(), 2);
        assert!(doc.get(&Address::new("source_control", "b")).is_none());
    }
}
