//! Security rules for the in-process store.

use crate::types::{Operation, ResourcePath};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Allowed operations, by collection.
///
/// A collection with an explicit entry uses exactly that set; every other
/// collection uses the default set. Documents inherit the rules of the
/// collection that holds them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccessRules {
    default: BTreeSet<Operation>,
    collections: HashMap<String, BTreeSet<Operation>>,
}

impl AccessRules {
    /// Everything allowed everywhere.
    pub fn allow_all() -> Self {
        Self {
            default: Operation::ALL.into_iter().collect(),
            collections: HashMap::new(),
        }
    }

    /// Nothing allowed anywhere.
    pub fn deny_all() -> Self {
        Self {
            default: BTreeSet::new(),
            collections: HashMap::new(),
        }
    }

    /// Reads allowed everywhere, writes denied (the public site's posture).
    pub fn public_read() -> Self {
        Self {
            default: [Operation::Get, Operation::List].into_iter().collect(),
            collections: HashMap::new(),
        }
    }

    /// Replace the allowed set for one collection.
    pub fn with_collection(mut self, collection: &str, allowed: &[Operation]) -> Self {
        self.collections.insert(
            collection.trim_matches('/').to_string(),
            allowed.iter().copied().collect(),
        );
        self
    }

    /// Add `operations` to one collection's allowed set.
    pub fn allow(mut self, collection: &str, operations: &[Operation]) -> Self {
        let key = collection.trim_matches('/').to_string();
        let default = self.default.clone();
        let entry = self.collections.entry(key).or_insert(default);
        entry.extend(operations.iter().copied());
        self
    }

    /// Remove `operations` from one collection's allowed set.
    pub fn deny(mut self, collection: &str, operations: &[Operation]) -> Self {
        let key = collection.trim_matches('/').to_string();
        let default = self.default.clone();
        let entry = self.collections.entry(key).or_insert(default);
        for op in operations {
            entry.remove(op);
        }
        self
    }

    /// Whether `operation` is allowed on `collection`.
    pub fn permits(&self, collection: &ResourcePath, operation: Operation) -> bool {
        self.collections
            .get(&collection.canonical_string())
            .unwrap_or(&self.default)
            .contains(&operation)
    }
}

impl Default for AccessRules {
    fn default() -> Self {
        Self::allow_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> ResourcePath {
        ResourcePath::parse(p).unwrap()
    }

    #[test]
    fn test_public_read_denies_writes() {
        let rules = AccessRules::public_read();
        assert!(rules.permits(&path("holidayPackages"), Operation::List));
        assert!(rules.permits(&path("holidayPackages"), Operation::Get));
        assert!(!rules.permits(&path("holidayPackages"), Operation::Create));
    }

    #[test]
    fn test_collection_override() {
        let rules = AccessRules::public_read().allow("testimonials", &[Operation::Create]);
        assert!(rules.permits(&path("testimonials"), Operation::Create));
        assert!(rules.permits(&path("testimonials"), Operation::List));
        assert!(!rules.permits(&path("testimonials"), Operation::Delete));
        assert!(!rules.permits(&path("blog"), Operation::Create));
    }

    #[test]
    fn test_deny_removes_from_default() {
        let rules = AccessRules::allow_all().deny("/videos/", &[Operation::List]);
        assert!(!rules.permits(&path("videos"), Operation::List));
        assert!(rules.permits(&path("videos"), Operation::Get));
        assert!(rules.permits(&path("blog"), Operation::List));
    }

    #[test]
    fn test_deny_all() {
        let rules = AccessRules::deny_all();
        for op in Operation::ALL {
            assert!(!rules.permits(&path("siteConfig"), op));
        }
    }
}
