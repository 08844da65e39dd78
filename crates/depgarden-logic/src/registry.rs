//! Package identity metadata and the incompatibility relation.
//!
//! The registry is immutable configuration loaded once at startup — it maps
//! a package name to display metadata and answers whether two names are
//! mutually incompatible. Nothing in here changes at runtime.
//!
//! The shipped table lives in `data/identities.json` and is embedded into
//! the binary; [`IdentityRegistry::builtin`] parses it once.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Display metadata for one package name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityMeta {
    /// Equivalence key — packages sharing this name are "the same dependency".
    pub name: String,
    /// Human-facing label.
    pub label: String,
    /// Coarse grouping used by the renderer for icons/tints.
    pub category: String,
}

/// On-disk shape of the registry data file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryData {
    pub identities: Vec<IdentityMeta>,
    pub incompatible: Vec<(String, String)>,
}

/// Lookup table for identity metadata and pairwise incompatibility.
#[derive(Debug, Clone, Default)]
pub struct IdentityRegistry {
    entries: HashMap<String, IdentityMeta>,
    /// Stored with the two names ordered, so the relation is symmetric.
    incompatible: HashSet<(String, String)>,
}

fn ordered(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl IdentityRegistry {
    /// Build a registry from parsed data. Incompatibility pairs naming
    /// unknown identities are kept — the relation is over names, not entries.
    pub fn from_data(data: RegistryData) -> Self {
        let mut entries = HashMap::new();
        for meta in data.identities {
            entries.insert(meta.name.clone(), meta);
        }
        let incompatible = data
            .incompatible
            .iter()
            .map(|(a, b)| ordered(a, b))
            .collect();
        Self {
            entries,
            incompatible,
        }
    }

    /// Parse a registry from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let data: RegistryData = serde_json::from_str(json)?;
        Ok(Self::from_data(data))
    }

    /// The registry shipped with the game.
    pub fn builtin() -> Self {
        let json = include_str!("../../../data/identities.json");
        Self::from_json(json).expect("embedded identity data is valid JSON")
    }

    /// Display metadata for a name, if registered.
    pub fn metadata(&self, name: &str) -> Option<&IdentityMeta> {
        self.entries.get(name)
    }

    /// Whether two names are mutually incompatible. Symmetric; a name is
    /// never incompatible with itself.
    pub fn incompatible(&self, a: &str, b: &str) -> bool {
        if a == b {
            return false;
        }
        self.incompatible.contains(&ordered(a, b))
    }

    /// Number of registered identities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate all registered names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// All names incompatible with the given name.
    pub fn incompatible_with(&self, name: &str) -> Vec<&str> {
        self.incompatible
            .iter()
            .filter_map(|(a, b)| {
                if a == name {
                    Some(b.as_str())
                } else if b == name {
                    Some(a.as_str())
                } else {
                    None
                }
            })
            .collect()
    }
}
