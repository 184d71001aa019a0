//! Specifier aggregation.
//!
//! Merges raw specifiers from walks and probes into the set of top-level
//! package names a target depends on.

use std::collections::BTreeSet;
use std::collections::btree_set;

use serde::{Deserialize, Serialize};

use crate::resolver::{NativeModules, SpecifierKind};

/// Set of discovered names.
///
/// Ordered for stable output only; callers must not rely on the order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscoverySet(BTreeSet<String>);

impl DiscoverySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(name.into())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.0.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, String> {
        self.0.iter()
    }

    /// Set union; commutative and associative.
    pub fn merge(&mut self, other: DiscoverySet) {
        self.0.extend(other.0);
    }
}

impl FromIterator<String> for DiscoverySet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for DiscoverySet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(str::to_string).collect())
    }
}

impl Extend<String> for DiscoverySet {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for DiscoverySet {
    type Item = String;
    type IntoIter = btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a DiscoverySet {
    type Item = &'a String;
    type IntoIter = btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Normalize raw specifiers into a [`DiscoverySet`].
///
/// In raw mode every specifier passes through unchanged. Otherwise native,
/// relative and absolute specifiers are dropped and package specifiers are
/// truncated to their package name (`socket.io/lib/utils` -> `socket.io`,
/// `@scope/pkg/sub` -> `@scope/pkg`). Names that truncate to a builtin are
/// dropped as well. Normalizing a normalized set is a no-op.
pub fn normalize<I, S>(raw: I, raw_mode: bool, natives: &NativeModules) -> DiscoverySet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut set = DiscoverySet::new();
    for specifier in raw {
        let specifier = specifier.as_ref();
        if raw_mode {
            set.insert(specifier);
            continue;
        }
        if let SpecifierKind::Package { name, .. } = SpecifierKind::classify(specifier, natives) {
            // `assert/x` truncates to the builtin `assert`
            if !name.is_empty() && !natives.contains(&name) {
                set.insert(name);
            }
        }
    }
    set
}
