//! User records as yielded by a user source.

use std::collections::BTreeMap;

/// One subject in the stream.
///
/// `features` are visible to the bandit (through a [`FeatureSchema`](crate::FeatureSchema)).
/// `preferences` are the hidden per-arm-type ground truth; only reward sources read them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserRecord {
    pub id: u64,
    pub features: BTreeMap<String, f64>,
    preferences: BTreeMap<String, f64>,
}

impl UserRecord {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn with_feature(mut self, name: impl Into<String>, value: f64) -> Self {
        self.features.insert(name.into(), value);
        self
    }

    pub fn with_preference(mut self, kind: impl Into<String>, value: f64) -> Self {
        self.preferences.insert(kind.into(), value);
        self
    }

    pub fn set_preference(&mut self, kind: impl Into<String>, value: f64) {
        self.preferences.insert(kind.into(), value);
    }

    pub fn feature(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied()
    }

    /// Hidden preference for an arm type.  For reward sources, not policies.
    pub fn preference(&self, kind: &str) -> Option<f64> {
        self.preferences.get(kind).copied()
    }
}
