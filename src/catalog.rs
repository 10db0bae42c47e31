//! Arm catalog: the fixed, ordered set of promotions the bandit chooses between.

use std::collections::BTreeSet;

use crate::error::ConfigError;

/// One arm: a catalog key, the promotion type name used by reward sources, and its cost.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArmSpec {
    pub key: String,
    /// Promotion type (e.g. `"25%_off"`).  Users carry a hidden preference per type.
    pub kind: String,
    /// Cost as a fraction of the purchase value.
    pub cost: f64,
}

impl ArmSpec {
    pub fn new(key: impl Into<String>, kind: impl Into<String>, cost: f64) -> Self {
        Self {
            key: key.into(),
            kind: kind.into(),
            cost,
        }
    }
}

/// Non-empty, ordered arm list; index `i` is arm `i` in the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmCatalog {
    arms: Vec<ArmSpec>,
}

impl ArmCatalog {
    /// Validate and wrap `arms`.  Keys and kinds must be unique; costs finite and >= 0.
    pub fn new(arms: Vec<ArmSpec>) -> Result<Self, ConfigError> {
        if arms.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        let mut keys = BTreeSet::new();
        let mut kinds = BTreeSet::new();
        for a in &arms {
            if !keys.insert(a.key.as_str()) {
                return Err(ConfigError::DuplicateArmKey(a.key.clone()));
            }
            if !kinds.insert(a.kind.as_str()) {
                return Err(ConfigError::DuplicateArmKind(a.kind.clone()));
            }
            if !(a.cost.is_finite() && a.cost >= 0.0) {
                return Err(ConfigError::InvalidParameter {
                    name: "arm cost",
                    value: a.cost,
                });
            }
        }
        Ok(Self { arms })
    }

    /// The standard promotion set.
    pub fn promotions() -> Self {
        Self {
            arms: vec![
                ArmSpec::new("arm_1", "10%_off", 0.10),
                ArmSpec::new("arm_2", "25%_off", 0.25),
                // Average shipping is about 5% of purchase value.
                ArmSpec::new("arm_3", "free_shipping", 0.05),
                ArmSpec::new("arm_4", "buy_one_get_one", 0.50),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.arms.len()
    }

    /// Always false; catalogs are non-empty by construction.
    pub fn is_empty(&self) -> bool {
        self.arms.is_empty()
    }

    pub fn arms(&self) -> &[ArmSpec] {
        &self.arms
    }

    pub fn get(&self, idx: usize) -> Option<&ArmSpec> {
        self.arms.get(idx)
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.arms.iter().position(|a| a.key == key)
    }

    /// Promotion type names in arm order.
    pub fn kinds(&self) -> Vec<&str> {
        self.arms.iter().map(|a| a.kind.as_str()).collect()
    }
}
