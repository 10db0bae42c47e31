//! Context vectors: a user's configured features with a leading intercept.

use std::collections::BTreeSet;

use crate::error::ConfigError;
use crate::UserRecord;

/// Immutable context vector `[1, f_1, ..., f_k]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Context(Vec<f64>);

impl Context {
    /// Prepend the intercept to `features`.
    pub fn with_intercept(features: &[f64]) -> Self {
        let mut v = Vec::with_capacity(features.len() + 1);
        v.push(1.0);
        v.extend_from_slice(features);
        Self(v)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false: the intercept is always present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[f64]> for Context {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

/// Ordered feature names; fixed once per run and shared by every user.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Vec<String>", into = "Vec<String>"))]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self {
            names: vec![
                "days_since_last_purchase".to_string(),
                "avg_purchase_value".to_string(),
                "is_frequent_buyer".to_string(),
            ],
        }
    }
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = ConfigError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(s: FeatureSchema) -> Self {
        s.names
    }
}

impl FeatureSchema {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Result<Self, ConfigError> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut seen = BTreeSet::new();
        for n in &names {
            if !seen.insert(n.as_str()) {
                return Err(ConfigError::DuplicateFeature(n.clone()));
            }
        }
        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Context length: features plus intercept.
    pub fn dim(&self) -> usize {
        self.names.len() + 1
    }

    /// Raw feature values in schema order.
    pub fn raw_features(&self, user: &UserRecord) -> Result<Vec<f64>, ConfigError> {
        let mut out = Vec::with_capacity(self.names.len());
        for name in &self.names {
            let Some(v) = user.feature(name) else {
                return Err(ConfigError::MissingFeature {
                    user_id: user.id,
                    feature: name.clone(),
                });
            };
            if !v.is_finite() {
                return Err(ConfigError::NonFiniteFeature {
                    user_id: user.id,
                    feature: name.clone(),
                });
            }
            out.push(v);
        }
        Ok(out)
    }

    /// Unscaled context for `user`.
    pub fn context_for(&self, user: &UserRecord) -> Result<Context, ConfigError> {
        Ok(Context::with_intercept(&self.raw_features(user)?))
    }
}

/// Optional feature preprocessing before the intercept is prepended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FeatureScaling {
    /// Raw feature values.
    #[default]
    None,
    /// Z-score each feature with statistics fitted once over the whole user collection.
    Standardize,
}

/// Per-feature mean and standard deviation.
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl Standardizer {
    /// Fit over `rows` of equal width `k`.  A zero-variance feature gets std 1.
    pub fn fit(rows: &[Vec<f64>], k: usize) -> Self {
        let n = rows.len().max(1) as f64;
        let mut mean = vec![0.0; k];
        for r in rows {
            for (m, v) in mean.iter_mut().zip(r.iter()) {
                *m += v;
            }
        }
        for m in &mut mean {
            *m /= n;
        }
        let mut var = vec![0.0; k];
        for r in rows {
            for ((s, v), m) in var.iter_mut().zip(r.iter()).zip(mean.iter()) {
                *s += (v - m) * (v - m);
            }
        }
        let std = var
            .into_iter()
            .map(|s| {
                let sd = (s / n).sqrt();
                if sd.is_finite() && sd > 0.0 {
                    sd
                } else {
                    1.0
                }
            })
            .collect();
        Self { mean, std }
    }

    pub fn apply(&self, raw: &mut [f64]) {
        for ((v, m), s) in raw.iter_mut().zip(self.mean.iter()).zip(self.std.iter()) {
            *v = (*v - m) / s;
        }
    }
}

/// Builds every user's context up front, so malformed records fail before any decision.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    schema: FeatureSchema,
    scaler: Option<Standardizer>,
}

impl ContextBuilder {
    pub fn new(schema: FeatureSchema) -> Self {
        Self {
            schema,
            scaler: None,
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Contexts for all `users`, in order.
    ///
    /// Under [`FeatureScaling::Standardize`] the scaler is fitted on these same users.
    pub fn build_all(
        &mut self,
        users: &[UserRecord],
        scaling: FeatureScaling,
    ) -> Result<Vec<Context>, ConfigError> {
        let raw = users
            .iter()
            .map(|u| self.schema.raw_features(u))
            .collect::<Result<Vec<_>, _>>()?;
        self.scaler = match scaling {
            FeatureScaling::None => None,
            FeatureScaling::Standardize => Some(Standardizer::fit(&raw, self.schema.len())),
        };
        Ok(raw
            .into_iter()
            .map(|mut r| {
                if let Some(s) = &self.scaler {
                    s.apply(&mut r);
                }
                Context::with_intercept(&r)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: u64) -> UserRecord {
        UserRecord::new(id)
            .with_feature("days_since_last_purchase", 10.0)
            .with_feature("avg_purchase_value", 200.0)
            .with_feature("is_frequent_buyer", 1.0)
    }

    #[test]
    fn context_has_leading_intercept_in_schema_order() {
        let s = FeatureSchema::default();
        let c = s.context_for(&user(1)).unwrap();
        assert_eq!(c.as_slice(), &[1.0, 10.0, 200.0, 1.0]);
        assert_eq!(c.len(), s.dim());
    }

    #[test]
    fn missing_feature_is_a_config_error() {
        let s = FeatureSchema::default();
        let u = UserRecord::new(9).with_feature("days_since_last_purchase", 1.0);
        assert_eq!(
            s.context_for(&u),
            Err(ConfigError::MissingFeature {
                user_id: 9,
                feature: "avg_purchase_value".to_string()
            })
        );
        let nan = user(3).with_feature("is_frequent_buyer", f64::NAN);
        assert!(matches!(
            s.context_for(&nan),
            Err(ConfigError::NonFiniteFeature { user_id: 3, .. })
        ));
    }

    #[test]
    fn duplicate_feature_names_are_rejected() {
        assert_eq!(
            FeatureSchema::new(["a", "b", "a"]),
            Err(ConfigError::DuplicateFeature("a".to_string()))
        );
        let empty = FeatureSchema::new(Vec::<String>::new()).unwrap();
        assert_eq!(empty.dim(), 1);
    }

    #[test]
    fn standardize_centers_and_scales() {
        let s = FeatureSchema::new(["x", "c"]).unwrap();
        let users: Vec<UserRecord> = [1.0, 2.0, 3.0]
            .iter()
            .enumerate()
            .map(|(i, v)| {
                UserRecord::new(i as u64)
                    .with_feature("x", *v)
                    .with_feature("c", 5.0)
            })
            .collect();
        let mut b = ContextBuilder::new(s);
        let ctxs = b.build_all(&users, FeatureScaling::Standardize).unwrap();
        let sd = (2.0f64 / 3.0).sqrt();
        assert_eq!(ctxs[1].as_slice(), &[1.0, 0.0, 0.0]);
        assert!((ctxs[0].as_slice()[1] + 1.0 / sd).abs() < 1e-12);
        assert!((ctxs[2].as_slice()[1] - 1.0 / sd).abs() < 1e-12);

        let raw = b.build_all(&users, FeatureScaling::None).unwrap();
        assert_eq!(raw[2].as_slice(), &[1.0, 3.0, 5.0]);
    }
}
