//! Reward sources: the ground truth the bandit is evaluated against.
//!
//! A reward source sees the full [`UserRecord`], hidden preferences included.  The
//! engine never does; it only ever gets the context and the drawn 0/1 outcome.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::error::{ConfigError, Result};
use crate::UserRecord;

/// Default base conversion rate shared by every user and arm.
pub const DEFAULT_BASE_RATE: f64 = 0.05;

/// Binary outcome oracle: `(user, arm type) -> {0, 1}`.
pub trait RewardSource {
    /// Check up front that `user` can be served for every arm type in `kinds`.
    ///
    /// Called for the whole user collection before the first draw.
    fn check_user(&self, _user: &UserRecord, _kinds: &[&str]) -> std::result::Result<(), ConfigError> {
        Ok(())
    }

    /// Draw a conversion (0 or 1) for `user` shown promotion type `kind`.
    fn draw(&mut self, user: &UserRecord, kind: &str) -> Result<u8>;
}

impl<R: RewardSource + ?Sized> RewardSource for &mut R {
    fn check_user(&self, user: &UserRecord, kinds: &[&str]) -> std::result::Result<(), ConfigError> {
        (**self).check_user(user, kinds)
    }

    fn draw(&mut self, user: &UserRecord, kind: &str) -> Result<u8> {
        (**self).draw(user, kind)
    }
}

/// Bernoulli draw with `p = clamp(base_rate + preference[kind], 0, 1)`.
///
/// Seedable: every draw comes from one explicitly owned generator.
#[derive(Debug, Clone)]
pub struct PreferenceRewardSource {
    base_rate: f64,
    rng: StdRng,
}

impl PreferenceRewardSource {
    pub fn new(base_rate: f64, rng: StdRng) -> std::result::Result<Self, ConfigError> {
        if !(base_rate.is_finite() && (0.0..=1.0).contains(&base_rate)) {
            return Err(ConfigError::InvalidParameter {
                name: "base_rate",
                value: base_rate,
            });
        }
        Ok(Self { base_rate, rng })
    }

    pub fn with_seed(base_rate: f64, seed: u64) -> std::result::Result<Self, ConfigError> {
        Self::new(base_rate, StdRng::seed_from_u64(seed))
    }

    pub fn base_rate(&self) -> f64 {
        self.base_rate
    }

    /// Conversion probability for `user` under promotion type `kind`.
    pub fn conversion_probability(
        &self,
        user: &UserRecord,
        kind: &str,
    ) -> std::result::Result<f64, ConfigError> {
        let pref = user
            .preference(kind)
            .ok_or_else(|| ConfigError::MissingPreference {
                user_id: user.id,
                kind: kind.to_string(),
            })?;
        let p = self.base_rate + pref;
        if p.is_nan() {
            return Err(ConfigError::InvalidParameter {
                name: "preference",
                value: pref,
            });
        }
        Ok(p.clamp(0.0, 1.0))
    }
}

impl RewardSource for PreferenceRewardSource {
    fn check_user(&self, user: &UserRecord, kinds: &[&str]) -> std::result::Result<(), ConfigError> {
        for kind in kinds {
            self.conversion_probability(user, kind)?;
        }
        Ok(())
    }

    fn draw(&mut self, user: &UserRecord, kind: &str) -> Result<u8> {
        let p = self.conversion_probability(user, kind)?;
        let u: f64 = self.rng.random();
        Ok(u8::from(u < p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserRecord {
        UserRecord::new(1)
            .with_preference("always", 2.0)
            .with_preference("never", -1.0)
            .with_preference("half", 0.45)
    }

    #[test]
    fn probability_is_base_plus_preference_clamped() {
        let r = PreferenceRewardSource::with_seed(0.05, 0).unwrap();
        let u = user();
        assert_eq!(r.conversion_probability(&u, "always").unwrap(), 1.0);
        assert_eq!(r.conversion_probability(&u, "never").unwrap(), 0.0);
        assert!((r.conversion_probability(&u, "half").unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn degenerate_probabilities_draw_deterministically() {
        let mut r = PreferenceRewardSource::with_seed(0.05, 3).unwrap();
        let u = user();
        for _ in 0..200 {
            assert_eq!(r.draw(&u, "always").unwrap(), 1);
            assert_eq!(r.draw(&u, "never").unwrap(), 0);
        }
    }

    #[test]
    fn empirical_rate_tracks_probability() {
        let mut r = PreferenceRewardSource::with_seed(0.05, 11).unwrap();
        let u = user();
        let n = 20_000;
        let hits: u32 = (0..n).map(|_| u32::from(r.draw(&u, "half").unwrap())).sum();
        let rate = f64::from(hits) / f64::from(n);
        assert!((rate - 0.5).abs() < 0.02, "rate={rate}");
    }

    #[test]
    fn same_seed_same_draws() {
        let u = user();
        let mut a = PreferenceRewardSource::with_seed(0.05, 42).unwrap();
        let mut b = PreferenceRewardSource::with_seed(0.05, 42).unwrap();
        for _ in 0..100 {
            assert_eq!(a.draw(&u, "half").unwrap(), b.draw(&u, "half").unwrap());
        }
    }

    #[test]
    fn missing_preference_is_reported() {
        let r = PreferenceRewardSource::with_seed(0.05, 0).unwrap();
        assert_eq!(
            r.check_user(&user(), &["half", "bogo"]),
            Err(ConfigError::MissingPreference {
                user_id: 1,
                kind: "bogo".to_string()
            })
        );
        assert!(PreferenceRewardSource::with_seed(1.5, 0).is_err());
    }
}
