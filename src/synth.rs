//! Synthetic user population with hidden promotion preferences.
//!
//! Ground truth baked into the generator:
//! - frequent buyers like buy-one-get-one 1.5x more;
//! - high-value shoppers (`avg_purchase_value > 150`) like free shipping 2x more.
//!
//! Deterministic for a given seed.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rand_distr::{Bernoulli, Distribution, Normal};

use crate::error::ConfigError;
use crate::UserRecord;

/// Preference prior per promotion type: `(kind, mean, std)`.
const PREFERENCE_PRIORS: [(&str, f64, f64); 4] = [
    ("10%_off", 0.1, 0.05),
    ("25%_off", 0.2, 0.1),
    ("free_shipping", 0.05, 0.02),
    ("buy_one_get_one", 0.3, 0.15),
];

const FREQUENT_BUYER_P: f64 = 0.3;
const HIGH_VALUE_THRESHOLD: f64 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SyntheticConfig {
    pub n_users: usize,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            n_users: 1000,
            seed: 0,
        }
    }
}

/// Generate `cfg.n_users` users with ids `0..n_users`.
pub fn generate_users(cfg: SyntheticConfig) -> Result<Vec<UserRecord>, ConfigError> {
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let frequent = Bernoulli::new(FREQUENT_BUYER_P).map_err(|_| ConfigError::InvalidParameter {
        name: "frequent buyer probability",
        value: FREQUENT_BUYER_P,
    })?;
    let priors = PREFERENCE_PRIORS
        .iter()
        .map(|&(kind, mean, std)| {
            Normal::new(mean, std)
                .map(|n| (kind, n))
                .map_err(|_| ConfigError::InvalidParameter {
                    name: "preference std",
                    value: std,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut users = Vec::with_capacity(cfg.n_users);
    for id in 0..cfg.n_users as u64 {
        let days = f64::from(rng.random_range(1u32..180));
        let value = rng.random_range(20.0..300.0);
        let is_frequent = frequent.sample(&mut rng);

        let mut u = UserRecord::new(id)
            .with_feature("days_since_last_purchase", days)
            .with_feature("avg_purchase_value", value)
            .with_feature("is_frequent_buyer", f64::from(u8::from(is_frequent)));

        for (kind, dist) in &priors {
            let mut pref = dist.sample(&mut rng);
            if *kind == "buy_one_get_one" && is_frequent {
                pref *= 1.5;
            }
            if *kind == "free_shipping" && value > HIGH_VALUE_THRESHOLD {
                pref *= 2.0;
            }
            u.set_preference(*kind, pref);
        }
        users.push(u);
    }
    Ok(users)
}
