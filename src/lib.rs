//! `liftsim`: seedable simulation of a LinUCB promotion bandit against a static baseline.
//!
//! Each arriving user is shown one promotion ("arm") by two policies side by side:
//!
//! - the **baseline** always shows the same arm (a classic control group);
//! - the **bandit** ([`LinUcb`]) scores every arm for the user's context, shows the
//!   best one, observes the 0/1 conversion and updates that arm's model.
//!
//! The paired outcomes form a [`ResultLog`] in processing order; [`Report`] and
//! [`OutputTable`] derive overall rates, relative [`Lift`], running cumulative
//! conversions and the bandit's arm mix from it.
//!
//! **Goals:**
//! - **Deterministic by default**: selection has no randomness; outcome sampling uses
//!   one explicitly seeded generator, so a fixed seed reproduces the log bit for bit.
//! - **Blind evaluation**: hidden user preferences live behind [`RewardSource`]; the
//!   engine only sees contexts and its own outcomes.
//! - **Fail before committing**: configuration and input problems surface before the
//!   first user is processed.
//!
//! **Pieces:**
//! - [`LinUcb`] / [`LinUcbConfig`]: per-arm ridge regression with an upper-confidence
//!   bonus; [`InverseMode`] selects exact inversion or Sherman-Morrison caching.
//! - [`Simulation`] / [`SimulationConfig`]: the user-by-user driver, plus
//!   [`Simulation::run_replications`] for seed sweeps.
//! - [`ArmCatalog`], [`FeatureSchema`], [`ContextBuilder`]: run setup.
//! - [`PreferenceRewardSource`] and [`generate_users`]: a synthetic ground truth.
//! - `io` (feature `io`): CSV user tables in, result tables out.
//!
//! **Non-goals:**
//! - No significance testing; [`Lift`] is a point estimate.
//! - One algorithm family (LinUCB) and binary rewards only.
//! - No parallel execution: the bandit state after user *i* depends on users `1..i`.
//!
//! # The scoring rule
//!
//! For arm `a` with statistics `(A_a, b_a)` and context `x`:
//!
//! ```text
//!   theta_a = A_a^{-1} b_a
//!   ucb_a(x) = theta_a^T x + alpha * sqrt(x^T A_a^{-1} x)
//! ```
//!
//! The first term is the ridge point estimate of the conversion signal; the second
//! shrinks as the arm sees contexts like `x`.  With no observations every `theta` is
//! zero and every arm has the same bonus, so the first decision always goes to arm 0.
//!
//! # Example
//!
//! ```rust
//! use liftsim::{
//!     generate_users, ArmCatalog, Lift, Simulation, SimulationConfig, SyntheticConfig,
//! };
//!
//! let users = generate_users(SyntheticConfig { n_users: 200, seed: 7 }).unwrap();
//! let sim = Simulation::new(SimulationConfig::default(), ArmCatalog::promotions()).unwrap();
//! let run = sim.run_seeded(&users).unwrap();
//!
//! let report = run.report(sim.catalog());
//! assert_eq!(report.n_users, 200);
//! if let Lift::Defined(v) = report.lift {
//!     assert!(v.is_finite());
//! }
//! ```

#![forbid(unsafe_code)]

mod error;
pub use error::*;

mod linalg;

mod decision;
pub use decision::*;

mod contextual;
pub use contextual::*;

mod catalog;
pub use catalog::*;

mod user;
pub use user::*;

mod context;
pub use context::*;

mod reward;
pub use reward::*;

mod synth;
pub use synth::*;

mod report;
pub use report::*;

mod harness;
pub use harness::*;

#[cfg(feature = "io")]
pub mod io;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_default_schema_and_catalog() {
        let cfg = SimulationConfig::default();
        assert_eq!(cfg.engine_config().dim, 4);
        let sim = Simulation::new(cfg, ArmCatalog::promotions()).unwrap();
        assert_eq!(sim.baseline_arm(), 0);
        assert_eq!(sim.catalog().len(), 4);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let users = generate_users(SyntheticConfig {
            n_users: 300,
            seed: 3,
        })
        .unwrap();
        let sim = Simulation::new(SimulationConfig::default(), ArmCatalog::promotions()).unwrap();
        let a = sim.run_seeded(&users).unwrap();
        let b = sim.run_seeded(&users).unwrap();
        assert_eq!(a.log, b.log);
        assert_eq!(a.engine.snapshot(), b.engine.snapshot());
    }

    #[cfg(feature = "io")]
    #[test]
    fn partial_json_config_fills_defaults() {
        let cfg: SimulationConfig = serde_json::from_str(
            r#"{"alpha": 0.5, "inverse": "sherman_morrison", "features": ["a", "b"]}"#,
        )
        .unwrap();
        assert_eq!(cfg.alpha, 0.5);
        assert_eq!(cfg.inverse, InverseMode::ShermanMorrison);
        assert_eq!(cfg.features.dim(), 3);
        assert_eq!(cfg.baseline_arm, "arm_1");
        assert_eq!(cfg.base_rate, DEFAULT_BASE_RATE);

        let dup: Result<SimulationConfig, _> = serde_json::from_str(r#"{"features": ["a", "a"]}"#);
        assert!(dup.is_err());
    }
}
