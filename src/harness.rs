//! Simulation driver: baseline vs bandit over one ordered user stream.
//!
//! ## Protocol (per user, in input order)
//!
//! 1. Draw the baseline outcome for the fixed baseline arm type.
//! 2. Build the context (features + intercept).
//! 3. Bandit selects an arm.
//! 4. Draw the bandit outcome for the chosen arm type.
//! 5. Update the bandit with its own outcome only.  The baseline outcome is never
//!    fed back: each policy is an independent observation of the same user.
//! 6. Append the paired record.
//!
//! The bandit's state after user *i* depends on users `1..i` in order, so the loop is
//! strictly sequential.  All validation (config, every user's features and
//! preferences, id uniqueness) happens before step 1 of the first user.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::error::{ConfigError, Result};
use crate::{
    ArmCatalog, ContextBuilder, FeatureScaling, FeatureSchema, InverseMode, LinUcb, LinUcbConfig,
    OutputTable, PreferenceRewardSource, Report, ResultLog, ResultRecord, RewardSource,
    UserRecord, DEFAULT_BASE_RATE,
};

/// Run-level settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimulationConfig {
    /// LinUCB exploration strength.
    pub alpha: f64,
    /// Ridge prior on every arm (`A = lambda * I` at start).
    pub lambda: f64,
    pub inverse: InverseMode,
    /// Catalog key of the arm the baseline always shows.
    pub baseline_arm: String,
    pub features: FeatureSchema,
    pub scaling: FeatureScaling,
    /// Base conversion rate for the preference reward source.
    pub base_rate: f64,
    /// Seed for outcome sampling.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            alpha: 1.5,
            lambda: 1.0,
            inverse: InverseMode::Exact,
            baseline_arm: "arm_1".to_string(),
            features: FeatureSchema::default(),
            scaling: FeatureScaling::None,
            base_rate: DEFAULT_BASE_RATE,
            seed: 0,
        }
    }
}

impl SimulationConfig {
    /// Load from a JSON file; missing fields take their defaults.
    #[cfg(feature = "io")]
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn engine_config(&self) -> LinUcbConfig {
        LinUcbConfig {
            dim: self.features.dim(),
            alpha: self.alpha,
            lambda: self.lambda,
            inverse: self.inverse,
        }
    }
}

/// Finished run: the frozen log plus the engine in its final state.
#[derive(Debug, Clone)]
pub struct SimulationRun {
    pub log: ResultLog,
    pub engine: LinUcb,
}

impl SimulationRun {
    pub fn report(&self, catalog: &ArmCatalog) -> Report {
        Report::from_log(&self.log, catalog)
    }

    pub fn table(&self, catalog: &ArmCatalog) -> OutputTable {
        OutputTable::from_log(&self.log, catalog)
    }
}

/// A validated simulation setup.  Each `run` owns a fresh engine.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimulationConfig,
    catalog: ArmCatalog,
    baseline: usize,
}

impl Simulation {
    pub fn new(config: SimulationConfig, catalog: ArmCatalog) -> std::result::Result<Self, ConfigError> {
        let baseline = catalog
            .index_of(&config.baseline_arm)
            .ok_or_else(|| ConfigError::UnknownBaselineArm(config.baseline_arm.clone()))?;
        config.engine_config().validate()?;
        if !(config.base_rate.is_finite() && (0.0..=1.0).contains(&config.base_rate)) {
            return Err(ConfigError::InvalidParameter {
                name: "base_rate",
                value: config.base_rate,
            });
        }
        Ok(Self {
            config,
            catalog,
            baseline,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ArmCatalog {
        &self.catalog
    }

    /// Index of the baseline arm in the catalog.
    pub fn baseline_arm(&self) -> usize {
        self.baseline
    }

    /// Run with the preference reward source seeded from `config.seed`.
    pub fn run_seeded(&self, users: &[UserRecord]) -> Result<SimulationRun> {
        self.run_with_seed(users, self.config.seed)
    }

    fn run_with_seed(&self, users: &[UserRecord], seed: u64) -> Result<SimulationRun> {
        let source = PreferenceRewardSource::with_seed(self.config.base_rate, seed)?;
        self.run(users, source)
    }

    /// Drive `users` through both policies in order.
    ///
    /// Any configuration error aborts before the first draw; a numerical error aborts
    /// the run where it occurs.
    pub fn run<R: RewardSource>(&self, users: &[UserRecord], mut reward: R) -> Result<SimulationRun> {
        let kinds = self.catalog.kinds();

        let mut seen = BTreeSet::new();
        for u in users {
            if !seen.insert(u.id) {
                return Err(ConfigError::DuplicateUser(u.id).into());
            }
            reward.check_user(u, &kinds)?;
        }
        let mut builder = ContextBuilder::new(self.config.features.clone());
        let contexts = builder.build_all(users, self.config.scaling)?;
        let mut engine = LinUcb::new(self.config.engine_config(), self.catalog.len())?;

        let baseline_kind = kinds[self.baseline];
        info!(
            users = users.len(),
            arms = self.catalog.len(),
            dim = engine.dim(),
            alpha = self.config.alpha,
            baseline = baseline_kind,
            "simulation started"
        );

        let mut log = ResultLog::with_capacity(users.len());
        for (user, ctx) in users.iter().zip(contexts.iter()) {
            let baseline = reward.draw(user, baseline_kind)?;

            let decision = engine.decide(ctx.as_slice())?;
            let arm = decision.arm;
            let bandit = reward.draw(user, kinds[arm])?;
            engine.update(arm, ctx.as_slice(), f64::from(bandit))?;

            debug!(
                user_id = user.id,
                arm,
                kind = kinds[arm],
                baseline,
                bandit,
                note = ?decision.note,
                "user processed"
            );
            log.push(ResultRecord {
                user_id: user.id,
                baseline,
                bandit,
                arm,
            });
        }

        info!(users = log.len(), "simulation finished");
        Ok(SimulationRun { log, engine })
    }

    /// `n` independent runs with reward seeds `base_seed, base_seed + 1, ...`.
    ///
    /// Every replication gets its own engine and generator; nothing is shared.
    pub fn run_replications(
        &self,
        users: &[UserRecord],
        n: usize,
        base_seed: u64,
    ) -> Result<Vec<Report>> {
        if n == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "replications",
                value: 0.0,
            }
            .into());
        }
        let mut reports = Vec::with_capacity(n);
        for i in 0..n as u64 {
            let seed = base_seed.wrapping_add(i);
            let run = self.run_with_seed(users, seed)?;
            let rep = run.report(&self.catalog);
            info!(replication = i, seed, lift = %rep.lift, "replication finished");
            reports.push(rep);
        }
        Ok(reports)
    }
}
