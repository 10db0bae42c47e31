//! Error taxonomy.
//!
//! - [`ConfigError`]: malformed inputs or settings. Always raised before the first
//!   user is simulated, so a bad run never commits partial state.
//! - [`NumericalError`]: a broken modeling invariant (singular design matrix).
//!   Fatal for the run.
//! - [`LiftError`]: reportable, non-fatal. Surfaces as [`Lift::Undefined`](crate::Lift).

use thiserror::Error;

/// Configuration and input-shape errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("arm catalog is empty")]
    EmptyCatalog,
    #[error("duplicate arm key in catalog: {0}")]
    DuplicateArmKey(String),
    #[error("duplicate arm type in catalog: {0}")]
    DuplicateArmKind(String),
    #[error("unknown baseline arm: {0}")]
    UnknownBaselineArm(String),
    #[error("duplicate feature name: {0}")]
    DuplicateFeature(String),
    #[error("invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("engine needs at least one arm")]
    NoArms,
    #[error("context dimension must be >= 1")]
    ZeroDimension,
    #[error("context length {got} does not match model dimension {expected}")]
    ContextLength { expected: usize, got: usize },
    #[error("context entry {index} is not finite")]
    NonFiniteContext { index: usize },
    #[error("arm index {index} out of range for {n_arms} arms")]
    ArmOutOfRange { index: usize, n_arms: usize },
    #[error("reward must be finite, got {0}")]
    NonFiniteReward(f64),
    #[error("user {user_id}: missing feature `{feature}`")]
    MissingFeature { user_id: u64, feature: String },
    #[error("user {user_id}: feature `{feature}` is not finite")]
    NonFiniteFeature { user_id: u64, feature: String },
    #[error("user {user_id}: missing preference for arm type `{kind}`")]
    MissingPreference { user_id: u64, kind: String },
    #[error("duplicate user id: {0}")]
    DuplicateUser(u64),
    #[error("missing column `{0}`")]
    MissingColumn(String),
    #[error("row {row}: cannot parse `{value}` in column `{column}`")]
    MalformedValue {
        row: usize,
        column: String,
        value: String,
    },
    #[error("snapshot rejected: {0}")]
    Snapshot(String),
}

/// Numerical invariant violations inside the bandit engine.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericalError {
    #[error("design matrix for arm {arm} is singular")]
    Singular { arm: usize },
    #[error("score for arm {arm} is not finite")]
    NonFiniteScore { arm: usize },
}

/// Lift cannot be computed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiftError {
    #[error("lift is undefined: baseline mean is zero")]
    DivisionUndefined,
}

/// Top-level error for simulation runs.
#[derive(Error, Debug)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Numerical(#[from] NumericalError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "io")]
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[cfg(feature = "io")]
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Crate-wide result alias.
pub type Result<T, E = SimError> = std::result::Result<T, E>;
