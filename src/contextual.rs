//! Linear contextual bandit (LinUCB) over a fixed, indexed set of arms.
//!
//! Each arm keeps ridge-regression sufficient statistics:
//!
//! ```text
//!   A = lambda * I + sum x x^T        (d x d, symmetric positive-definite)
//!   b = sum r x                       (d)
//!   theta = A^{-1} b
//!   ucb(x) = theta^T x + alpha * sqrt(x^T A^{-1} x)
//! ```
//!
//! `(A, b)` alone reconstruct the exact ridge solution at any point, so no history
//! is stored and nothing is ever re-fitted.  `A` only grows by rank-one outer
//! products of observed contexts, which keeps it symmetric positive-definite for
//! every reachable state.
//!
//! ## Design
//!
//! - Arms are a closed, small set known at construction: state is a `Vec` indexed by arm id.
//! - Selection is pure (`&self`) and deterministic: argmax with lowest-index tie-break.
//! - Rewards are scalars; the simulator feeds binary conversions.
//! - [`InverseMode`] picks between exact inversion per selection and an incremental
//!   Sherman-Morrison cache.  `A` stays the authoritative statistic in both modes.

use std::borrow::Cow;

use crate::decision::argmax_first;
use crate::error::{ConfigError, NumericalError, Result};
use crate::linalg::{
    add_outer, dot, invert, is_positive_definite, is_symmetric, mat_vec, quad_form,
    scaled_identity,
};
use crate::{ArmScore, Decision, DecisionNote};

/// How `A^{-1}` is obtained at selection time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum InverseMode {
    /// Gauss-Jordan inversion of `A` for every arm on every selection (O(d^3) per arm).
    #[default]
    Exact,
    /// Cached `A^{-1}`, refreshed by a rank-one Sherman-Morrison step on each update
    /// (O(d^2) per arm per selection).
    ShermanMorrison,
}

/// Configuration for [`LinUcb`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinUcbConfig {
    /// Context length, intercept included (must be >= 1).
    pub dim: usize,
    /// Exploration strength (finite, >= 0).
    pub alpha: f64,
    /// Ridge prior: `A` starts as `lambda * I` (finite, > 0).  `1.0` is the identity start.
    pub lambda: f64,
    pub inverse: InverseMode,
}

impl Default for LinUcbConfig {
    fn default() -> Self {
        Self {
            dim: 4,
            alpha: 1.0,
            lambda: 1.0,
            inverse: InverseMode::Exact,
        }
    }
}

impl LinUcbConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.dim == 0 {
            return Err(ConfigError::ZeroDimension);
        }
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "alpha",
                value: self.alpha,
            });
        }
        if !(self.lambda.is_finite() && self.lambda > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "lambda",
                value: self.lambda,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct ArmState {
    // A (d x d, row-major).
    a: Vec<f64>,
    // b (d).
    b: Vec<f64>,
    // Cached A^{-1}; only maintained under `InverseMode::ShermanMorrison`.
    a_inv: Option<Vec<f64>>,
    uses: u64,
}

impl ArmState {
    fn new(dim: usize, lambda: f64, mode: InverseMode) -> Self {
        let a_inv = match mode {
            InverseMode::Exact => None,
            InverseMode::ShermanMorrison => Some(scaled_identity(dim, 1.0 / lambda)),
        };
        Self {
            a: scaled_identity(dim, lambda),
            b: vec![0.0; dim],
            a_inv,
            uses: 0,
        }
    }
}

/// Read-only view of one arm's sufficient statistics.
#[derive(Debug, Clone, Copy)]
pub struct ArmStateView<'a> {
    /// `A`, row-major `d x d`.
    pub a: &'a [f64],
    pub b: &'a [f64],
    /// Number of updates applied to this arm.
    pub uses: u64,
}

/// Seedless, deterministic LinUCB engine.
///
/// Usage:
/// - `select_arm(context)` (or `decide(context)` for the score breakdown)
/// - `update(arm, context, reward)` with the reward observed for that same arm
#[derive(Debug, Clone)]
pub struct LinUcb {
    cfg: LinUcbConfig,
    arms: Vec<ArmState>,
}

impl LinUcb {
    /// Create an engine with `n_arms` fresh arms (`A = lambda*I`, `b = 0`).
    pub fn new(cfg: LinUcbConfig, n_arms: usize) -> std::result::Result<Self, ConfigError> {
        cfg.validate()?;
        if n_arms == 0 {
            return Err(ConfigError::NoArms);
        }
        let arms = (0..n_arms)
            .map(|_| ArmState::new(cfg.dim, cfg.lambda, cfg.inverse))
            .collect();
        Ok(Self { cfg, arms })
    }

    pub fn config(&self) -> &LinUcbConfig {
        &self.cfg
    }

    pub fn n_arms(&self) -> usize {
        self.arms.len()
    }

    pub fn dim(&self) -> usize {
        self.cfg.dim
    }

    pub fn arm_state(&self, arm: usize) -> Option<ArmStateView<'_>> {
        self.arms.get(arm).map(|st| ArmStateView {
            a: &st.a,
            b: &st.b,
            uses: st.uses,
        })
    }

    fn check_context(&self, x: &[f64]) -> std::result::Result<(), ConfigError> {
        if x.len() != self.cfg.dim {
            return Err(ConfigError::ContextLength {
                expected: self.cfg.dim,
                got: x.len(),
            });
        }
        if let Some(index) = x.iter().position(|v| !v.is_finite()) {
            return Err(ConfigError::NonFiniteContext { index });
        }
        Ok(())
    }

    fn check_arm(&self, arm: usize) -> std::result::Result<(), ConfigError> {
        if arm >= self.arms.len() {
            return Err(ConfigError::ArmOutOfRange {
                index: arm,
                n_arms: self.arms.len(),
            });
        }
        Ok(())
    }

    fn inverse(&self, arm: usize) -> std::result::Result<Cow<'_, [f64]>, NumericalError> {
        let st = &self.arms[arm];
        match &st.a_inv {
            Some(cached) => Ok(Cow::Borrowed(cached.as_slice())),
            None => invert(&st.a, self.cfg.dim)
                .map(Cow::Owned)
                .ok_or(NumericalError::Singular { arm }),
        }
    }

    fn score_arm(&self, arm: usize, x: &[f64]) -> std::result::Result<ArmScore, NumericalError> {
        let d = self.cfg.dim;
        let a_inv = self.inverse(arm)?;
        let theta = mat_vec(&a_inv, d, &self.arms[arm].b);
        let mean = dot(&theta, x);
        // Rounding can push a tiny variance below zero.
        let var = quad_form(&a_inv, d, x).max(0.0);
        let bonus = self.cfg.alpha * var.sqrt();
        let ucb = mean + bonus;
        if !ucb.is_finite() {
            return Err(NumericalError::NonFiniteScore { arm });
        }
        Ok(ArmScore { ucb, mean, bonus })
    }

    /// Per-arm `(ucb, mean, bonus)` for `context`, in arm order.
    pub fn scores(&self, context: &[f64]) -> Result<Vec<ArmScore>> {
        self.check_context(context)?;
        let mut out = Vec::with_capacity(self.arms.len());
        for arm in 0..self.arms.len() {
            out.push(self.score_arm(arm, context)?);
        }
        Ok(out)
    }

    /// Select the arm with the highest UCB score; ties go to the lowest index.
    pub fn select_arm(&self, context: &[f64]) -> Result<usize> {
        Ok(self.decide(context)?.arm)
    }

    /// Like [`select_arm`](Self::select_arm), returning the full [`Decision`].
    pub fn decide(&self, context: &[f64]) -> Result<Decision> {
        let scores = self.scores(context)?;
        let Some((arm, tied)) = argmax_first(&scores) else {
            return Err(ConfigError::NoArms.into());
        };
        let note = if tied > 1 {
            DecisionNote::TieBrokenByIndex { tied }
        } else {
            DecisionNote::Argmax
        };
        Ok(Decision { arm, scores, note })
    }

    /// Ridge estimate `theta = A^{-1} b` for `arm`.
    pub fn theta(&self, arm: usize) -> Result<Vec<f64>> {
        self.check_arm(arm)?;
        let a_inv = self.inverse(arm)?;
        Ok(mat_vec(&a_inv, self.cfg.dim, &self.arms[arm].b))
    }

    /// Fold one observation into `arm`: `A += x x^T`, `b += reward * x`.
    ///
    /// Inputs are validated before anything is mutated.
    pub fn update(&mut self, arm: usize, context: &[f64], reward: f64) -> Result<()> {
        self.check_arm(arm)?;
        self.check_context(context)?;
        if !reward.is_finite() {
            return Err(ConfigError::NonFiniteReward(reward).into());
        }
        let d = self.cfg.dim;
        let st = &mut self.arms[arm];

        // Sherman-Morrison for A := A + x x^T:
        // A^{-1} <- A^{-1} - (A^{-1} x)(A^{-1} x)^T / (1 + x^T A^{-1} x)
        if let Some(a_inv) = st.a_inv.as_mut() {
            let ax = mat_vec(a_inv, d, context);
            let denom = 1.0 + dot(context, &ax);
            if !(denom.is_finite() && denom > 0.0) {
                return Err(NumericalError::Singular { arm }.into());
            }
            for i in 0..d {
                for j in 0..d {
                    a_inv[i * d + j] -= (ax[i] * ax[j]) / denom;
                }
            }
        }

        add_outer(&mut st.a, d, context);
        for (bi, xi) in st.b.iter_mut().zip(context.iter()) {
            *bi += reward * xi;
        }
        st.uses = st.uses.saturating_add(1);
        Ok(())
    }

    /// Capture per-arm sufficient statistics for persistence or comparison.
    pub fn snapshot(&self) -> LinUcbState {
        LinUcbState {
            dim: self.cfg.dim,
            arms: self
                .arms
                .iter()
                .map(|st| LinUcbArmState {
                    a: st.a.clone(),
                    b: st.b.clone(),
                    uses: st.uses,
                })
                .collect(),
        }
    }

    /// Replace all arm state with a snapshot.
    ///
    /// The snapshot must match this engine's dimension and arm count, be finite, and
    /// carry symmetric positive-definite `A` matrices.  Nothing is applied unless
    /// every arm passes.
    pub fn restore(&mut self, state: LinUcbState) -> Result<()> {
        let d = self.cfg.dim;
        if state.dim != d {
            return Err(ConfigError::Snapshot(format!(
                "dimension {} does not match engine dimension {d}",
                state.dim
            ))
            .into());
        }
        if state.arms.len() != self.arms.len() {
            return Err(ConfigError::Snapshot(format!(
                "{} arms in snapshot, engine has {}",
                state.arms.len(),
                self.arms.len()
            ))
            .into());
        }

        let mut fresh = Vec::with_capacity(state.arms.len());
        for (i, arm) in state.arms.into_iter().enumerate() {
            if arm.a.len() != d * d || arm.b.len() != d {
                return Err(ConfigError::Snapshot(format!("arm {i} has wrong shape")).into());
            }
            if !arm.a.iter().chain(arm.b.iter()).all(|v| v.is_finite()) {
                return Err(ConfigError::Snapshot(format!("arm {i} is not finite")).into());
            }
            if !is_symmetric(&arm.a, d, 1e-9) || !is_positive_definite(&arm.a, d) {
                return Err(ConfigError::Snapshot(format!(
                    "arm {i} is not symmetric positive-definite"
                ))
                .into());
            }
            let a_inv = match self.cfg.inverse {
                InverseMode::Exact => None,
                InverseMode::ShermanMorrison => {
                    Some(invert(&arm.a, d).ok_or(NumericalError::Singular { arm: i })?)
                }
            };
            fresh.push(ArmState {
                a: arm.a,
                b: arm.b,
                a_inv,
                uses: arm.uses,
            });
        }
        self.arms = fresh;
        Ok(())
    }
}

/// Serializable per-arm sufficient statistics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinUcbArmState {
    /// Design matrix `A` (d x d, row-major).
    pub a: Vec<f64>,
    /// Reward-weighted context sum `b` (d).
    pub b: Vec<f64>,
    pub uses: u64,
}

/// Serializable engine snapshot, arms in index order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinUcbState {
    pub dim: usize,
    pub arms: Vec<LinUcbArmState>,
}
