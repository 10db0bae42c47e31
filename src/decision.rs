//! Audit-friendly record of a single bandit decision.
//!
//! `LinUcb::select_arm` returns only an index; `LinUcb::decide` returns a [`Decision`]
//! with the per-arm score breakdown and a typed note explaining how the winner was
//! picked, so a caller can log or replay the choice without recomputing it.

/// Per-arm score decomposition for one context.
///
/// `ucb = mean + bonus`, where `mean` is the ridge point estimate (exploitation)
/// and `bonus` is `alpha * sqrt(x^T A^{-1} x)` (exploration).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArmScore {
    pub ucb: f64,
    pub mean: f64,
    pub bonus: f64,
}

/// How the chosen arm was picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecisionNote {
    /// A single arm had the strictly highest UCB score.
    Argmax,
    /// `tied` arms shared the highest score; the lowest index won.
    ///
    /// At cold start every arm ties, so the first decision is always of this kind.
    TieBrokenByIndex { tied: usize },
}

/// Output of `LinUcb::decide`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Decision {
    /// Chosen arm index.
    pub arm: usize,
    /// Scores for every arm, in arm order.
    pub scores: Vec<ArmScore>,
    pub note: DecisionNote,
}

impl Decision {
    /// Score of the chosen arm.
    pub fn chosen_score(&self) -> Option<ArmScore> {
        self.scores.get(self.arm).copied()
    }
}

/// First index holding the maximum `ucb`, plus the number of arms tied at that maximum.
///
/// Comparison is exact: a later arm only wins with a strictly larger score.
pub(crate) fn argmax_first(scores: &[ArmScore]) -> Option<(usize, usize)> {
    let first = scores.first()?;
    let mut best = 0usize;
    let mut best_ucb = first.ucb;
    for (i, s) in scores.iter().enumerate().skip(1) {
        if s.ucb > best_ucb {
            best = i;
            best_ucb = s.ucb;
        }
    }
    let tied = scores.iter().filter(|s| s.ucb == best_ucb).count();
    Some((best, tied))
}
