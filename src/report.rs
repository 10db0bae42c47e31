//! Result log and aggregation: the contract a dashboard consumes.

use std::fmt;

use crate::error::LiftError;
use crate::ArmCatalog;

/// One user's paired outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResultRecord {
    pub user_id: u64,
    /// Baseline (control) conversion, 0 or 1.
    pub baseline: u8,
    /// Bandit (treatment) conversion, 0 or 1.
    pub bandit: u8,
    /// Arm index chosen by the bandit.
    pub arm: usize,
}

/// Append-only log in processing order.  Read-only once a run returns it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultLog {
    records: Vec<ResultRecord>,
}

impl ResultLog {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            records: Vec::with_capacity(n),
        }
    }

    pub(crate) fn push(&mut self, r: ResultRecord) {
        self.records.push(r);
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Running totals `(baseline, bandit)` after each record.
    pub fn cumulative_sums(&self) -> (Vec<u64>, Vec<u64>) {
        let mut base = Vec::with_capacity(self.records.len());
        let mut band = Vec::with_capacity(self.records.len());
        let (mut cb, mut cn) = (0u64, 0u64);
        for r in &self.records {
            cb += u64::from(r.baseline);
            cn += u64::from(r.bandit);
            base.push(cb);
            band.push(cn);
        }
        (base, band)
    }

    /// Times each arm was chosen, indexed by arm.
    pub fn arm_counts(&self, n_arms: usize) -> Vec<u64> {
        let mut counts = vec![0u64; n_arms];
        for r in &self.records {
            if let Some(c) = counts.get_mut(r.arm) {
                *c += 1;
            }
        }
        counts
    }
}

/// `(bandit_mean - baseline_mean) / baseline_mean`, as a fraction (0.3 = 30%).
pub fn compute_lift(baseline_mean: f64, bandit_mean: f64) -> Result<f64, LiftError> {
    if baseline_mean == 0.0 {
        return Err(LiftError::DivisionUndefined);
    }
    Ok((bandit_mean - baseline_mean) / baseline_mean)
}

/// Relative lift, or an explicit undefined marker.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Lift {
    Defined(f64),
    Undefined,
}

impl Lift {
    pub fn from_means(baseline_mean: f64, bandit_mean: f64) -> Self {
        match compute_lift(baseline_mean, bandit_mean) {
            Ok(v) => Self::Defined(v),
            Err(LiftError::DivisionUndefined) => Self::Undefined,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Defined(v) => Some(*v),
            Self::Undefined => None,
        }
    }
}

impl fmt::Display for Lift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defined(v) => write!(f, "{:.2}%", v * 100.0),
            Self::Undefined => f.write_str("N/A"),
        }
    }
}

/// Aggregate comparison of the two policies.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Report {
    pub n_users: usize,
    pub baseline_total: u64,
    pub bandit_total: u64,
    pub baseline_rate: f64,
    pub bandit_rate: f64,
    pub lift: Lift,
    /// `(arm type, times chosen by the bandit)` in catalog order.
    pub arm_counts: Vec<(String, u64)>,
}

impl Report {
    /// Summarize `log`.  An empty log has zero rates and undefined lift.
    pub fn from_log(log: &ResultLog, catalog: &ArmCatalog) -> Self {
        let n = log.len();
        let baseline_total: u64 = log.records().iter().map(|r| u64::from(r.baseline)).sum();
        let bandit_total: u64 = log.records().iter().map(|r| u64::from(r.bandit)).sum();
        let (baseline_rate, bandit_rate) = if n == 0 {
            (0.0, 0.0)
        } else {
            (
                baseline_total as f64 / n as f64,
                bandit_total as f64 / n as f64,
            )
        };
        let lift = Lift::from_means(baseline_rate, bandit_rate);
        if lift == Lift::Undefined {
            tracing::warn!(n_users = n, "baseline converted nobody; lift is undefined");
        }
        let arm_counts = catalog
            .arms()
            .iter()
            .zip(log.arm_counts(catalog.len()))
            .map(|(a, c)| (a.kind.clone(), c))
            .collect();
        Self {
            n_users: n,
            baseline_total,
            bandit_total,
            baseline_rate,
            bandit_rate,
            lift,
            arm_counts,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Users processed:       {}", self.n_users)?;
        writeln!(f, "Control conversion:    {:.4}", self.baseline_rate)?;
        writeln!(f, "Bandit conversion:     {:.4}", self.bandit_rate)?;
        writeln!(f, "Lift:                  {}", self.lift)?;
        write!(f, "Bandit arm choices:")?;
        for (kind, c) in &self.arm_counts {
            write!(f, "\n  {kind:<18} {c}")?;
        }
        Ok(())
    }
}

/// One output row; field names are the persisted column names.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutputRow {
    pub user_id: u64,
    pub control_reward: u8,
    pub bandit_reward: u8,
    pub bandit_arm: String,
    pub cumulative_control_reward: u64,
    pub cumulative_bandit_reward: u64,
}

/// Per-user output table with running totals.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutputTable {
    pub rows: Vec<OutputRow>,
}

impl OutputTable {
    pub fn from_log(log: &ResultLog, catalog: &ArmCatalog) -> Self {
        let (cum_base, cum_band) = log.cumulative_sums();
        let rows = log
            .records()
            .iter()
            .zip(cum_base)
            .zip(cum_band)
            .map(|((r, cb), cn)| OutputRow {
                user_id: r.user_id,
                control_reward: r.baseline,
                bandit_reward: r.bandit,
                bandit_arm: catalog
                    .get(r.arm)
                    .map(|a| a.kind.clone())
                    .unwrap_or_default(),
                cumulative_control_reward: cb,
                cumulative_bandit_reward: cn,
            })
            .collect();
        Self { rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn log_of(pairs: &[(u8, u8, usize)]) -> ResultLog {
        let mut log = ResultLog::default();
        for (i, &(baseline, bandit, arm)) in pairs.iter().enumerate() {
            log.push(ResultRecord {
                user_id: i as u64,
                baseline,
                bandit,
                arm,
            });
        }
        log
    }

    #[test]
    fn lift_example() {
        let l = compute_lift(0.05, 0.065).unwrap();
        assert!((l - 0.30).abs() < 1e-9);
        assert_eq!(Lift::Defined(l).to_string(), "30.00%");
    }

    #[test]
    fn zero_baseline_lift_is_undefined_not_nan() {
        assert_eq!(compute_lift(0.0, 0.2), Err(LiftError::DivisionUndefined));
        let lift = Lift::from_means(0.0, 0.2);
        assert_eq!(lift, Lift::Undefined);
        assert_eq!(lift.value(), None);
        assert_eq!(lift.to_string(), "N/A");
    }

    #[test]
    fn report_and_table_agree() {
        let catalog = ArmCatalog::promotions();
        let log = log_of(&[(1, 0, 3), (0, 1, 1), (1, 1, 3), (0, 0, 0)]);
        let rep = Report::from_log(&log, &catalog);
        assert_eq!(rep.n_users, 4);
        assert_eq!(rep.baseline_total, 2);
        assert_eq!(rep.bandit_total, 2);
        assert_eq!(rep.lift, Lift::Defined(0.0));
        assert_eq!(
            rep.arm_counts,
            vec![
                ("10%_off".to_string(), 1),
                ("25%_off".to_string(), 1),
                ("free_shipping".to_string(), 0),
                ("buy_one_get_one".to_string(), 2),
            ]
        );

        let t = OutputTable::from_log(&log, &catalog);
        assert_eq!(t.rows.len(), 4);
        assert_eq!(t.rows[0].bandit_arm, "buy_one_get_one");
        assert_eq!(t.rows[3].cumulative_control_reward, 2);
        assert_eq!(t.rows[3].cumulative_bandit_reward, 2);
        assert_eq!(t.rows[1].cumulative_bandit_reward, 1);
    }

    #[test]
    fn empty_log_reports_undefined_lift() {
        let rep = Report::from_log(&ResultLog::default(), &ArmCatalog::promotions());
        assert_eq!(rep.n_users, 0);
        assert_eq!(rep.lift, Lift::Undefined);
        assert!(rep.to_string().contains("N/A"));
    }

    proptest! {
        #[test]
        fn cumulative_sums_are_prefix_sums(
            pairs in proptest::collection::vec((0u8..2, 0u8..2, 0usize..4), 0..200),
        ) {
            let log = log_of(&pairs);
            let (cb, cn) = log.cumulative_sums();
            prop_assert_eq!(cb.len(), pairs.len());
            for i in 0..pairs.len() {
                let eb: u64 = pairs[..=i].iter().map(|p| u64::from(p.0)).sum();
                let en: u64 = pairs[..=i].iter().map(|p| u64::from(p.1)).sum();
                prop_assert_eq!(cb[i], eb);
                prop_assert_eq!(cn[i], en);
            }
            let counts = log.arm_counts(4);
            prop_assert_eq!(counts.iter().sum::<u64>(), pairs.len() as u64);
        }
    }
}
