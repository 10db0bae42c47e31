use liftsim::{ConfigError, InverseMode, LinUcb, LinUcbConfig, SimError};
use proptest::prelude::*;

fn cfg(dim: usize, alpha: f64, inverse: InverseMode) -> LinUcbConfig {
    LinUcbConfig {
        dim,
        alpha,
        lambda: 1.0,
        inverse,
    }
}

fn step_strategy() -> impl Strategy<Value = Vec<(usize, Vec<f64>, u8)>> {
    proptest::collection::vec(
        (0usize..4, proptest::collection::vec(-20.0f64..20.0, 5), 0u8..2),
        0..80,
    )
}

fn inverse_strategy() -> impl Strategy<Value = InverseMode> {
    prop_oneof![Just(InverseMode::Exact), Just(InverseMode::ShermanMorrison)]
}

proptest! {
    #[test]
    fn selection_is_a_pure_function_of_state(
        dim in 1usize..6,
        alpha in 0.0f64..3.0,
        inverse in inverse_strategy(),
        steps in step_strategy(),
        probe in proptest::collection::vec(-5.0f64..5.0, 5),
    ) {
        let mut p = LinUcb::new(cfg(dim, alpha, inverse), 4).unwrap();
        for (arm, x, r) in &steps {
            p.update(*arm, &x[..dim], f64::from(*r)).unwrap();
        }
        let before = p.snapshot();
        let d1 = p.decide(&probe[..dim]).unwrap();
        let d2 = p.decide(&probe[..dim]).unwrap();
        prop_assert_eq!(&d1, &d2);
        prop_assert_eq!(p.snapshot(), before);

        // The winner has the maximal score and nothing before it ties.
        let best = d1.scores[d1.arm].ucb;
        for (i, s) in d1.scores.iter().enumerate() {
            prop_assert!(s.ucb <= best);
            if i < d1.arm {
                prop_assert!(s.ucb < best);
            }
            prop_assert!(s.bonus >= 0.0);
        }
    }

    #[test]
    fn update_is_pure_accumulation(
        dim in 1usize..6,
        arm in 0usize..3,
        x in proptest::collection::vec(-10.0f64..10.0, 5),
        reward in 0u8..2,
    ) {
        let mut p = LinUcb::new(cfg(dim, 1.0, InverseMode::Exact), 3).unwrap();
        let x = &x[..dim];
        let s0 = p.snapshot();
        p.update(arm, x, f64::from(reward)).unwrap();
        let s1 = p.snapshot();
        p.update(arm, x, f64::from(reward)).unwrap();
        let s2 = p.snapshot();

        for i in 0..dim {
            for j in 0..dim {
                let k = i * dim + j;
                // Increments are exact up to rounding in the running sum.
                let tol = 1e-12 * (1.0 + s2.arms[arm].a[k].abs());
                let inc1 = s1.arms[arm].a[k] - s0.arms[arm].a[k];
                let inc2 = s2.arms[arm].a[k] - s1.arms[arm].a[k];
                prop_assert!((inc1 - x[i] * x[j]).abs() <= tol);
                prop_assert!((inc2 - x[i] * x[j]).abs() <= tol);
            }
            prop_assert_eq!(s1.arms[arm].b[i], f64::from(reward) * x[i]);
            prop_assert_eq!(s2.arms[arm].b[i], 2.0 * f64::from(reward) * x[i]);
        }
        prop_assert_eq!(s2.arms[arm].uses, 2);
        for other in (0..3).filter(|a| *a != arm) {
            prop_assert_eq!(&s2.arms[other], &s0.arms[other]);
        }
    }

    #[test]
    fn bonus_shrinks_monotonically_for_a_repeated_context(
        dim in 1usize..6,
        alpha in 0.1f64..3.0,
        x in proptest::collection::vec(0.1f64..10.0, 5),
        n in 2usize..30,
    ) {
        let x = &x[..dim];
        let mut p = LinUcb::new(cfg(dim, alpha, InverseMode::Exact), 1).unwrap();
        let mut prev = f64::INFINITY;
        for _ in 0..n {
            let arm = p.select_arm(x).unwrap();
            let bonus = p.scores(x).unwrap()[arm].bonus;
            prop_assert!(bonus < prev, "bonus={} prev={}", bonus, prev);
            prev = bonus;
            p.update(arm, x, 1.0).unwrap();
        }
    }

    #[test]
    fn restore_of_own_snapshot_is_identity(
        dim in 1usize..5,
        inverse in inverse_strategy(),
        steps in step_strategy(),
    ) {
        let mut p = LinUcb::new(cfg(dim, 1.0, inverse), 4).unwrap();
        for (arm, x, r) in &steps {
            p.update(*arm, &x[..dim], f64::from(*r)).unwrap();
        }
        let snap = p.snapshot();
        let mut q = LinUcb::new(cfg(dim, 1.0, inverse), 4).unwrap();
        q.restore(snap.clone()).unwrap();
        prop_assert_eq!(q.snapshot(), snap);
        // Exact mode scores straight from A, so the restored engine decides identically.
        if inverse == InverseMode::Exact {
            let probe = vec![1.0; dim];
            prop_assert_eq!(p.decide(&probe).unwrap(), q.decide(&probe).unwrap());
        }
    }
}

#[test]
fn cold_start_picks_lowest_index_for_any_context() {
    let p = LinUcb::new(cfg(4, 1.5, InverseMode::Exact), 4).unwrap();
    for ctx in [[1.0, 0.0, 0.0, 0.0], [1.0, 120.0, 35.5, 1.0], [1.0, -3.0, 2.0, 0.5]] {
        assert_eq!(p.select_arm(&ctx).unwrap(), 0);
        let scores = p.scores(&ctx).unwrap();
        assert!(scores.windows(2).all(|w| w[0] == w[1]));
    }
}

#[test]
fn theta_is_zero_at_cold_start_and_tracks_rewards() {
    let mut p = LinUcb::new(cfg(2, 1.0, InverseMode::Exact), 2).unwrap();
    assert_eq!(p.theta(0).unwrap(), vec![0.0, 0.0]);
    p.update(0, &[1.0, 1.0], 1.0).unwrap();
    // A = I + 11^T = [[2,1],[1,2]], b = [1,1] -> theta = [1/3, 1/3].
    let t = p.theta(0).unwrap();
    assert!((t[0] - 1.0 / 3.0).abs() < 1e-12);
    assert!((t[1] - 1.0 / 3.0).abs() < 1e-12);
    assert!(matches!(
        p.theta(2),
        Err(SimError::Config(ConfigError::ArmOutOfRange { index: 2, n_arms: 2 }))
    ));
}
