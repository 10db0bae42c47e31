//! Small dense linear algebra on row-major `Vec<f64>` matrices.
//!
//! Dimensions here are tiny (features + intercept), so plain loops are fine.

/// Pivots smaller than this (in magnitude) are treated as singular.
pub(crate) const PIVOT_EPS: f64 = 1e-12;

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    let mut s = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        s += x * y;
    }
    s
}

pub(crate) fn mat_vec(a: &[f64], dim: usize, x: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; dim];
    for (i, o) in out.iter_mut().enumerate() {
        let row = &a[i * dim..(i + 1) * dim];
        *o = dot(row, x);
    }
    out
}

/// `diag * I` of size `dim`.
pub(crate) fn scaled_identity(dim: usize, diag: f64) -> Vec<f64> {
    let mut m = vec![0.0; dim * dim];
    for i in 0..dim {
        m[i * dim + i] = diag;
    }
    m
}

/// `a += x x^T`.
pub(crate) fn add_outer(a: &mut [f64], dim: usize, x: &[f64]) {
    for i in 0..dim {
        for j in 0..dim {
            a[i * dim + j] += x[i] * x[j];
        }
    }
}

/// `x^T a x`.
pub(crate) fn quad_form(a: &[f64], dim: usize, x: &[f64]) -> f64 {
    dot(x, &mat_vec(a, dim, x))
}

fn swap_rows(m: &mut [f64], dim: usize, i: usize, j: usize) {
    for k in 0..dim {
        m.swap(i * dim + k, j * dim + k);
    }
}

/// Gauss-Jordan inverse with partial pivoting.
///
/// Returns `None` when a pivot falls below [`PIVOT_EPS`] or is not finite.
pub(crate) fn invert(a: &[f64], dim: usize) -> Option<Vec<f64>> {
    let mut m = a.to_vec();
    let mut inv = scaled_identity(dim, 1.0);

    for col in 0..dim {
        let mut pivot_row = col;
        let mut pivot_abs = m[col * dim + col].abs();
        for r in (col + 1)..dim {
            let v = m[r * dim + col].abs();
            if v > pivot_abs {
                pivot_abs = v;
                pivot_row = r;
            }
        }
        if !pivot_abs.is_finite() || pivot_abs < PIVOT_EPS {
            return None;
        }
        if pivot_row != col {
            swap_rows(&mut m, dim, col, pivot_row);
            swap_rows(&mut inv, dim, col, pivot_row);
        }

        let p = m[col * dim + col];
        for j in 0..dim {
            m[col * dim + j] /= p;
            inv[col * dim + j] /= p;
        }

        for r in 0..dim {
            if r == col {
                continue;
            }
            let f = m[r * dim + col];
            if f == 0.0 {
                continue;
            }
            for j in 0..dim {
                let mv = f * m[col * dim + j];
                let iv = f * inv[col * dim + j];
                m[r * dim + j] -= mv;
                inv[r * dim + j] -= iv;
            }
        }
    }
    Some(inv)
}

pub(crate) fn is_symmetric(a: &[f64], dim: usize, tol: f64) -> bool {
    for i in 0..dim {
        for j in (i + 1)..dim {
            let (aij, aji) = (a[i * dim + j], a[j * dim + i]);
            let scale = 1.0_f64.max(aij.abs()).max(aji.abs());
            if (aij - aji).abs() > tol * scale {
                return false;
            }
        }
    }
    true
}

/// Cholesky test: true iff `a` (assumed symmetric) is positive-definite.
pub(crate) fn is_positive_definite(a: &[f64], dim: usize) -> bool {
    let mut l = vec![0.0; dim * dim];
    for i in 0..dim {
        for j in 0..=i {
            let mut s = a[i * dim + j];
            for k in 0..j {
                s -= l[i * dim + k] * l[j * dim + k];
            }
            if i == j {
                if !s.is_finite() || s <= 0.0 {
                    return false;
                }
                l[i * dim + i] = s.sqrt();
            } else {
                l[i * dim + j] = s / l[j * dim + j];
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mat_mul(a: &[f64], b: &[f64], dim: usize) -> Vec<f64> {
        let mut out = vec![0.0; dim * dim];
        for i in 0..dim {
            for j in 0..dim {
                for k in 0..dim {
                    out[i * dim + j] += a[i * dim + k] * b[k * dim + j];
                }
            }
        }
        out
    }

    #[test]
    fn inverse_of_identity_is_identity() {
        let id = scaled_identity(3, 1.0);
        assert_eq!(invert(&id, 3).unwrap(), id);
    }

    #[test]
    fn inverse_times_matrix_is_identity() {
        let mut a = scaled_identity(3, 1.0);
        add_outer(&mut a, 3, &[1.0, 2.0, -0.5]);
        add_outer(&mut a, 3, &[0.3, -1.0, 4.0]);
        let inv = invert(&a, 3).unwrap();
        let prod = mat_mul(&a, &inv, 3);
        let id = scaled_identity(3, 1.0);
        for (p, e) in prod.iter().zip(id.iter()) {
            assert!((p - e).abs() < 1e-10, "{prod:?}");
        }
    }

    #[test]
    fn pivoting_handles_zero_leading_entry() {
        // [[0, 1], [1, 0]] is its own inverse.
        let a = vec![0.0, 1.0, 1.0, 0.0];
        assert_eq!(invert(&a, 2).unwrap(), a);
    }

    #[test]
    fn singular_matrix_has_no_inverse() {
        let a = vec![1.0, 2.0, 2.0, 4.0];
        assert!(invert(&a, 2).is_none());
        assert!(invert(&[0.0; 4], 2).is_none());
    }

    #[test]
    fn cholesky_detects_definiteness() {
        let mut a = scaled_identity(2, 1.0);
        add_outer(&mut a, 2, &[3.0, 1.0]);
        assert!(is_symmetric(&a, 2, 1e-12));
        assert!(is_positive_definite(&a, 2));

        let indefinite = vec![1.0, 2.0, 2.0, 1.0];
        assert!(!is_positive_definite(&indefinite, 2));
    }

    #[test]
    fn quad_form_matches_manual_expansion() {
        let a = vec![2.0, 1.0, 1.0, 3.0];
        let x = [1.0, -2.0];
        // 2*1 + 2*1*(-2)*1 + 3*4 = 2 - 4 + 12
        assert!((quad_form(&a, 2, &x) - 10.0).abs() < 1e-12);
    }
}
