//! Dense linear solves for the penalized least-squares fits.

/// Solves `a * x = b` for a row-major `n x n` matrix by Gauss-Jordan
/// elimination with partial pivoting.
///
/// Returns `None` if the system is singular.
#[must_use]
pub fn solve(a: &[f64], b: &[f64], n: usize) -> Option<Vec<f64>> {
    if a.len() != n * n || b.len() != n {
        return None;
    }

    let mut a = a.to_vec();
    let mut x = b.to_vec();

    for i in 0..n {
        let mut max_row = i;
        for k in (i + 1)..n {
            if a[k * n + i].abs() > a[max_row * n + i].abs() {
                max_row = k;
            }
        }

        if max_row != i {
            for j in 0..n {
                a.swap(i * n + j, max_row * n + j);
            }
            x.swap(i, max_row);
        }

        let pivot = a[i * n + i];
        if pivot.abs() < 1e-12 {
            return None;
        }

        for j in 0..n {
            a[i * n + j] /= pivot;
        }
        x[i] /= pivot;

        for k in 0..n {
            if k == i {
                continue;
            }
            let factor = a[k * n + i];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                a[k * n + j] -= factor * a[i * n + j];
            }
            x[k] -= factor * x[i];
        }
    }

    Some(x)
}

/// Solves the ridge-penalized normal equations
/// `(XᵀX + diag(penalty)) β = Xᵀy` for a design matrix given as rows.
#[must_use]
pub fn ridge(rows: &[Vec<f64>], y: &[f64], penalty: &[f64]) -> Option<Vec<f64>> {
    let n = penalty.len();
    let mut gram = vec![0.0; n * n];
    let mut rhs = vec![0.0; n];

    for (row, target) in rows.iter().zip(y) {
        for i in 0..n {
            rhs[i] += row[i] * target;
            for j in i..n {
                gram[i * n + j] += row[i] * row[j];
            }
        }
    }
    for i in 0..n {
        for j in 0..i {
            gram[i * n + j] = gram[j * n + i];
        }
        gram[i * n + i] += penalty[i];
    }

    solve(&gram, &rhs, n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_small_system() {
        // 2x + y = 5, x + 3y = 10
        let x = solve(&[2.0, 1.0, 1.0, 3.0], &[5.0, 10.0], 2).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-10);
        assert!((x[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn pivots_past_zero_diagonal() {
        let x = solve(&[0.0, 1.0, 1.0, 0.0], &[2.0, 7.0], 2).unwrap();
        assert!((x[0] - 7.0).abs() < 1e-10);
        assert!((x[1] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn singular_system_is_none() {
        assert!(solve(&[1.0, 2.0, 2.0, 4.0], &[1.0, 2.0], 2).is_none());
        assert!(solve(&[1.0], &[1.0, 2.0], 2).is_none());
    }

    #[test]
    fn ridge_recovers_line_with_tiny_penalty() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![f64::from(i), 1.0]).collect();
        let y: Vec<f64> = (0..10).map(|i| 2.0 * f64::from(i) + 1.0).collect();
        let beta = ridge(&rows, &y, &[1e-9, 1e-9]).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-6);
        assert!((beta[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn ridge_penalty_shrinks_toward_zero() {
        let rows = vec![vec![1.0]; 4];
        let y = [1.0; 4];
        let loose = ridge(&rows, &y, &[0.0]).unwrap()[0];
        let tight = ridge(&rows, &y, &[100.0]).unwrap()[0];
        assert!((loose - 1.0).abs() < 1e-12);
        assert!(tight < 0.1);
    }
}
