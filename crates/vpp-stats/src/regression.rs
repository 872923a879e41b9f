//! Ordinary least squares for a polynomial in one variable
//!
//! [`PolynomialFit::fit`] solves the normal equations `(XᵀX) β = Xᵀy` for the
//! design matrix `X = [1, x, x², …, x^degree]` using Gaussian elimination with
//! partial pivoting.
//!
//! Observation pairs with a non-finite `x` or `y` are treated as missing and
//! left out of the design matrix; they never count as zeros.

/// Errors that can occur while fitting a polynomial.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum RegressionError {
    #[display("x and y have different lengths ({xs} vs {ys})")]
    LengthMismatch { xs: usize, ys: usize },
    #[display("need at least {required} finite observations, got {actual}")]
    TooFewObservations { required: usize, actual: usize },
    #[display("design matrix is singular (x has too few distinct values)")]
    Singular,
}

/// A fitted polynomial `β₀ + β₁x + … + β_d x^d`.
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialFit {
    coefficients: Vec<f64>,
}

impl PolynomialFit {
    /// Fits a polynomial of the given degree by least squares.
    ///
    /// At least `degree + 1` finite observations are required.
    ///
    /// # Examples
    ///
    /// ```
    /// use vpp_stats::regression::PolynomialFit;
    ///
    /// let xs = [0.0, 1.0, 2.0, f64::NAN];
    /// let ys = [0.0, 1.0, 4.0, 100.0];
    /// let fit = PolynomialFit::fit(&xs, &ys, 2).unwrap();
    /// assert!((fit.evaluate(3.0) - 9.0).abs() < 1e-9);
    /// ```
    pub fn fit(xs: &[f64], ys: &[f64], degree: usize) -> Result<Self, RegressionError> {
        if xs.len() != ys.len() {
            return Err(RegressionError::LengthMismatch {
                xs: xs.len(),
                ys: ys.len(),
            });
        }

        let points = xs
            .iter()
            .zip(ys)
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .map(|(x, y)| (*x, *y))
            .collect::<Vec<_>>();
        let width = degree + 1;
        if points.len() < width {
            return Err(RegressionError::TooFewObservations {
                required: width,
                actual: points.len(),
            });
        }

        // Augmented normal equations [XᵀX | Xᵀy]
        let mut system = vec![vec![0.0; width + 1]; width];
        for (x, y) in points {
            let row = powers(x, degree);
            for i in 0..width {
                for j in 0..width {
                    system[i][j] += row[i] * row[j];
                }
                system[i][width] += row[i] * y;
            }
        }

        let coefficients = solve(system)?;
        Ok(Self { coefficients })
    }

    /// Coefficients, constant term first.
    #[must_use]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Evaluates the polynomial at `x`.
    #[must_use]
    pub fn evaluate(&self, x: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc.mul_add(x, *c))
    }
}

fn powers(x: f64, degree: usize) -> Vec<f64> {
    let mut row = Vec::with_capacity(degree + 1);
    let mut acc = 1.0;
    for _ in 0..=degree {
        row.push(acc);
        acc *= x;
    }
    row
}

fn solve(mut system: Vec<Vec<f64>>) -> Result<Vec<f64>, RegressionError> {
    let n = system.len();
    let scale = system
        .iter()
        .flat_map(|row| row[..n].iter())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let tolerance = scale * f64::EPSILON * 1e3;

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&a, &b| system[a][col].abs().total_cmp(&system[b][col].abs()))
            .ok_or(RegressionError::Singular)?;
        if system[pivot_row][col].abs() <= tolerance {
            return Err(RegressionError::Singular);
        }
        system.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = system[row][col] / system[col][col];
            for k in col..=n {
                system[row][k] -= factor * system[col][k];
            }
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail = ((row + 1)..n)
            .map(|k| system[row][k] * solution[k])
            .sum::<f64>();
        solution[row] = (system[row][n] - tail) / system[row][row];
    }
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_exact_line() {
        let xs = [10.0, 20.0, 30.0, 40.0];
        let ys = xs.map(|x| 0.5 - 0.01 * x);
        let fit = PolynomialFit::fit(&xs, &ys, 1).unwrap();
        assert!(approx_eq(fit.coefficients()[0], 0.5));
        assert!(approx_eq(fit.coefficients()[1], -0.01));
        assert_eq!(fit.coefficients().len(), 2);
    }

    #[test]
    fn test_least_squares_line() {
        // Symmetric noise around y = x
        let xs = [0.0, 0.0, 1.0, 1.0];
        let ys = [-1.0, 1.0, 0.0, 2.0];
        let fit = PolynomialFit::fit(&xs, &ys, 1).unwrap();
        assert!(approx_eq(fit.coefficients()[0], 0.0));
        assert!(approx_eq(fit.coefficients()[1], 1.0));
    }

    #[test]
    fn test_cubic() {
        let xs = [-2.0, -1.0, 0.0, 1.0, 2.0, 3.0];
        let ys = xs.map(|x: f64| 1.0 - 2.0 * x + 0.5 * x.powi(3));
        let fit = PolynomialFit::fit(&xs, &ys, 3).unwrap();
        assert!(approx_eq(fit.evaluate(4.0), 1.0 - 8.0 + 32.0));
    }

    #[test]
    fn test_missing_values_are_skipped() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [2.0, f64::NAN, 6.0, f64::INFINITY];
        let fit = PolynomialFit::fit(&xs, &ys, 1).unwrap();
        assert!(approx_eq(fit.evaluate(2.0), 4.0));
    }

    #[test]
    fn test_too_few_observations() {
        let err = PolynomialFit::fit(&[1.0, 2.0], &[1.0, f64::NAN], 1).unwrap_err();
        assert!(matches!(
            err,
            RegressionError::TooFewObservations {
                required: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_singular_design() {
        let err = PolynomialFit::fit(&[3.0, 3.0, 3.0], &[1.0, 2.0, 3.0], 1).unwrap_err();
        assert!(matches!(err, RegressionError::Singular));
    }

    #[test]
    fn test_length_mismatch() {
        let err = PolynomialFit::fit(&[1.0], &[1.0, 2.0], 0).unwrap_err();
        assert!(matches!(err, RegressionError::LengthMismatch { .. }));
    }
}
