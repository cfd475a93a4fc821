use crate::errors::{Result, RogpError};
use crate::transcendental::{Operand, Transcendental};
use linfa::Float;
use ndarray::{Array2, ArrayBase, ArrayView2, Data, Ix2};

/// Monotonic warping function mapping the observed (normalized) output space
/// to the latent space of the GP:
///
/// `z = d*y + sum_i a_i * tanh(b_i * (y + c_i))`
#[derive(Clone, Debug, PartialEq)]
pub struct WarpingFunction<F: Float> {
    d: F,
    /// (n_terms, 3) matrix, each row being a (a, b, c) warping term
    psi: Array2<F>,
}

impl<F: Float> WarpingFunction<F> {
    /// Constructor given linear coefficient `d` and `psi` terms as rows (a, b, c)
    pub fn new(d: F, psi: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Self> {
        if psi.ncols() != 3 {
            return Err(RogpError::InvalidWarping(format!(
                "warping terms should be given as (a, b, c) rows, got {} columns",
                psi.ncols()
            )));
        }
        if !d.is_finite() || psi.iter().any(|v| !v.is_finite()) {
            return Err(RogpError::InvalidWarping(
                "warping coefficients should be finite".to_string(),
            ));
        }
        Ok(WarpingFunction {
            d,
            psi: psi.to_owned(),
        })
    }

    /// Linear coefficient
    pub fn d(&self) -> F {
        self.d
    }

    /// Warping terms as (a, b, c) rows
    pub fn psi(&self) -> ArrayView2<'_, F> {
        self.psi.view()
    }

    /// Number of tanh terms
    pub fn n_terms(&self) -> usize {
        self.psi.nrows()
    }

    /// Warp value `y` (normalized units) using `tanh` provider
    pub fn value<E, T>(&self, y: E, tanh: &T) -> E
    where
        E: Operand<F>,
        T: Transcendental<E>,
    {
        self.psi
            .rows()
            .into_iter()
            .fold(y.clone() * self.d, |z, term| {
                let (a, b, c) = (term[0], term[1], term[2]);
                z + tanh.tanh((y.clone() + c) * b) * a
            })
    }

    /// Derivative of the warping function at `y` (normalized units)
    ///
    /// `dz/dy = d + sum_i a_i * b_i * (1 - tanh(b_i * (y + c_i))^2)`
    pub fn derivative<T: Transcendental<F>>(&self, y: F, tanh: &T) -> F {
        self.psi.rows().into_iter().fold(self.d, |grad, term| {
            let (a, b, c) = (term[0], term[1], term[2]);
            let r = tanh.tanh(b * (y + c));
            grad + a * b * (F::one() - r * r)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expr;
    use crate::transcendental::{Numeric, Symbolic};
    use approx::assert_abs_diff_eq;
    use finitediff::FiniteDiff;
    use ndarray::array;

    fn warping() -> WarpingFunction<f64> {
        WarpingFunction::new(0.5, &array![[1.2, 0.8, -0.3], [0.4, 2.5, 0.7]]).unwrap()
    }

    #[test]
    fn test_value() {
        let w = warping();
        assert_eq!(w.psi(), array![[1.2, 0.8, -0.3], [0.4, 2.5, 0.7]]);
        let y = 0.25;
        let expected =
            0.5 * y + 1.2 * f64::tanh(0.8 * (y - 0.3)) + 0.4 * f64::tanh(2.5 * (y + 0.7));
        assert_abs_diff_eq!(expected, w.value(y, &Numeric), epsilon = 1e-15);
        assert_abs_diff_eq!(expected, w.value(y, &Symbolic), epsilon = 1e-15);
        let e = w.value(Expr::var(0), &Symbolic);
        assert_abs_diff_eq!(expected, e.eval(&array![y]).unwrap(), epsilon = 1e-14);
    }

    #[test]
    fn test_derivative_vs_finite_differences() {
        let w = warping();
        for y in [-2., -0.7, 0., 0.3, 1.1, 2.4] {
            let fdiff = vec![y].central_diff(&|v: &Vec<f64>| w.value(v[0], &Numeric))[0];
            assert_abs_diff_eq!(fdiff, w.derivative(y, &Numeric), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_derivative_vs_symbolic_derivative() {
        let w = warping();
        let dz = w.value(Expr::var(0), &Symbolic).diff(0);
        for y in [-1., 0.5, 2.] {
            assert_abs_diff_eq!(
                dz.eval(&array![y]).unwrap(),
                w.derivative(y, &Numeric),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_linear_warping() {
        let w = WarpingFunction::new(2., &Array2::<f64>::zeros((0, 3))).unwrap();
        assert_eq!(0, w.n_terms());
        assert_eq!(3., w.value(1.5, &Numeric));
        assert_eq!(2., w.derivative(-4., &Numeric));
    }

    #[test]
    fn test_bad_warping() {
        assert!(matches!(
            WarpingFunction::new(1., &array![[1., 2.]]),
            Err(RogpError::InvalidWarping(_))
        ));
        assert!(WarpingFunction::new(f64::NAN, &array![[1., 2., 3.]]).is_err());
    }
}
