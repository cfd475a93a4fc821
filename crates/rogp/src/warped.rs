use crate::errors::{Result, RogpError};
use crate::expression::{Constraint, ConstraintSink};
use crate::kernels::KernelKind;
use crate::normalizer::Normalizer;
use crate::parameters::{PredictorParams, PredictorValidParams};
use crate::posterior::TrainedGp;
use crate::standard::{write_plot_files, StandardPredictor};
use crate::transcendental::{Operand, Transcendental};
use crate::warping::WarpingFunction;

use argmin::core::{ArgminFloat, CostFunction, Executor, State, TerminationReason};
use argmin::solver::brent::BrentRoot;
use linfa::{Float, ParamGuard};
use ndarray::{Array, Array2, ArrayBase, Data, Dimension, Ix2, Zip};

use log::{debug, warn};
use std::path::Path;

/// Prediction of a warped GP.
///
/// The GP models a latent space `z` related to the (normalized) observation
/// space `y` through a monotonic [WarpingFunction] `z = warp(y)`.
/// Mean prediction in observation space is not given in closed form: it is expressed
/// as the equality constraint `warp(y) - mu_latent(x) = 0` added to an optimization model
/// where `y` is a decision variable.
///
/// The `tanh` provider `T` (see [Transcendental]) selects how the warping function
/// is evaluated: [Numeric](crate::Numeric) for numbers only,
/// [Symbolic](crate::Symbolic) for numbers and model expressions.
#[derive(Clone, Debug)]
pub struct WarpedPredictor<F: Float, T> {
    gp: StandardPredictor<F>,
    warping: WarpingFunction<F>,
    tanh: T,
    bracket: (F, F),
    tol: F,
    max_iters: u64,
}

impl<F: Float, T> WarpedPredictor<F, T> {
    /// Constructor given a trained warped GP, the name of the kernel used for training
    /// (see [KernelKind]), input/output transforms and the `tanh` provider.
    pub fn new(
        gp: &impl TrainedGp<F>,
        kernel: &str,
        normalizer: Normalizer<F>,
        tanh: T,
    ) -> Result<Self> {
        let kind = kernel.parse::<KernelKind>()?;
        let params = PredictorParams::new(kind).normalizer(normalizer).check()?;
        Self::from_params(gp, &params, tanh)
    }

    /// Constructor given a trained warped GP, validated parameters and the `tanh` provider
    pub fn from_params(
        gp: &impl TrainedGp<F>,
        params: &PredictorValidParams<F>,
        tanh: T,
    ) -> Result<Self> {
        let warping = gp
            .warping()
            .ok_or_else(|| {
                RogpError::InvalidWarping("trained GP has no warping function".to_string())
            })?
            .clone();
        let gp = StandardPredictor::from_params(gp, params)?;
        debug!(
            "Warped predictor with {} warping terms on {}",
            warping.n_terms(),
            gp
        );
        Ok(WarpedPredictor {
            gp,
            warping,
            tanh,
            bracket: params.bracket(),
            tol: params.tol(),
            max_iters: params.max_iters(),
        })
    }

    /// Warping function
    pub fn warping(&self) -> &WarpingFunction<F> {
        &self.warping
    }

    /// `tanh` provider
    pub fn transcendental(&self) -> &T {
        &self.tanh
    }

    /// Input and output transforms
    pub fn normalizer(&self) -> &Normalizer<F> {
        self.gp.normalizer()
    }

    /// Warp values given in observation units as a (n, 1) matrix.
    /// Values are normalized with the output transform then warped, the result
    /// stays in latent space.
    pub fn warp<E>(&self, y: &Array2<E>) -> Result<Array2<E>>
    where
        E: Operand<F>,
        T: Transcendental<E>,
    {
        let ynorm = self.gp.normalizer().y.normalize_operands(y)?;
        Ok(ynorm.mapv(|v| self.warping.value(v, &self.tanh)))
    }

    /// Derivative of the warping function with regard to normalized values
    /// evaluated at `y` given in observation units as a (n, 1) matrix.
    pub fn warp_deriv(&self, y: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>>
    where
        T: Transcendental<F>,
    {
        let ynorm = self.gp.normalizer().y.normalize(y)?;
        Ok(ynorm.mapv(|v| self.warping.derivative(v, &self.tanh)))
    }

    /// Predict latent mean values at n given `x` points of nx components specified as a (n, nx) matrix.
    /// Returns a (n, 1) matrix.
    pub fn predict_mu_latent(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        self.gp.predict_mu_latent(x)
    }

    /// Predict latent covariance matrix between n given `x` points of nx components
    /// specified as a (n, nx) matrix. Returns a (n, n) matrix.
    pub fn predict_cov_latent(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        self.gp.predict_cov_latent(x)
    }

    /// Predict both latent mean values and latent covariance matrix at n given `x` points
    pub fn predict_latent(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array2<F>, Array2<F>)> {
        Ok((self.predict_mu_latent(x)?, self.predict_cov_latent(x)?))
    }

    /// Couple the prediction `y` (observation units, (n, 1) matrix of decision variables
    /// or numbers) at n given `x` points to the GP: for each point, the equality
    /// constraint `warp(y) - mu_latent(x) = 0` is appended to `cons`.
    /// Returns `y` unchanged.
    pub fn predict_mu<E, C>(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &Array2<E>,
        cons: &mut C,
    ) -> Result<Array2<E>>
    where
        E: Operand<F>,
        T: Transcendental<E>,
        C: ConstraintSink<E> + ?Sized,
    {
        let z = self.predict_mu_latent(x)?;
        if y.dim() != z.dim() {
            return Err(RogpError::DimensionMismatch(format!(
                "predictions should be given as a {:?} matrix, got {:?}",
                z.dim(),
                y.dim()
            )));
        }
        let wy = self.warp(y)?;
        Zip::from(&wy).and(&z).for_each(|w, &zi| {
            cons.add(Constraint::Equal(w.clone() - zi));
        });
        Ok(y.to_owned())
    }

    /// Covariance is not available in observation space: falls back to
    /// [WarpedPredictor::predict_cov_latent] with a warning.
    pub fn predict_cov(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        warn!("Cannot predict variance in observation space, predicting in latent space instead");
        self.predict_cov_latent(x)
    }

    /// Same as [WarpedPredictor::predict_mu]
    pub fn predict<E, C>(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &Array2<E>,
        cons: &mut C,
    ) -> Result<Array2<E>>
    where
        E: Operand<F>,
        T: Transcendental<E>,
        C: ConstraintSink<E> + ?Sized,
    {
        self.predict_mu(x, y, cons)
    }

    /// Save latent predictions at `x` points in `dir` as numpy files
    /// (`x.npy`, `mu.npy` and `var.npy`) to be plotted by an external tool.
    /// Observation space moments are not available: mean and variance are latent ones.
    pub fn write_plot_data(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        dir: impl AsRef<Path>,
    ) -> Result<()>
    where
        F: ndarray_npy::WritableElement,
    {
        warn!("Cannot plot in observation space, writing latent space predictions instead");
        let (mu, cov) = self.predict_latent(x)?;
        write_plot_files(dir.as_ref(), x, &mu, &cov)
    }
}

/// `warp(y) - target` as a cost function for root finding
struct WarpResidual<F: Float, T> {
    warping: WarpingFunction<F>,
    tanh: T,
    target: F,
}

impl<F, T> CostFunction for WarpResidual<F, T>
where
    F: Float,
    T: Transcendental<F>,
{
    type Param = F;
    type Output = F;

    fn cost(&self, y: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
        Ok(self.warping.value(*y, &self.tanh) - self.target)
    }
}

impl<F, T> WarpedPredictor<F, T>
where
    F: Float + ArgminFloat,
    T: Transcendental<F> + Clone,
{
    /// Find `y` (normalized units) in `bracket` such that `warp(y) = xi`
    fn find_root(&self, xi: F, bracket: (F, F)) -> Result<F> {
        let (lower, upper) = if bracket.0 <= bracket.1 {
            bracket
        } else {
            (bracket.1, bracket.0)
        };
        let not_found = || RogpError::RootNotFound {
            target: xi.to_f64().unwrap_or(f64::NAN),
            lower: lower.to_f64().unwrap_or(f64::NAN),
            upper: upper.to_f64().unwrap_or(f64::NAN),
        };
        let residual = WarpResidual {
            warping: self.warping.clone(),
            tanh: self.tanh.clone(),
            target: xi,
        };
        let f_lower = residual.cost(&lower)?;
        let f_upper = residual.cost(&upper)?;
        if f_lower == F::zero() {
            return Ok(lower);
        }
        if f_upper == F::zero() {
            return Ok(upper);
        }
        // no sign change, NaN included
        if !((f_lower < F::zero() && f_upper > F::zero())
            || (f_lower > F::zero() && f_upper < F::zero()))
        {
            return Err(not_found());
        }

        let solver = BrentRoot::new(lower, upper, self.tol);
        let res = Executor::new(residual, solver)
            .configure(|state| state.max_iters(self.max_iters))
            .run()?;
        if let Some(TerminationReason::MaxItersReached) = res.state().get_termination_reason() {
            debug!(
                "Warping inversion of {xi} not converged after {} iterations",
                self.max_iters
            );
            return Err(not_found());
        }
        let root = res.state().get_param().copied().ok_or_else(not_found)?;
        let r = self.warping.value(root, &self.tanh) - xi;
        if r.abs() <= self.tol.sqrt() {
            Ok(root)
        } else {
            debug!("Warping inversion of {xi} stopped with residual {r}");
            Err(not_found())
        }
    }

    fn unscale_output(&self, ynorm: F) -> Result<F> {
        let y = self
            .gp
            .normalizer()
            .y
            .inverse_mean(&Array2::from_elem((1, 1), ynorm))?;
        Ok(y[[0, 0]])
    }

    /// Invert the warping function at latent value `xi` looking for a solution
    /// within `bracket` given in observation units.
    /// Returns the solution in observation units or [RogpError::RootNotFound]
    /// when the bracket does not contain any root.
    pub fn warp_inv_scalar(&self, xi: F, bracket: (F, F)) -> Result<F> {
        let bracket = self.gp.normalizer().y.normalize_bounds(bracket)?;
        let ynorm = self.find_root(xi, bracket)?;
        self.unscale_output(ynorm)
    }

    /// Invert the warping function elementwise at latent values `xi` using the default
    /// bracket (normalized units, see [PredictorParams::bracket]).
    /// Each element holds its own outcome, a failure does not abort the whole batch.
    pub fn warp_inv<D: Dimension>(
        &self,
        xi: &ArrayBase<impl Data<Elem = F>, D>,
    ) -> Array<Result<F>, D> {
        xi.map(|&v| {
            self.find_root(v, self.bracket)
                .and_then(|ynorm| self.unscale_output(ynorm))
                .map_err(|err| {
                    warn!("Warping inversion failed: {err}");
                    err
                })
        })
    }

    /// Invert the warping function elementwise at latent values `xi` using the default
    /// bracket, failing on the first element which cannot be inverted.
    pub fn try_warp_inv<D: Dimension>(
        &self,
        xi: &ArrayBase<impl Data<Elem = F>, D>,
    ) -> Result<Array<F, D>> {
        let mut y = Array::zeros(xi.raw_dim());
        for (yi, &v) in y.iter_mut().zip(xi.iter()) {
            *yi = self.unscale_output(self.find_root(v, self.bracket)?)?;
        }
        Ok(y)
    }
}
