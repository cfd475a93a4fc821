use crate::errors::{Result, RogpError};
use crate::kernels::{Kernel, KernelKind};
use crate::transcendental::Numeric;
use crate::warping::WarpingFunction;

use linfa::prelude::{DatasetBase, Fit};
use linfa::{Float, ParamGuard};
use linfa_linalg::{cholesky::*, triangular::*};
use ndarray::{Array2, ArrayBase, ArrayView2, Axis, Data, Ix1, Ix2};

use log::debug;

/// The quantities extracted from a trained GP model which are required
/// to compute posterior predictions.
pub trait TrainedGp<F: Float> {
    /// Training inputs (n, nx) in normalized units
    fn training_inputs(&self) -> ArrayView2<'_, F>;
    /// Posterior weight vector (n, 1)
    fn woodbury_vector(&self) -> ArrayView2<'_, F>;
    /// Posterior inverse covariance matrix (n, n)
    fn woodbury_inv(&self) -> ArrayView2<'_, F>;
    /// Likelihood (noise) variance
    fn likelihood_variance(&self) -> F;
    /// Kernel lengthscale
    fn lengthscale(&self) -> F;
    /// Kernel variance
    fn variance(&self) -> F;
    /// Warping function if the GP is warped
    fn warping(&self) -> Option<&WarpingFunction<F>> {
        None
    }
}

/// A snapshot of a trained GP posterior
#[derive(Clone, Debug, PartialEq)]
pub struct GpPosterior<F: Float> {
    xt: Array2<F>,
    woodbury_vector: Array2<F>,
    woodbury_inv: Array2<F>,
    likelihood_variance: F,
    lengthscale: F,
    variance: F,
    warping: Option<WarpingFunction<F>>,
}

impl<F: Float> GpPosterior<F> {
    /// Constructor from the posterior quantities of a trained GP
    pub fn new(
        xt: Array2<F>,
        woodbury_vector: Array2<F>,
        woodbury_inv: Array2<F>,
        likelihood_variance: F,
        lengthscale: F,
        variance: F,
    ) -> Result<Self> {
        let n = xt.nrows();
        if woodbury_vector.dim() != (n, 1) {
            return Err(RogpError::DimensionMismatch(format!(
                "woodbury vector should be ({n}, 1), got {:?}",
                woodbury_vector.dim()
            )));
        }
        if woodbury_inv.dim() != (n, n) {
            return Err(RogpError::DimensionMismatch(format!(
                "woodbury inverse should be ({n}, {n}), got {:?}",
                woodbury_inv.dim()
            )));
        }
        if likelihood_variance < F::zero() {
            return Err(RogpError::InvalidValue(format!(
                "likelihood variance should be positive, got {likelihood_variance}"
            )));
        }
        Ok(GpPosterior {
            xt,
            woodbury_vector,
            woodbury_inv,
            likelihood_variance,
            lengthscale,
            variance,
            warping: None,
        })
    }

    /// Attach a warping function, the posterior is then expressed in latent space
    pub fn with_warping(mut self, warping: WarpingFunction<F>) -> Self {
        self.warping = Some(warping);
        self
    }

    /// Number of training points
    pub fn n_train(&self) -> usize {
        self.xt.nrows()
    }

    /// Posterior parameters constructor
    pub fn params(kernel: KernelKind) -> PosteriorParams<F> {
        PosteriorParams::new(kernel)
    }
}

impl<F: Float> TrainedGp<F> for GpPosterior<F> {
    fn training_inputs(&self) -> ArrayView2<'_, F> {
        self.xt.view()
    }

    fn woodbury_vector(&self) -> ArrayView2<'_, F> {
        self.woodbury_vector.view()
    }

    fn woodbury_inv(&self) -> ArrayView2<'_, F> {
        self.woodbury_inv.view()
    }

    fn likelihood_variance(&self) -> F {
        self.likelihood_variance
    }

    fn lengthscale(&self) -> F {
        self.lengthscale
    }

    fn variance(&self) -> F {
        self.variance
    }

    fn warping(&self) -> Option<&WarpingFunction<F>> {
        self.warping.as_ref()
    }
}

/// A set of validated parameters to compute an exact GP posterior
/// given training data and fixed hyperparameters.
#[derive(Clone, Debug, PartialEq)]
pub struct PosteriorValidParams<F: Float> {
    kernel: KernelKind,
    lengthscale: F,
    variance: F,
    noise_variance: F,
    warping: Option<WarpingFunction<F>>,
}

impl<F: Float> Default for PosteriorValidParams<F> {
    fn default() -> PosteriorValidParams<F> {
        PosteriorValidParams {
            kernel: KernelKind::default(),
            lengthscale: F::one(),
            variance: F::one(),
            noise_variance: F::cast(1e-6),
            warping: None,
        }
    }
}

impl<F: Float> PosteriorValidParams<F> {
    /// Get kernel kind
    pub fn kernel(&self) -> KernelKind {
        self.kernel
    }

    /// Get kernel lengthscale
    pub fn lengthscale(&self) -> F {
        self.lengthscale
    }

    /// Get kernel variance
    pub fn variance(&self) -> F {
        self.variance
    }

    /// Get likelihood variance
    pub fn noise_variance(&self) -> F {
        self.noise_variance
    }

    /// Get warping function
    pub fn warping(&self) -> Option<&WarpingFunction<F>> {
        self.warping.as_ref()
    }
}

/// The set of hyperparameters used to compute an exact [GpPosterior]
#[derive(Clone, Debug)]
pub struct PosteriorParams<F: Float>(PosteriorValidParams<F>);

impl<F: Float> PosteriorParams<F> {
    /// A constructor for posterior parameters given the kernel kind
    pub fn new(kernel: KernelKind) -> PosteriorParams<F> {
        Self(PosteriorValidParams {
            kernel,
            ..Default::default()
        })
    }

    /// Set kernel lengthscale
    pub fn lengthscale(mut self, lengthscale: F) -> Self {
        self.0.lengthscale = lengthscale;
        self
    }

    /// Set kernel variance
    pub fn variance(mut self, variance: F) -> Self {
        self.0.variance = variance;
        self
    }

    /// Set likelihood variance
    pub fn noise_variance(mut self, noise_variance: F) -> Self {
        self.0.noise_variance = noise_variance;
        self
    }

    /// Set warping function: training outputs are then warped to latent space
    pub fn warping(mut self, warping: Option<WarpingFunction<F>>) -> Self {
        self.0.warping = warping;
        self
    }
}

impl<F: Float> ParamGuard for PosteriorParams<F> {
    type Checked = PosteriorValidParams<F>;
    type Error = RogpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        Kernel::new(self.0.kernel, self.0.lengthscale, self.0.variance)?;
        if self.0.noise_variance < F::zero() {
            return Err(RogpError::InvalidValue(format!(
                "noise variance should be positive, got {}",
                self.0.noise_variance
            )));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl<F: Float, D: Data<Elem = F>> Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>, RogpError>
    for PosteriorValidParams<F>
{
    type Object = GpPosterior<F>;

    /// Compute posterior `W = (K + noise*I)^-1` and `w = W.y` with training
    /// outputs warped to latent space when a warping function is given.
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>>,
    ) -> Result<Self::Object> {
        let xt = dataset.records();
        let mut yt = dataset.targets().to_owned().insert_axis(Axis(1));
        if let Some(warping) = &self.warping {
            yt.mapv_inplace(|v| warping.value(v, &Numeric));
        }
        let n = xt.nrows();
        if yt.nrows() != n {
            return Err(RogpError::DimensionMismatch(format!(
                "{n} training inputs for {} outputs",
                yt.nrows()
            )));
        }

        let kernel = Kernel::new(self.kernel, self.lengthscale, self.variance)?;
        let mut k = kernel.covariance(xt, xt);
        k.diag_mut().mapv_inplace(|v| v + self.noise_variance);

        // K = L.Lt
        let l = k.cholesky()?;
        let l_inv = l.solve_triangular(&Array2::<F>::eye(n), UPLO::Lower)?;
        let woodbury_inv = l_inv.t().dot(&l_inv);
        let rho = l.solve_triangular(&yt, UPLO::Lower)?;
        let woodbury_vector = l.t().solve_triangular_into(rho, UPLO::Upper)?;
        debug!("Posterior computed with {kernel} on {n} training points");

        let gp = GpPosterior::new(
            xt.to_owned(),
            woodbury_vector,
            woodbury_inv,
            self.noise_variance,
            self.lengthscale,
            self.variance,
        )?;
        Ok(match &self.warping {
            Some(warping) => gp.with_warping(warping.clone()),
            None => gp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use linfa::prelude::Dataset;
    use ndarray::{array, Array1};

    #[test]
    fn test_exact_posterior() {
        let xt = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
        let yt = array![0.0, 1.0, 1.5, 0.9, 1.0];
        let gp = GpPosterior::params(KernelKind::SquaredExponential)
            .noise_variance(1e-4)
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .expect("posterior");
        assert_eq!(5, gp.n_train());
        assert!(gp.warping().is_none());

        // W is the inverse of K + noise*I
        let kernel = Kernel::new(KernelKind::SquaredExponential, 1., 1.).unwrap();
        let mut k = kernel.covariance(&xt, &xt);
        k.diag_mut().mapv_inplace(|v| v + 1e-4);
        assert_abs_diff_eq!(
            k.dot(&gp.woodbury_inv()),
            Array2::<f64>::eye(5),
            epsilon = 1e-8
        );
        // w = W.y
        let w = gp.woodbury_inv().dot(&yt.insert_axis(Axis(1)));
        assert_abs_diff_eq!(w, gp.woodbury_vector(), epsilon = 1e-8);
    }

    #[test]
    fn test_warped_posterior() {
        let warping = WarpingFunction::new(1., &array![[0.5, 1., 0.]]).unwrap();
        let xt = array![[0.0], [1.0], [2.0]];
        let yt = array![0.2, -0.4, 0.9];
        let gp = GpPosterior::params(KernelKind::Matern52)
            .warping(Some(warping.clone()))
            .fit(&Dataset::new(xt, yt.clone()))
            .expect("posterior");
        assert_eq!(Some(&warping), gp.warping());

        let zt: Array1<f64> = yt.mapv(|v| warping.value(v, &Numeric));
        let w = gp.woodbury_inv().dot(&zt.insert_axis(Axis(1)));
        assert_abs_diff_eq!(w, gp.woodbury_vector(), epsilon = 1e-8);
    }

    #[test]
    fn test_bad_posterior() {
        let xt = array![[0.0], [1.0]];
        let inv = Array2::eye(2);
        // 3 weights for 2 training points
        let weights = Array2::zeros((3, 1));
        let posterior = GpPosterior::new(xt.clone(), weights, inv.clone(), 0.1, 1., 1.);
        assert!(matches!(posterior, Err(RogpError::DimensionMismatch(_))));
        let negative_noise = GpPosterior::new(xt, Array2::zeros((2, 1)), inv, -0.1, 1., 1.);
        assert!(negative_noise.is_err());
        assert!(GpPosterior::<f64>::params(KernelKind::Matern32)
            .lengthscale(-1.)
            .check()
            .is_err());
    }
}
