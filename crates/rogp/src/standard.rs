use crate::errors::{Result, RogpError};
use crate::kernels::{Kernel, KernelKind};
use crate::normalizer::Normalizer;
use crate::parameters::{PredictorParams, PredictorValidParams};
use crate::posterior::TrainedGp;

use linfa::{Float, ParamGuard};
use ndarray::{Array2, ArrayBase, ArrayView2, Data, Ix2};
use ndarray_npy::write_npy;

use log::debug;
use std::fmt;
use std::path::Path;

/// Prediction of a GP whose output space is not warped.
///
/// Posterior mean and covariance at `x` are computed from the kernel `k`,
/// the training inputs `X` and the posterior quantities of the trained GP
/// (Woodbury vector `w` and Woodbury inverse `W`):
///
/// * `mu(x) = k(x, X).w`
/// * `cov(x) = k(x, x) - k(x, X).W.k(X, x) + noise*I`
///
/// Inputs are normalized with the input transform before evaluation and
/// outputs are brought back to observation units with the output transform.
/// Training inputs of the GP are expected in normalized units.
#[derive(Clone, Debug)]
pub struct StandardPredictor<F: Float> {
    kernel: Kernel<F>,
    xt: Array2<F>,
    woodbury_vector: Array2<F>,
    woodbury_inv: Array2<F>,
    likelihood_variance: F,
    n_train: usize,
    normalizer: Normalizer<F>,
}

impl<F: Float> StandardPredictor<F> {
    /// Constructor given a trained GP, the name of the kernel used for training
    /// (see [KernelKind]) and input/output transforms.
    pub fn new(gp: &impl TrainedGp<F>, kernel: &str, normalizer: Normalizer<F>) -> Result<Self> {
        let kind = kernel.parse::<KernelKind>()?;
        let params = PredictorParams::new(kind).normalizer(normalizer).check()?;
        Self::from_params(gp, &params)
    }

    /// Constructor given a trained GP and validated parameters
    pub fn from_params(gp: &impl TrainedGp<F>, params: &PredictorValidParams<F>) -> Result<Self> {
        let kernel = Kernel::new(params.kernel(), gp.lengthscale(), gp.variance())?;
        let xt = gp.training_inputs();
        let n_train = xt.nrows();
        if gp.woodbury_vector().dim() != (n_train, 1) {
            return Err(RogpError::DimensionMismatch(format!(
                "woodbury vector should be ({n_train}, 1), got {:?}",
                gp.woodbury_vector().dim()
            )));
        }
        if gp.woodbury_inv().dim() != (n_train, n_train) {
            return Err(RogpError::DimensionMismatch(format!(
                "woodbury inverse should be ({n_train}, {n_train}), got {:?}",
                gp.woodbury_inv().dim()
            )));
        }
        if let Some(d) = params.normalizer().x.dim() {
            if d != xt.ncols() {
                return Err(RogpError::DimensionMismatch(format!(
                    "input transform of dimension {d} for training inputs of dimension {}",
                    xt.ncols()
                )));
            }
        }
        debug!("Standard predictor with {kernel} on {n_train} training points");
        Ok(StandardPredictor {
            kernel,
            xt: xt.to_owned(),
            woodbury_vector: gp.woodbury_vector().to_owned(),
            woodbury_inv: gp.woodbury_inv().to_owned(),
            likelihood_variance: gp.likelihood_variance(),
            n_train,
            normalizer: params.normalizer().clone(),
        })
    }

    /// Kernel instance
    pub fn kernel(&self) -> &Kernel<F> {
        &self.kernel
    }

    /// Training inputs (normalized units)
    pub fn training_inputs(&self) -> ArrayView2<'_, F> {
        self.xt.view()
    }

    /// Number of training points
    pub fn n_train(&self) -> usize {
        self.n_train
    }

    /// Likelihood (noise) variance
    pub fn likelihood_variance(&self) -> F {
        self.likelihood_variance
    }

    /// Input and output transforms
    pub fn normalizer(&self) -> &Normalizer<F> {
        &self.normalizer
    }

    /// Normalize `x` points given as a (n, nx) matrix
    pub(crate) fn normalize_inputs(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array2<F>> {
        if x.ncols() != self.xt.ncols() {
            return Err(RogpError::DimensionMismatch(format!(
                "expected points of dimension {}, got {}",
                self.xt.ncols(),
                x.ncols()
            )));
        }
        self.normalizer.x.normalize(x)
    }

    /// Posterior mean at normalized `xnorm` points, as a (n, 1) matrix
    pub(crate) fn latent_mu(&self, xnorm: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        let k_x_xt = self.kernel.covariance(xnorm, &self.xt);
        k_x_xt.dot(&self.woodbury_vector)
    }

    /// Posterior covariance between normalized `xnorm` points, as a (n, n) matrix
    pub(crate) fn latent_cov(&self, xnorm: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        let k_x_x = self.kernel.covariance(xnorm, xnorm);
        let k_x_xt = self.kernel.covariance(xnorm, &self.xt);
        let mut sigma = k_x_x - k_x_xt.dot(&self.woodbury_inv).dot(&k_x_xt.t());
        // observation noise
        sigma
            .diag_mut()
            .mapv_inplace(|v| v + self.likelihood_variance);
        sigma
    }

    /// Predict mean values in normalized output units at n given `x` points
    /// of nx components specified as a (n, nx) matrix. Returns a (n, 1) matrix.
    pub fn predict_mu_latent(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        let xnorm = self.normalize_inputs(x)?;
        Ok(self.latent_mu(&xnorm))
    }

    /// Predict covariance matrix in normalized output units between n given `x` points
    /// of nx components specified as a (n, nx) matrix. Returns a (n, n) matrix.
    pub fn predict_cov_latent(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        let xnorm = self.normalize_inputs(x)?;
        Ok(self.latent_cov(&xnorm))
    }

    /// Predict mean values at n given `x` points of nx components specified as a (n, nx) matrix.
    /// Returns mean values as a (n, 1) matrix.
    pub fn predict_mu(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        let mu = self.predict_mu_latent(x)?;
        self.normalizer.y.inverse_mean(&mu)
    }

    /// Predict covariance matrix between n given `x` points of nx components specified as a (n, nx) matrix.
    /// Returns a (n, n) matrix.
    pub fn predict_cov(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        let cov = self.predict_cov_latent(x)?;
        self.normalizer.y.inverse_variance(&cov)
    }

    /// Predict both mean values and covariance matrix at n given `x` points
    pub fn predict(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array2<F>, Array2<F>)> {
        Ok((self.predict_mu(x)?, self.predict_cov(x)?))
    }

    /// Save predictions at `x` points in `dir` as numpy files
    /// (`x.npy`, `mu.npy` and `var.npy`) to be plotted by an external tool.
    pub fn write_plot_data(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        dir: impl AsRef<Path>,
    ) -> Result<()>
    where
        F: ndarray_npy::WritableElement,
    {
        let (mu, cov) = self.predict(x)?;
        write_plot_files(dir.as_ref(), x, &mu, &cov)
    }
}

/// Write `x.npy`, `mu.npy` and `var.npy` (diagonal of `cov`) in `dir`
pub(crate) fn write_plot_files<F>(
    dir: &Path,
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    mu: &Array2<F>,
    cov: &Array2<F>,
) -> Result<()>
where
    F: Float + ndarray_npy::WritableElement,
{
    std::fs::create_dir_all(dir)?;
    write_npy(dir.join("x.npy"), &x.to_owned())?;
    write_npy(dir.join("mu.npy"), mu)?;
    write_npy(dir.join("var.npy"), &cov.diag().to_owned())?;
    Ok(())
}

impl<F: Float> fmt::Display for StandardPredictor<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "GP({}, n_train={}, likelihood_variance={})",
            self.kernel, self.n_train, self.likelihood_variance
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::Scaler;
    use crate::posterior::GpPosterior;
    use approx::assert_abs_diff_eq;
    use linfa::prelude::{Dataset, Fit};
    use ndarray::{array, Array, Array1, Axis};
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand_xoshiro::Xoshiro256Plus;
    use std::f64::consts::PI;

    fn xsinx(x: &Array2<f64>) -> Array1<f64> {
        x.column(0).mapv(|v| (v - 3.5) * ((v - 3.5) / PI).sin())
    }

    fn trained_gp(kernel: KernelKind) -> (Array2<f64>, Array1<f64>, GpPosterior<f64>) {
        let xt = array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let yt = xsinx(&xt);
        let gp = GpPosterior::params(kernel)
            .lengthscale(1.2)
            .variance(2.)
            .noise_variance(1e-8)
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .expect("posterior");
        (xt, yt, gp)
    }

    #[test]
    fn test_mean_interpolates_training_points() {
        for kernel in [
            KernelKind::SquaredExponential,
            KernelKind::AbsoluteExponential,
            KernelKind::Matern32,
            KernelKind::Matern52,
        ] {
            let (xt, yt, gp) = trained_gp(kernel);
            let predictor =
                StandardPredictor::new(&gp, &kernel.to_string(), Normalizer::identity())
                    .expect("predictor");
            let mu = predictor.predict_mu(&xt).expect("prediction");
            assert_eq!((xt.nrows(), 1), mu.dim());
            assert_abs_diff_eq!(mu.column(0), yt, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_covariance_symmetry_and_noise_floor() {
        let (_, _, gp) = trained_gp(KernelKind::SquaredExponential);
        let predictor = StandardPredictor::new(&gp, "RBF", Normalizer::identity()).unwrap();
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let x = Array::random_using((20, 1), Uniform::new(-1., 7.), &mut rng);
        let cov = predictor.predict_cov(&x).expect("covariance");
        assert_eq!((20, 20), cov.dim());
        assert_abs_diff_eq!(cov, cov.t(), epsilon = 1e-10);
        for v in cov.diag() {
            assert!(*v >= predictor.likelihood_variance() - 1e-10);
        }

        // repeated point
        let x = array![[2.5], [2.5]];
        let cov = predictor.predict_cov(&x).unwrap();
        assert_abs_diff_eq!(cov[[0, 0]], cov[[1, 1]], epsilon = 1e-12);
        assert!(cov[[0, 0]] >= predictor.likelihood_variance());
        assert_abs_diff_eq!(
            cov[[0, 0]] - predictor.likelihood_variance(),
            cov[[0, 1]],
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_covariance_formula() {
        let (xt, _, gp) = trained_gp(KernelKind::Matern52);
        let predictor = StandardPredictor::new(&gp, "Matern52", Normalizer::identity()).unwrap();
        let x = array![[1.7]];
        let kernel = Kernel::new(KernelKind::Matern52, 1.2, 2.).unwrap();
        let k = kernel.covariance(&x, &xt);
        let expected = 2. - k.dot(&gp.woodbury_inv()).dot(&k.t())[[0, 0]] + 1e-8;
        assert_abs_diff_eq!(
            predictor.predict_cov(&x).unwrap()[[0, 0]],
            expected,
            epsilon = 1e-12
        );
        let (mu, cov) = predictor.predict(&x).unwrap();
        assert_eq!(predictor.predict_mu(&x).unwrap(), mu);
        assert_eq!(predictor.predict_cov(&x).unwrap(), cov);
    }

    #[test]
    fn test_normalized_predictions() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let xt = Array::random_using((15, 2), Uniform::new(10., 20.), &mut rng);
        let yt = xt.map_axis(Axis(1), |x| 100. + 3. * x[0] - 2. * x[1]);

        let normalizer = Normalizer::standardize(&xt, &yt.clone().insert_axis(Axis(1))).unwrap();
        let xnorm = normalizer.x.normalize(&xt).unwrap();
        let ynorm = normalizer
            .y
            .normalize(&yt.clone().insert_axis(Axis(1)))
            .unwrap()
            .remove_axis(Axis(1));
        let gp = GpPosterior::params(KernelKind::SquaredExponential)
            .lengthscale(1.)
            .noise_variance(1e-8)
            .fit(&Dataset::new(xnorm, ynorm))
            .expect("posterior");

        let predictor = StandardPredictor::new(&gp, "RBF", normalizer.clone()).unwrap();
        let mu = predictor.predict_mu(&xt).unwrap();
        assert_abs_diff_eq!(mu.column(0), yt, epsilon = 1e-2);
        let mu_latent = predictor.predict_mu_latent(&xt).unwrap();
        assert_abs_diff_eq!(
            mu,
            normalizer.y.inverse_mean(&mu_latent).unwrap(),
            epsilon = 1e-10
        );

        // variance is scaled back with output scale
        let x = array![[15., 15.]];
        let cov = predictor.predict_cov(&x).unwrap();
        let latent = predictor.latent_cov(&normalizer.x.normalize(&x).unwrap());
        let scale = match &normalizer.y {
            Scaler::Affine { scale, .. } => scale[0],
            Scaler::Identity => 1.,
        };
        assert_abs_diff_eq!(cov[[0, 0]], latent[[0, 0]] * scale * scale, epsilon = 1e-10);
    }

    #[test]
    fn test_unsupported_kernel() {
        let (_, _, gp) = trained_gp(KernelKind::SquaredExponential);
        assert!(matches!(
            StandardPredictor::new(&gp, "Cosine", Normalizer::identity()),
            Err(RogpError::UnsupportedKernel(_))
        ));
    }

    #[test]
    fn test_bad_inputs() {
        let (_, _, gp) = trained_gp(KernelKind::SquaredExponential);
        let predictor = StandardPredictor::new(&gp, "RBF", Normalizer::identity()).unwrap();
        assert!(matches!(
            predictor.predict_mu(&array![[1., 2.]]),
            Err(RogpError::DimensionMismatch(_))
        ));
        let normalizer = Normalizer::new(
            Scaler::affine(array![0., 0.], array![1., 1.]).unwrap(),
            Scaler::identity(),
        )
        .unwrap();
        assert!(StandardPredictor::new(&gp, "RBF", normalizer).is_err());
    }

    #[test]
    fn test_write_plot_data() {
        let (_, _, gp) = trained_gp(KernelKind::Matern32);
        let predictor = StandardPredictor::new(&gp, "Matern32", Normalizer::identity()).unwrap();
        let xplot = Array::linspace(0., 6., 50).insert_axis(Axis(1));
        let test_dir = "target/tests/standard_predictor";
        predictor
            .write_plot_data(&xplot, test_dir)
            .expect("plot data saved");
        for file in ["x.npy", "mu.npy", "var.npy"] {
            assert!(Path::new(test_dir).join(file).exists());
        }
    }
}
