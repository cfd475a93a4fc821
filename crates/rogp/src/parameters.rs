use crate::errors::{Result, RogpError};
use crate::kernels::KernelKind;
use crate::normalizer::Normalizer;
use linfa::{Float, ParamGuard};

/// Default bracket (normalized units) used to invert the warping function
pub const WARP_INV_BRACKET: (f64, f64) = (-2.5, 2.5);
/// Default absolute tolerance of the warping function inversion
pub const WARP_INV_TOL: f64 = 1e-12;
/// Default max number of iterations of the warping function inversion
pub const WARP_INV_MAX_ITERS: u64 = 100;

/// A set of validated predictor parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct PredictorValidParams<F: Float> {
    /// Kernel used to evaluate posterior covariances
    pub(crate) kernel: KernelKind,
    /// Input and output transforms
    pub(crate) normalizer: Normalizer<F>,
    /// Bracket used by the batch warping inversion
    pub(crate) bracket: (F, F),
    /// Absolute tolerance of the root finder
    pub(crate) tol: F,
    /// Max number of iterations of the root finder
    pub(crate) max_iters: u64,
}

impl<F: Float> Default for PredictorValidParams<F> {
    fn default() -> PredictorValidParams<F> {
        PredictorValidParams {
            kernel: KernelKind::default(),
            normalizer: Normalizer::default(),
            bracket: (F::cast(WARP_INV_BRACKET.0), F::cast(WARP_INV_BRACKET.1)),
            tol: F::cast(WARP_INV_TOL),
            max_iters: WARP_INV_MAX_ITERS,
        }
    }
}

impl<F: Float> PredictorValidParams<F> {
    /// Get kernel kind
    pub fn kernel(&self) -> KernelKind {
        self.kernel
    }

    /// Get input/output transforms
    pub fn normalizer(&self) -> &Normalizer<F> {
        &self.normalizer
    }

    /// Get default warping inversion bracket
    pub fn bracket(&self) -> (F, F) {
        self.bracket
    }

    /// Get root finder tolerance
    pub fn tol(&self) -> F {
        self.tol
    }

    /// Get root finder max number of iterations
    pub fn max_iters(&self) -> u64 {
        self.max_iters
    }
}

#[derive(Clone, Debug)]
/// The set of parameters used to build a [Predictor](crate::Predictor)
/// from a trained GP.
pub struct PredictorParams<F: Float>(PredictorValidParams<F>);

impl<F: Float> Default for PredictorParams<F> {
    fn default() -> Self {
        Self(PredictorValidParams::default())
    }
}

impl<F: Float> PredictorParams<F> {
    /// A constructor for predictor parameters given the kernel kind
    pub fn new(kernel: KernelKind) -> PredictorParams<F> {
        Self(PredictorValidParams {
            kernel,
            ..Default::default()
        })
    }

    /// A constructor for predictor parameters from validated parameters
    pub fn new_from_valid(params: &PredictorValidParams<F>) -> Self {
        Self(params.clone())
    }

    /// Set kernel kind.
    pub fn kernel(mut self, kernel: KernelKind) -> Self {
        self.0.kernel = kernel;
        self
    }

    /// Set input and output transforms.
    pub fn normalizer(mut self, normalizer: Normalizer<F>) -> Self {
        self.0.normalizer = normalizer;
        self
    }

    /// Set the bracket (normalized units) used by the batch warping inversion.
    pub fn bracket(mut self, bracket: (F, F)) -> Self {
        self.0.bracket = bracket;
        self
    }

    /// Set the absolute tolerance of the root finder.
    pub fn tol(mut self, tol: F) -> Self {
        self.0.tol = tol;
        self
    }

    /// Set the max number of iterations of the root finder.
    pub fn max_iters(mut self, max_iters: u64) -> Self {
        self.0.max_iters = max_iters;
        self
    }
}

impl<F: Float> From<PredictorValidParams<F>> for PredictorParams<F> {
    fn from(valid: PredictorValidParams<F>) -> Self {
        PredictorParams(valid)
    }
}

impl<F: Float> ParamGuard for PredictorParams<F> {
    type Checked = PredictorValidParams<F>;
    type Error = RogpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let (lower, upper) = self.0.bracket;
        if !(lower.is_finite() && upper.is_finite() && lower < upper) {
            return Err(RogpError::InvalidValue(format!(
                "bracket should be a finite interval (lower, upper), got ({lower}, {upper})"
            )));
        }
        if !(self.0.tol > F::zero()) {
            return Err(RogpError::InvalidValue(format!(
                "root finder tolerance should be strictly positive, got {}",
                self.0.tol
            )));
        }
        if self.0.max_iters == 0 {
            return Err(RogpError::InvalidValue(
                "`max_iters` cannot be 0!".to_string(),
            ));
        }
        if let Some(d) = self.0.normalizer.y.dim() {
            if d != 1 {
                return Err(RogpError::DimensionMismatch(format!(
                    "output transform should be one-dimensional, got {d}"
                )));
            }
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::Scaler;
    use ndarray::array;

    #[test]
    fn test_default_params() {
        let params = PredictorParams::<f64>::default().check().unwrap();
        assert_eq!(KernelKind::SquaredExponential, params.kernel());
        assert_eq!((-2.5, 2.5), params.bracket());
        assert_eq!(Normalizer::identity(), *params.normalizer());
    }

    #[test]
    fn test_bad_params() {
        assert!(PredictorParams::<f64>::default()
            .bracket((1., -1.))
            .check()
            .is_err());
        assert!(PredictorParams::<f64>::default().tol(0.).check().is_err());
        assert!(PredictorParams::<f64>::default()
            .max_iters(0)
            .check()
            .is_err());
        let normalizer = Normalizer {
            x: Scaler::identity(),
            y: Scaler::affine(array![0., 0.], array![1., 1.]).unwrap(),
        };
        let params = PredictorParams::<f64>::default().normalizer(normalizer);
        let result = params.check();
        assert!(matches!(result, Err(RogpError::DimensionMismatch(_))));
    }
}
