use crate::errors::Result;
use crate::kernels::KernelKind;
use crate::normalizer::Normalizer;
use crate::parameters::{PredictorParams, PredictorValidParams};
use crate::posterior::TrainedGp;
use crate::standard::StandardPredictor;
use crate::warped::WarpedPredictor;

use linfa::{Float, ParamGuard};
use ndarray::{Array2, ArrayBase, Data, Ix2};

use log::info;
use std::path::Path;

/// A predictor built from a trained GP: warped if the GP holds a warping function,
/// standard otherwise.
#[derive(Clone, Debug)]
pub enum Predictor<F: Float, T> {
    /// Prediction of a GP with untransformed output space
    Standard(StandardPredictor<F>),
    /// Prediction of a warped GP
    Warped(WarpedPredictor<F, T>),
}

impl<F: Float> PredictorValidParams<F> {
    /// Build the predictor relevant to the given trained GP.
    /// The `tanh` provider is only used when the GP is warped.
    pub fn build<T>(&self, gp: &impl TrainedGp<F>, tanh: T) -> Result<Predictor<F, T>> {
        let predictor = if gp.warping().is_some() {
            Predictor::Warped(WarpedPredictor::from_params(gp, self, tanh)?)
        } else {
            Predictor::Standard(StandardPredictor::from_params(gp, self)?)
        };
        info!("Predictor built: {}", predictor.name());
        Ok(predictor)
    }
}

/// Build the predictor relevant to the given trained GP, the name of the kernel
/// used for training (see [KernelKind]), input/output transforms and `tanh` provider.
pub fn from_trained<F: Float, T>(
    gp: &impl TrainedGp<F>,
    kernel: &str,
    normalizer: Normalizer<F>,
    tanh: T,
) -> Result<Predictor<F, T>> {
    let kind = kernel.parse::<KernelKind>()?;
    PredictorParams::new(kind)
        .normalizer(normalizer)
        .check()?
        .build(gp, tanh)
}

impl<F: Float, T> Predictor<F, T> {
    fn name(&self) -> &'static str {
        match self {
            Predictor::Standard(_) => "Standard",
            Predictor::Warped(_) => "Warped",
        }
    }

    /// Whether the output space is warped
    pub fn is_warped(&self) -> bool {
        matches!(self, Predictor::Warped(_))
    }

    /// Predict mean values in latent space (normalized outputs) at n given `x` points
    /// of nx components specified as a (n, nx) matrix. Returns a (n, 1) matrix.
    pub fn predict_mu_latent(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        match self {
            Predictor::Standard(gp) => gp.predict_mu_latent(x),
            Predictor::Warped(gp) => gp.predict_mu_latent(x),
        }
    }

    /// Predict covariance matrix at n given `x` points, in observation space when
    /// standard, in latent space when warped (see [WarpedPredictor::predict_cov]).
    pub fn predict_cov(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        match self {
            Predictor::Standard(gp) => gp.predict_cov(x),
            Predictor::Warped(gp) => gp.predict_cov(x),
        }
    }

    /// Save predictions at `x` points in `dir` as numpy files, latent ones when warped
    /// (see [WarpedPredictor::write_plot_data]).
    pub fn write_plot_data(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        dir: impl AsRef<Path>,
    ) -> Result<()>
    where
        F: ndarray_npy::WritableElement,
    {
        match self {
            Predictor::Standard(gp) => gp.write_plot_data(x, dir),
            Predictor::Warped(gp) => gp.write_plot_data(x, dir),
        }
    }
}
