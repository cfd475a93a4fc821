//! This library embeds a trained [Gaussian Process](https://en.wikipedia.org/wiki/Gaussian_process)
//! regression model as a predictive surrogate within an optimization model.
//!
//! GP posterior mean and covariance are evaluated in closed form from the posterior
//! quantities of a trained GP (see [TrainedGp]) with a kernel selected by name
//! among [KernelKind] variants.
//!
//! * [StandardPredictor] computes mean and covariance predictions of a GP whose output
//! space is untransformed.
//! * [WarpedPredictor] handles GP trained in a latent space related to the observation
//! space through a monotonic [WarpingFunction]. Mean prediction is expressed as an
//! equality constraint `warp(y) - mu_latent(x) = 0` appended to a constraint container
//! (see [ConstraintSink]) where `y` is an expression over decision variables ([Expr]),
//! and the warping function can be inverted numerically with a bracketing root finder.
//!
//! [Predictor] is built from a trained GP with [PredictorParams] or [from_trained]
//! and dispatches to the relevant variant depending on whether the GP is warped.
//!
//! Inputs and outputs may be scaled with a [Normalizer].
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod errors;
mod expression;
pub mod kernels;
mod normalizer;
mod parameters;
mod posterior;
mod predictor;
mod standard;
mod transcendental;
mod utils;
mod warped;
mod warping;

pub use errors::*;
pub use expression::*;
pub use kernels::KernelKind;
pub use normalizer::*;
pub use parameters::*;
pub use posterior::*;
pub use predictor::*;
pub use standard::*;
pub use transcendental::*;
pub use warped::*;
pub use warping::*;

/// Env variable to enable logging feature (e.g. `ROGP_LOG=debug`)
pub const ROGP_LOG: &str = "ROGP_LOG";
