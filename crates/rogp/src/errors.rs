use thiserror::Error;

/// A result type for GP predictors
pub type Result<T> = std::result::Result<T, RogpError>;

/// An error when building or using a [`StandardPredictor`](crate::StandardPredictor)
/// or a [`WarpedPredictor`](crate::WarpedPredictor)
#[derive(Error, Debug)]
pub enum RogpError {
    /// When the requested kernel is not part of the registry
    #[error("Kernel {0} is not implemented")]
    UnsupportedKernel(String),
    /// When the warping function cannot be inverted within the given bracket
    #[error("Failed to find root of warp(y) = {target} in [{lower}, {upper}]")]
    RootNotFound {
        /// Latent value to be inverted
        target: f64,
        /// Lower bound of the bracket (normalized units)
        lower: f64,
        /// Upper bound of the bracket (normalized units)
        upper: f64,
    },
    /// When the warping coefficients are malformed
    #[error("Invalid warping function: {0}")]
    InvalidWarping(String),
    /// When error due to a bad value
    #[error("InvalidValue error: {0}")]
    InvalidValue(String),
    /// When array shapes are not compatible
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
    #[error(transparent)]
    /// When linear algebra computation fails
    LinalgError(#[from] linfa_linalg::LinalgError),
    /// When a linfa error occurs
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
    /// When the argmin root finder fails
    #[error(transparent)]
    ArgminError(#[from] argmin::core::Error),
    /// When IO fails
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    /// When numpy array write fails
    #[error("IO error")]
    WriteNpyError(#[from] ndarray_npy::WriteNpyError),
}
