//! Invertible transforms applied to GP inputs and outputs before and after
//! posterior computations for numerical conditioning.

use crate::errors::{Result, RogpError};
use crate::transcendental::Operand;
use crate::utils::mean_std;
use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2, Zip};

/// A columnwise invertible transform `normalized = (value - offset) / scale`
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Scaler<F: Float> {
    /// No-op transform
    #[default]
    Identity,
    /// Affine transform with one (offset, scale) couple per column
    Affine {
        /// Offset vector
        offset: Array1<F>,
        /// Scale vector (non-zero components)
        scale: Array1<F>,
    },
}

impl<F: Float> Scaler<F> {
    /// Identity transform
    pub fn identity() -> Self {
        Scaler::Identity
    }

    /// Affine transform given `offset` and `scale` vectors of the same length
    pub fn affine(offset: Array1<F>, scale: Array1<F>) -> Result<Self> {
        if offset.len() != scale.len() || offset.is_empty() {
            return Err(RogpError::DimensionMismatch(format!(
                "offset ({}) and scale ({}) should have the same non null length",
                offset.len(),
                scale.len()
            )));
        }
        if scale.iter().any(|s| *s == F::zero() || !s.is_finite()) {
            return Err(RogpError::InvalidValue(
                "scale components should be finite and non zero".to_string(),
            ));
        }
        Ok(Scaler::Affine { offset, scale })
    }

    /// Transform to zero mean and unit standard deviation with regard to `data` columns
    pub fn standardize(data: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Self> {
        let (mean, std) = mean_std(data);
        Self::affine(mean, std)
    }

    /// Transform mapping `data` columns bounds to [0, 1]
    pub fn min_max(data: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Self> {
        let min = |m: F, v: F| if v < m { v } else { m };
        let max = |m: F, v: F| if v > m { v } else { m };
        let lower = data.fold_axis(Axis(0), F::infinity(), |&m, &v| min(m, v));
        let upper = data.fold_axis(Axis(0), F::neg_infinity(), |&m, &v| max(m, v));
        let mut range = &upper - &lower;
        range.mapv_inplace(|v| if v == F::zero() { F::one() } else { v });
        Self::affine(lower, range)
    }

    /// Number of columns handled by the transform, `None` when any is accepted
    pub fn dim(&self) -> Option<usize> {
        match self {
            Scaler::Identity => None,
            Scaler::Affine { offset, .. } => Some(offset.len()),
        }
    }

    fn check_ncols(&self, ncols: usize) -> Result<()> {
        match self.dim() {
            Some(d) if d != ncols => Err(RogpError::DimensionMismatch(format!(
                "transform of dimension {d} applied to {ncols} columns"
            ))),
            _ => Ok(()),
        }
    }

    /// Forward transform of values given as (n, ncols) matrix
    pub fn normalize(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        self.check_ncols(x.ncols())?;
        Ok(match self {
            Scaler::Identity => x.to_owned(),
            Scaler::Affine { offset, scale } => (x - offset) / scale,
        })
    }

    /// Forward transform of operands (numbers or model expressions) given as (n, ncols) matrix
    pub fn normalize_operands<E: Operand<F>>(&self, x: &Array2<E>) -> Result<Array2<E>> {
        self.check_ncols(x.ncols())?;
        Ok(match self {
            Scaler::Identity => x.to_owned(),
            Scaler::Affine { offset, scale } => {
                let mut xnorm = x.to_owned();
                for mut row in xnorm.rows_mut() {
                    Zip::from(&mut row)
                        .and(offset)
                        .and(scale)
                        .for_each(|v, &o, &s| *v = (v.clone() - o) * (F::one() / s));
                }
                xnorm
            }
        })
    }

    /// Forward transform of a scalar bracket (only for one-dimensional transforms)
    pub fn normalize_bounds(&self, bounds: (F, F)) -> Result<(F, F)> {
        let b = Array2::from_shape_fn((2, 1), |(i, _)| if i == 0 { bounds.0 } else { bounds.1 });
        let b = self.normalize(&b)?;
        Ok((b[[0, 0]], b[[1, 0]]))
    }

    /// Inverse transform of mean values given as (n, ncols) matrix
    pub fn inverse_mean(&self, y: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        self.check_ncols(y.ncols())?;
        Ok(match self {
            Scaler::Identity => y.to_owned(),
            Scaler::Affine { offset, scale } => y * scale + offset,
        })
    }

    fn variance_factor(&self) -> Result<F> {
        match self {
            Scaler::Identity => Ok(F::one()),
            Scaler::Affine { scale, .. } if scale.len() == 1 => Ok(scale[0] * scale[0]),
            Scaler::Affine { scale, .. } => Err(RogpError::DimensionMismatch(format!(
                "variance transform requires a one-dimensional output transform, got {}",
                scale.len()
            ))),
        }
    }

    /// Forward transform of a (co)variance matrix of one-dimensional values
    pub fn normalize_variance(&self, v: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        let factor = self.variance_factor()?;
        Ok(v.mapv(|v| v / factor))
    }

    /// Inverse transform of a (co)variance matrix of one-dimensional values
    pub fn inverse_variance(&self, v: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        let factor = self.variance_factor()?;
        Ok(v.mapv(|v| v * factor))
    }
}

/// A pair of input and output transforms
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Normalizer<F: Float> {
    /// Input space transform
    pub x: Scaler<F>,
    /// Output space transform
    pub y: Scaler<F>,
}

impl<F: Float> Normalizer<F> {
    /// Constructor, output transform has to be one-dimensional
    pub fn new(x: Scaler<F>, y: Scaler<F>) -> Result<Self> {
        if let Some(d) = y.dim() {
            if d != 1 {
                return Err(RogpError::DimensionMismatch(format!(
                    "output transform should be one-dimensional, got {d}"
                )));
            }
        }
        Ok(Normalizer { x, y })
    }

    /// Identity transforms for both input and output
    pub fn identity() -> Self {
        Normalizer::default()
    }

    /// Standardization transforms computed from training inputs `xt` and outputs `yt`
    pub fn standardize(
        xt: &ArrayBase<impl Data<Elem = F>, Ix2>,
        yt: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Self> {
        Self::new(Scaler::standardize(xt)?, Scaler::standardize(yt)?)
    }
}
