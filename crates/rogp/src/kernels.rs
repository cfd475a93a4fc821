//! A module for the stationary kernels used to evaluate GP posterior covariances.
//!
//! The following kernels are implemented:
//! * squared exponential (a.k.a. RBF),
//! * absolute exponential,
//! * matern 3/2,
//! * matern 5/2.
//!
//! All kernels are expressed with the scaled distance `r = |x - x'| / lengthscale`
//! and the process `variance` as amplitude.

use crate::errors::{Result, RogpError};
use crate::utils::scaled_distances;
use linfa::Float;
use ndarray::{Array2, ArrayBase, Data, Ix2};
use std::fmt;
use std::str::FromStr;

/// The closed set of supported kernels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KernelKind {
    /// `variance * exp(-r^2 / 2)`
    #[default]
    SquaredExponential,
    /// `variance * exp(-r)`
    AbsoluteExponential,
    /// `variance * (1 + sqrt(3) r) * exp(-sqrt(3) r)`
    Matern32,
    /// `variance * (1 + sqrt(5) r + 5/3 r^2) * exp(-sqrt(5) r)`
    Matern52,
}

impl KernelKind {
    /// Kernel value given a scaled distance `r`
    fn value<F: Float>(&self, r: F, variance: F) -> F {
        match self {
            KernelKind::SquaredExponential => variance * F::exp(F::cast(-0.5) * r * r),
            KernelKind::AbsoluteExponential => variance * F::exp(-r),
            KernelKind::Matern32 => {
                let sqrt3_r = F::cast(3.).sqrt() * r;
                variance * (F::one() + sqrt3_r) * F::exp(-sqrt3_r)
            }
            KernelKind::Matern52 => {
                let sqrt5_r = F::cast(5.).sqrt() * r;
                variance * (F::one() + sqrt5_r + F::cast(5. / 3.) * r * r) * F::exp(-sqrt5_r)
            }
        }
    }
}

impl FromStr for KernelKind {
    type Err = RogpError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RBF" | "SquaredExponential" => Ok(KernelKind::SquaredExponential),
            "Exponential" | "AbsoluteExponential" => Ok(KernelKind::AbsoluteExponential),
            "Matern32" => Ok(KernelKind::Matern32),
            "Matern52" => Ok(KernelKind::Matern52),
            _ => Err(RogpError::UnsupportedKernel(s.to_string())),
        }
    }
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            KernelKind::SquaredExponential => "SquaredExponential",
            KernelKind::AbsoluteExponential => "AbsoluteExponential",
            KernelKind::Matern32 => "Matern32",
            KernelKind::Matern52 => "Matern52",
        };
        write!(f, "{name}")
    }
}

/// A kernel instance with its hyperparameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Kernel<F: Float> {
    kind: KernelKind,
    lengthscale: F,
    variance: F,
}

impl<F: Float> Kernel<F> {
    /// Constructor, `lengthscale` and `variance` have to be strictly positive
    pub fn new(kind: KernelKind, lengthscale: F, variance: F) -> Result<Self> {
        if !(lengthscale > F::zero()) {
            return Err(RogpError::InvalidValue(format!(
                "kernel lengthscale should be strictly positive, got {lengthscale}"
            )));
        }
        if !(variance > F::zero()) {
            return Err(RogpError::InvalidValue(format!(
                "kernel variance should be strictly positive, got {variance}"
            )));
        }
        Ok(Kernel {
            kind,
            lengthscale,
            variance,
        })
    }

    /// Kernel kind
    pub fn kind(&self) -> KernelKind {
        self.kind
    }

    /// Kernel lengthscale
    pub fn lengthscale(&self) -> F {
        self.lengthscale
    }

    /// Kernel variance
    pub fn variance(&self) -> F {
        self.variance
    }

    /// Compute covariance matrix k(a, b) of shape (nrows(a), nrows(b))
    /// between two point sets given as (m, nx) and (n, nx) matrices.
    pub fn covariance(
        &self,
        a: &ArrayBase<impl Data<Elem = F>, Ix2>,
        b: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F> {
        scaled_distances(a, b, self.lengthscale).mapv(|r| self.kind.value(r, self.variance))
    }
}

impl<F: Float> fmt::Display for Kernel<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}(lengthscale={}, variance={})",
            self.kind, self.lengthscale, self.variance
        )
    }
}
