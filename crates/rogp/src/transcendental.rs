//! Elementwise function providers used by the warping algebra.
//!
//! The warping function is evaluated either on numbers (root finding, derivatives)
//! or on expressions of an optimization model (constraints). The predictor is given
//! a provider at construction and stays agnostic of the evaluation context.

use crate::expression::Expr;
use linfa::Float;
use std::ops::{Add, Mul, Sub};

/// Values which can flow through the warping function algebra:
/// numbers `F` themselves or expressions built upon decision variables.
pub trait Operand<F: Float>:
    Clone
    + Add<Output = Self>
    + Sub<Output = Self>
    + Add<F, Output = Self>
    + Sub<F, Output = Self>
    + Mul<F, Output = Self>
{
}

impl<F: Float, T> Operand<F> for T where
    T: Clone
        + Add<Output = T>
        + Sub<Output = T>
        + Add<F, Output = T>
        + Sub<F, Output = T>
        + Mul<F, Output = T>
{
}

/// A provider of transcendental functions applicable to values of type `E`
pub trait Transcendental<E> {
    /// Hyperbolic tangent
    fn tanh(&self, value: E) -> E;
}

/// Plain numeric evaluation, only applicable to numbers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Numeric;

impl<F: Float> Transcendental<F> for Numeric {
    fn tanh(&self, value: F) -> F {
        value.tanh()
    }
}

/// Evaluation compatible with model expressions: builds `tanh` nodes for [Expr]
/// and falls back to numeric evaluation for numbers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Symbolic;

impl<F: Float> Transcendental<F> for Symbolic {
    fn tanh(&self, value: F) -> F {
        value.tanh()
    }
}

impl<F: Float> Transcendental<Expr<F>> for Symbolic {
    fn tanh(&self, value: Expr<F>) -> Expr<F> {
        value.tanh()
    }
}
