//! A minimal algebraic modeling layer.
//!
//! GP predictions are coupled to an optimization model through expressions
//! over decision variables and constraints appended to a caller-owned container.
//! [Expr] is a small expression graph (enough to express warped GP constraints)
//! and [ConstraintSet] a reference container: an actual optimization backend
//! only has to provide its own expression type with the arithmetic required by
//! [Operand](crate::Operand) and implement [ConstraintSink].

use crate::errors::{Result, RogpError};
use linfa::Float;
use ndarray::{Array1, ArrayBase, Data, Ix1};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// An algebraic expression over decision variables indexed by position
#[derive(Clone, Debug, PartialEq)]
pub enum Expr<F: Float> {
    /// Constant value
    Const(F),
    /// Decision variable referenced by its index
    Var(usize),
    /// Sum of two expressions
    Add(Box<Expr<F>>, Box<Expr<F>>),
    /// Difference of two expressions
    Sub(Box<Expr<F>>, Box<Expr<F>>),
    /// Product of two expressions
    Mul(Box<Expr<F>>, Box<Expr<F>>),
    /// Opposite of an expression
    Neg(Box<Expr<F>>),
    /// Hyperbolic tangent of an expression
    Tanh(Box<Expr<F>>),
}

impl<F: Float> Expr<F> {
    /// Decision variable `index`
    pub fn var(index: usize) -> Self {
        Expr::Var(index)
    }

    /// Constant expression
    pub fn constant(value: F) -> Self {
        Expr::Const(value)
    }

    /// Hyperbolic tangent of this expression
    pub fn tanh(self) -> Self {
        match self {
            Expr::Const(c) => Expr::Const(c.tanh()),
            e => Expr::Tanh(Box::new(e)),
        }
    }

    fn is_const(&self, value: F) -> bool {
        matches!(self, Expr::Const(c) if *c == value)
    }

    /// Evaluate the expression given decision variable `values`
    pub fn eval(&self, values: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<F> {
        let v = match self {
            Expr::Const(c) => *c,
            Expr::Var(i) => *values.get(*i).ok_or_else(|| {
                RogpError::InvalidValue(format!(
                    "variable index {i} out of bounds (got {} values)",
                    values.len()
                ))
            })?,
            Expr::Add(a, b) => a.eval(values)? + b.eval(values)?,
            Expr::Sub(a, b) => a.eval(values)? - b.eval(values)?,
            Expr::Mul(a, b) => a.eval(values)? * b.eval(values)?,
            Expr::Neg(a) => -a.eval(values)?,
            Expr::Tanh(a) => a.eval(values)?.tanh(),
        };
        Ok(v)
    }

    /// Symbolic derivative of the expression with respect to variable `index`
    pub fn diff(&self, index: usize) -> Expr<F> {
        match self {
            Expr::Const(_) => Expr::Const(F::zero()),
            Expr::Var(i) if *i == index => Expr::Const(F::one()),
            Expr::Var(_) => Expr::Const(F::zero()),
            Expr::Add(a, b) => a.diff(index) + b.diff(index),
            Expr::Sub(a, b) => a.diff(index) - b.diff(index),
            Expr::Mul(a, b) => {
                a.diff(index) * b.as_ref().clone() + a.as_ref().clone() * b.diff(index)
            }
            Expr::Neg(a) => -a.diff(index),
            // d tanh(u) = (1 - tanh(u)^2) du
            Expr::Tanh(a) => {
                let t = self.clone();
                (Expr::Const(F::one()) - t.clone() * t) * a.diff(index)
            }
        }
    }
}

impl<F: Float> From<F> for Expr<F> {
    fn from(value: F) -> Self {
        Expr::Const(value)
    }
}

impl<F: Float> Add for Expr<F> {
    type Output = Expr<F>;

    fn add(self, rhs: Expr<F>) -> Expr<F> {
        match (self, rhs) {
            (Expr::Const(a), Expr::Const(b)) => Expr::Const(a + b),
            (a, b) if b.is_const(F::zero()) => a,
            (a, b) if a.is_const(F::zero()) => b,
            (a, b) => Expr::Add(Box::new(a), Box::new(b)),
        }
    }
}

impl<F: Float> Sub for Expr<F> {
    type Output = Expr<F>;

    fn sub(self, rhs: Expr<F>) -> Expr<F> {
        match (self, rhs) {
            (Expr::Const(a), Expr::Const(b)) => Expr::Const(a - b),
            (a, b) if b.is_const(F::zero()) => a,
            (a, b) if a.is_const(F::zero()) => -b,
            (a, b) => Expr::Sub(Box::new(a), Box::new(b)),
        }
    }
}

impl<F: Float> Mul for Expr<F> {
    type Output = Expr<F>;

    fn mul(self, rhs: Expr<F>) -> Expr<F> {
        match (self, rhs) {
            (Expr::Const(a), Expr::Const(b)) => Expr::Const(a * b),
            (a, b) if a.is_const(F::zero()) || b.is_const(F::zero()) => Expr::Const(F::zero()),
            (a, b) if b.is_const(F::one()) => a,
            (a, b) if a.is_const(F::one()) => b,
            (a, b) => Expr::Mul(Box::new(a), Box::new(b)),
        }
    }
}

impl<F: Float> Neg for Expr<F> {
    type Output = Expr<F>;

    fn neg(self) -> Expr<F> {
        match self {
            Expr::Const(c) => Expr::Const(-c),
            Expr::Neg(e) => *e,
            e => Expr::Neg(Box::new(e)),
        }
    }
}

impl<F: Float> Add<F> for Expr<F> {
    type Output = Expr<F>;

    fn add(self, rhs: F) -> Expr<F> {
        self + Expr::Const(rhs)
    }
}

impl<F: Float> Sub<F> for Expr<F> {
    type Output = Expr<F>;

    fn sub(self, rhs: F) -> Expr<F> {
        self - Expr::Const(rhs)
    }
}

impl<F: Float> Mul<F> for Expr<F> {
    type Output = Expr<F>;

    fn mul(self, rhs: F) -> Expr<F> {
        self * Expr::Const(rhs)
    }
}

impl<F: Float> fmt::Display for Expr<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Const(c) => write!(f, "{c}"),
            Expr::Var(i) => write!(f, "y[{i}]"),
            Expr::Add(a, b) => write!(f, "({a} + {b})"),
            Expr::Sub(a, b) => write!(f, "({a} - {b})"),
            Expr::Mul(a, b) => write!(f, "{a}*{b}"),
            Expr::Neg(a) => write!(f, "-{a}"),
            Expr::Tanh(a) => write!(f, "tanh({a})"),
        }
    }
}

/// A constraint on an expression compared to zero
#[derive(Clone, Debug, PartialEq)]
pub enum Constraint<E> {
    /// `expr == 0`
    Equal(E),
    /// `expr <= 0`
    LessEqual(E),
}

impl<E> Constraint<E> {
    /// The constrained expression
    pub fn expr(&self) -> &E {
        match self {
            Constraint::Equal(e) | Constraint::LessEqual(e) => e,
        }
    }
}

/// A container of constraints owned by the optimization model
pub trait ConstraintSink<E> {
    /// Append a constraint
    fn add(&mut self, constraint: Constraint<E>);
}

impl<E> ConstraintSink<E> for Vec<Constraint<E>> {
    fn add(&mut self, constraint: Constraint<E>) {
        self.push(constraint);
    }
}

/// A list of constraints
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConstraintSet<E> {
    constraints: Vec<Constraint<E>>,
}

impl<E> ConstraintSet<E> {
    /// Empty set of constraints
    pub fn new() -> Self {
        ConstraintSet {
            constraints: Vec::new(),
        }
    }

    /// Number of constraints
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Whether no constraint has been added
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Iterate over constraints in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Constraint<E>> {
        self.constraints.iter()
    }
}

impl<E> ConstraintSink<E> for ConstraintSet<E> {
    fn add(&mut self, constraint: Constraint<E>) {
        self.constraints.push(constraint);
    }
}

impl<F: Float> ConstraintSet<Expr<F>> {
    /// Values of constrained expressions given decision variable `values`
    pub fn residuals(&self, values: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<Array1<F>> {
        self.constraints
            .iter()
            .map(|c| c.expr().eval(values))
            .collect::<Result<Vec<F>>>()
            .map(Array1::from)
    }

    /// Check constraints are satisfied by `values` up to `tol`
    pub fn is_satisfied(
        &self,
        values: &ArrayBase<impl Data<Elem = F>, Ix1>,
        tol: F,
    ) -> Result<bool> {
        for c in self.constraints.iter() {
            let v = c.expr().eval(values)?;
            let ok = match c {
                Constraint::Equal(_) => v.abs() <= tol,
                Constraint::LessEqual(_) => v <= tol,
            };
            if !ok {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_eval() {
        // 2*y0 + tanh(y1 - 1)
        let e = Expr::var(0) * 2. + (Expr::var(1) - 1.).tanh();
        assert_abs_diff_eq!(
            e.eval(&array![0.5, 3.]).unwrap(),
            1. + f64::tanh(2.),
            epsilon = 1e-15
        );
        assert!(e.eval(&array![0.5]).is_err());
    }

    #[test]
    fn test_constant_folding() {
        let e = Expr::<f64>::constant(2.) * Expr::constant(3.) + 1.;
        assert_eq!(Expr::Const(7.), e);
        assert_eq!(Expr::<f64>::var(2), Expr::var(2) * 1. + 0.);
        assert_eq!(Expr::Const(0.), Expr::<f64>::var(0) * 0.);
        assert_eq!(Expr::Const(f64::tanh(0.5)), Expr::constant(0.5).tanh());
    }

    #[test]
    fn test_diff() {
        // d/dy0 [3*y0*y1 + tanh(2*y0)] = 3*y1 + 2*(1 - tanh(2*y0)^2)
        let e = Expr::var(0) * 3. * Expr::var(1) + (Expr::var(0) * 2.).tanh();
        let de = e.diff(0);
        let (y0, y1) = (0.3, -1.2);
        let t = f64::tanh(2. * y0);
        assert_abs_diff_eq!(
            de.eval(&array![y0, y1]).unwrap(),
            3. * y1 + 2. * (1. - t * t),
            epsilon = 1e-14
        );
        assert_eq!(Expr::Const(0.), e.diff(5));
    }

    #[test]
    fn test_constraint_set() {
        let mut cons = ConstraintSet::new();
        assert!(cons.is_empty());
        cons.add(Constraint::Equal(Expr::var(0) - 1.));
        cons.add(Constraint::LessEqual(Expr::var(1) - 2.));
        assert_eq!(2, cons.len());
        assert_abs_diff_eq!(
            cons.residuals(&array![1.5, 0.]).unwrap(),
            array![0.5, -2.],
            epsilon = 1e-15
        );
        assert!(cons.is_satisfied(&array![1., 1.], 1e-9).unwrap());
        assert!(!cons.is_satisfied(&array![1., 3.], 1e-9).unwrap());
    }

    #[test]
    fn test_display() {
        let e = (Expr::var(0) + 1.).tanh() * 0.5;
        assert_eq!("tanh((y[0] + 1))*0.5", e.to_string());
    }
}
