use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2};

/// Computes column mean and standard deviation of `x` (n, nx).
/// A null standard deviation is replaced by one so that the affine map stays invertible.
pub fn mean_std<F: Float>(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> (Array1<F>, Array1<F>) {
    let x_mean = x
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(x.ncols()));
    let mut x_std = if x.nrows() > 1 {
        x.std_axis(Axis(0), F::one())
    } else {
        Array1::ones(x.ncols())
    };
    x_std.mapv_inplace(|v| if v == F::zero() { F::one() } else { v });
    (x_mean, x_std)
}

/// Computes euclidean distances between each row of `x` and each row of `y`
/// divided by `lengthscale`, resulting in a 2d array of shape (nrows(x), nrows(y)).
/// *Panics* if x and y have not the same column numbers
pub fn scaled_distances<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    lengthscale: F,
) -> Array2<F> {
    assert!(x.ncols() == y.ncols());

    let mut result = Array2::zeros((x.nrows(), y.nrows()));
    for (i, x_row) in x.rows().into_iter().enumerate() {
        for (j, y_row) in y.rows().into_iter().enumerate() {
            let d2 = x_row
                .iter()
                .zip(y_row.iter())
                .fold(F::zero(), |acc, (&a, &b)| acc + (a - b) * (a - b));
            result[[i, j]] = d2.sqrt() / lengthscale;
        }
    }
    result
}
