use egobox_rogp::{
    from_trained, ConstraintSet, Expr, GpPosterior, KernelKind, Normalizer, Predictor, Result,
    Symbolic, WarpingFunction, ROGP_LOG,
};
use env_logger::{Builder, Env};
use linfa::prelude::{Dataset, Fit};
use ndarray::{array, Array1, Array2, Axis};

fn xsinx(x: &Array2<f64>) -> Array2<f64> {
    (x - 3.5) * ((x - 3.5) / 2.).mapv(|v| v.sin())
}

fn main() -> Result<()> {
    let env = Env::new().filter_or(ROGP_LOG, "info");
    let mut builder = Builder::from_env(env);
    let builder = builder.target(env_logger::Target::Stdout);
    builder.try_init().ok();

    let xt = array![[0.0], [2.0], [3.0], [4.0], [6.0], [7.5], [9.0], [10.0]];
    let yt = xsinx(&xt);
    let normalizer = Normalizer::standardize(&xt, &yt)?;
    let xnorm = normalizer.x.normalize(&xt)?;
    let ynorm = normalizer.y.normalize(&yt)?.remove_axis(Axis(1));

    let warping = WarpingFunction::new(1.0, &array![[0.6, 1.8, 0.3], [0.2, 4.0, -1.0]])?;
    let gp = GpPosterior::params(KernelKind::Matern52)
        .lengthscale(0.6)
        .noise_variance(1e-8)
        .warping(Some(warping))
        .fit(&Dataset::new(xnorm, ynorm))?;

    let predictor = from_trained(&gp, "Matern52", normalizer, Symbolic)?;
    let warped = match &predictor {
        Predictor::Warped(warped) => warped,
        Predictor::Standard(_) => unreachable!("GP is trained with a warping function"),
    };

    // y0 and y1 are decision variables of the optimization model
    let x = array![[1.0], [8.2]];
    let y = array![[Expr::var(0)], [Expr::var(1)]];
    let mut constraints = ConstraintSet::new();
    warped.predict_mu(&x, &y, &mut constraints)?;
    for c in constraints.iter() {
        println!("{} == 0", c.expr());
    }

    // a feasible point is given by inverting latent means
    let z = warped.predict_mu_latent(&x)?.remove_axis(Axis(1));
    let ystar: Array1<f64> = warped.try_warp_inv(&z)?;
    let ytrue = xsinx(&x).remove_axis(Axis(1));
    println!("y* = {ystar} (true {ytrue})");
    println!("residuals = {}", constraints.residuals(&ystar)?);
    println!("latent variances = {}", predictor.predict_cov(&x)?.diag());

    let xplot = Array1::linspace(0., 10., 101).insert_axis(Axis(1));
    warped.write_plot_data(&xplot, "target/rogp")?;
    Ok(())
}
