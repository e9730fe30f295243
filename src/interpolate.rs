//! Thin layer over `ndarray-interp` shared by the aerofoil builder and the rotor solution.

use log::debug;
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, ArrayView2, Data, Ix1};
use ndarray_interp::interp1d::{Interp1D, Linear};

use crate::aerofoil::AerofoilBuildError;

pub(crate) trait StrictlyRising {
    /// every element is greater than its predecessor
    fn is_strictly_rising(&self) -> bool;
}

impl<S, T> StrictlyRising for ArrayBase<S, Ix1>
where
    S: Data<Elem = T>,
    T: PartialOrd,
{
    fn is_strictly_rising(&self) -> bool {
        self.len() > 1 && self.windows(2).into_iter().all(|pair| pair[0] < pair[1])
    }
}

/// Resample the columns of `data`, sampled at the strictly rising `x`, onto `grid`.
///
/// Values outside of the sampled range are extended linearly.
pub(crate) fn resample(
    x: ArrayView1<f64>,
    data: ArrayView2<f64>,
    grid: &Array1<f64>,
) -> Result<Array2<f64>, AerofoilBuildError> {
    let resampled = Interp1D::builder(data)
        .x(x)
        .strategy(Linear::new().extrapolate(true))
        .build()?
        .interp_array(grid)?;
    Ok(resampled)
}

/// Linear interpolation of `y(x)` at `at`, extended linearly outside of `x`.
///
/// A query on one of the nodes returns the stored value unchanged, NaN yields NaN.
pub(crate) fn linear_at(x: ArrayView1<f64>, y: ArrayView1<f64>, at: f64) -> f64 {
    if at.is_nan() {
        return f64::NAN;
    }
    if let Some(idx) = x.iter().position(|&node| node == at) {
        return y[idx];
    }
    // extrapolation is enabled, a failure means `x` is not usable as a grid
    match Interp1D::new_unchecked(x, y, Linear::new().extrapolate(true)).interp_scalar(at) {
        Ok(value) => value,
        Err(err) => {
            debug!("interpolation at {at} failed: {err:?}");
            f64::NAN
        }
    }
}
