use std::f64::consts::PI;

use itertools::Itertools;
use log::debug;
use ndarray::{
    s, stack, Array, Array1, Array2, ArrayBase, ArrayView2, Axis, Data, DataMut, Ix1, ShapeError,
};
use ndarray_interp::{
    interp2d::{Biliniar, Interp2D, Interp2DVec},
    BuilderError, InterpolateError,
};
use thiserror::Error;

use crate::{
    interpolate::{self, StrictlyRising},
    rot_vec,
};

/// Aspect ratios at or above this value are treated as infinite.
const INFINITE_ASPECT_RATIO: f64 = 98.0;

/// Last angle of attack (degrees) synthesized above the stall point.
const POST_STALL_END_DEG: i32 = 90;

/// Coefficient of lift and drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClCd([f64; 2]);

impl AsRef<[f64; 2]> for ClCd {
    fn as_ref(&self) -> &[f64; 2] {
        &self.0
    }
}

impl ClCd {
    pub fn new(cl: f64, cd: f64) -> Self {
        ClCd([cl, cd])
    }

    /// Coefficient of lift
    pub fn cl(&self) -> f64 {
        self.0[0]
    }

    /// Coefficient of drag
    pub fn cd(&self) -> f64 {
        self.0[1]
    }

    /// Convert the coefficients to normal and tangential turbine coordinates.
    ///
    /// - `alpha` the angle of attack of the foil
    /// - `beta` the pitch angle from the turbine tangent to the chord
    ///
    /// Returns `(normal coefficient, tangential coefficient)`. Drag acts along the
    /// relative wind, a positive tangential coefficient drives the rotor.
    pub fn to_tangential(self, alpha: f64, beta: f64) -> (f64, f64) {
        let [c_n, c_t] = rot_vec([self.cl(), -self.cd()], alpha - beta);
        (c_n, c_t)
    }

    /// Convert the coefficients to the global turbine coordinates.
    ///
    /// - `alpha` the angle of attack of the foil
    /// - `beta` the pitch angle from the turbine tangent to the chord
    /// - `theta` the position of the foil on the turbine
    ///
    /// Returns `(x coefficient, y coefficient)`
    pub fn to_global(self, alpha: f64, beta: f64, theta: f64) -> (f64, f64) {
        let (c_n, c_t) = self.to_tangential(alpha, beta);
        let [c_x, c_y] = rot_vec([c_n, c_t], theta);
        (c_x, c_y)
    }
}

/// An Aerofoil implemented using a LUT over angle of attack and Reynolds number.
///
/// Once built the aerofoil is read only and can be shared between any number of solvers.
#[derive(Debug)]
pub struct Aerofoil {
    lut: Interp2DVec<f64, Biliniar>,
    alpha_range: [f64; 2],
    re_range: [f64; 2],
    symmetric: bool,
}

impl Aerofoil {
    pub fn builder() -> AerofoilBuilder {
        AerofoilBuilder::new()
    }

    /// The coefficient of lift and drag ([`ClCd`]) at the given angle of attack (radians)
    /// and Reynolds number.
    ///
    /// Queries outside of the data are clamped to the nearest edge of the table.
    /// For symmetric profiles negative angles are mirrored.
    pub fn cl_cd(&self, alpha: f64, re: f64) -> ClCd {
        if alpha.is_nan() || re.is_nan() {
            return ClCd::new(f64::NAN, f64::NAN);
        }
        if self.symmetric {
            let sign = if alpha < 0.0 { -1.0 } else { 1.0 };
            let [cl, cd] = self.lookup(alpha.abs(), re);
            ClCd::new(sign * cl, cd)
        } else {
            let [cl, cd] = self.lookup(alpha, re);
            ClCd::new(cl, cd)
        }
    }

    pub fn is_symmetric(&self) -> bool {
        self.symmetric
    }

    fn lookup(&self, alpha: f64, re: f64) -> [f64; 2] {
        let alpha = alpha.clamp(self.alpha_range[0], self.alpha_range[1]);
        let re = re.clamp(self.re_range[0], self.re_range[1]);
        // the query is clamped into the table, an error here is a malformed LUT
        match self.lut.interp(alpha, re) {
            Ok(clcd) => [clcd[0], clcd[1]],
            Err(err) => {
                debug!("lookup at alpha = {alpha}, re = {re} failed: {err:?}");
                [f64::NAN, f64::NAN]
            }
        }
    }
}

/// Profile data for a single Reynolds number, rows of `[alpha, cl, cd]` with alpha in radians.
#[derive(Debug, Clone)]
struct Polar {
    re: f64,
    data: Array2<f64>,
}

impl Polar {
    /// Correct the profile data of an infinite wing for the given aspect ratio.
    ///
    /// Below the stall point the Lanchester-Prandtl model is applied, above it the data
    /// is replaced with the Viterna-Corrigan model for every degree up to 90°.
    /// The first sample is not corrected.
    fn with_aspect_ratio(&self, aspect_ratio: f64) -> Result<Polar, AerofoilBuildError> {
        let stall_idx = self
            .data
            .column(1)
            .windows(2)
            .into_iter()
            .position(|cl| cl[0] > cl[1])
            .ok_or(AerofoilBuildError::StallNotFound(self.re))?;

        // the lowest sample is left as measured
        let mut below_stall = self.data.slice(s![..=stall_idx, ..]).to_owned();
        for mut datapoint in below_stall.rows_mut().into_iter().skip(1) {
            datapoint.lanchester_prandtl(aspect_ratio);
        }
        let stall = below_stall.row(stall_idx).to_owned();

        let first_deg = stall.a().to_degrees().floor() as i32 + 1;
        let n_post_stall = (POST_STALL_END_DEG - first_deg + 1).max(0) as usize;

        let mut data = Array2::zeros((stall_idx + 1 + n_post_stall, 3));
        data.slice_mut(s![..=stall_idx, ..]).assign(&below_stall);
        for (mut datapoint, deg) in data
            .slice_mut(s![stall_idx + 1.., ..])
            .rows_mut()
            .into_iter()
            .zip(first_deg..)
        {
            datapoint[0] = f64::from(deg).to_radians();
            datapoint.viterna_corrigan(&stall, aspect_ratio);
        }
        debug!(
            "re = {}: stall at {:.2}°, {} post stall points",
            self.re,
            stall.a().to_degrees(),
            n_post_stall
        );
        Ok(Polar { re: self.re, data })
    }
}

#[derive(Debug, Clone)]
pub struct AerofoilBuilder {
    /// polars sorted by ascending Reynolds number
    data: Vec<Polar>,
    symmetric: bool,
    aspect_ratio: f64,
    update_aspect_ratio: bool,
}

impl Default for AerofoilBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AerofoilBuilder {
    /// An empty builder for an asymmetric profile with an infinite aspect ratio.
    pub fn new() -> Self {
        AerofoilBuilder {
            data: Vec::new(),
            symmetric: false,
            aspect_ratio: f64::INFINITY,
            update_aspect_ratio: false,
        }
    }

    /// add profile data as an 2-d array of `[[alpha_1, cl_1, cd_1], [alpha_2, cl_2, cd_2], ..]`
    /// with alpha in degrees.
    ///
    /// The data must be strict monotonic rising over alpha, and the reynolds number must be new.
    /// On error the builder is left unchanged.
    pub fn load_data(
        &mut self,
        mut data: Array2<f64>,
        re: f64,
    ) -> Result<&mut Self, AerofoilBuildError> {
        let idx = match self.data.binary_search_by(|polar| polar.re.total_cmp(&re)) {
            Ok(_) => return Err(AerofoilBuildError::Duplicate(re)),
            Err(idx) => idx,
        };
        if !re.is_finite() {
            return Err(AerofoilBuildError::Malformed(format!(
                "reynolds-number {re} is not finite"
            )));
        }
        if data.ncols() != 3 {
            return Err(AerofoilBuildError::Malformed(format!(
                "rows must contain [alpha, cl, cd], got {} columns",
                data.ncols()
            )));
        }
        if data.nrows() < 2 {
            return Err(AerofoilBuildError::NotEnoughData(format!(
                "the polar for re = {re} needs at least 2 samples"
            )));
        }
        data.column_mut(0).mapv_inplace(f64::to_radians);
        if !data.column(0).is_strictly_rising() {
            return Err(AerofoilBuildError::Malformed(
                "alpha values must be strict monotonic rising".into(),
            ));
        }

        debug!("loaded {} samples for re = {re}", data.nrows());
        self.data.insert(idx, Polar { re, data });
        Ok(self)
    }

    /// add profile data as `(alpha, cl, cd)` rows with alpha in degrees,
    /// see [`AerofoilBuilder::load_data`]
    pub fn load_rows<I>(&mut self, rows: I, re: f64) -> Result<&mut Self, AerofoilBuildError>
    where
        I: IntoIterator<Item = (f64, f64, f64)>,
    {
        let flat: Vec<f64> = rows
            .into_iter()
            .flat_map(|(alpha, cl, cd)| [alpha, cl, cd])
            .collect();
        let data = Array2::from_shape_vec((flat.len() / 3, 3), flat)?;
        self.load_data(data, re)
    }

    /// number of loaded polars
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// the Reynolds numbers of the loaded polars in ascending order
    pub fn reynolds_numbers(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().map(|polar| polar.re)
    }

    /// When this is set, only data for positive angles of attack need to be provided.
    pub fn symmetric(&mut self, yes: bool) -> &mut Self {
        self.symmetric = yes;
        self
    }

    /// Assume the provided data to be for an infinite aspect ratio.
    ///
    /// Update the data with the Lanchester-Prandtl model below the stalling angle
    /// and with the Viterna-Corrigan model above the stall angle.
    ///
    /// # Note
    /// This is currently only for symmetric profiles implemented.
    pub fn request_aspect_ratio_correction(&mut self, yes: bool) -> &mut Self {
        self.update_aspect_ratio = yes;
        self
    }

    /// Set the aspect ratio of the aerofoil.
    ///
    /// When the data does not reflect this aspect ratio,
    /// but instead is profile data for an infinite aspect ratio set
    /// [`request_aspect_ratio_correction`](AerofoilBuilder::request_aspect_ratio_correction)
    pub fn set_aspect_ratio(&mut self, ar: f64) -> &mut Self {
        self.aspect_ratio = ar;
        self
    }

    pub fn build(&self) -> Result<Aerofoil, AerofoilBuildError> {
        if self.data.is_empty() {
            return Err(AerofoilBuildError::NotEnoughData("no polar data loaded".into()));
        }
        let polars = self.corrected_polars()?;

        // resample the data so that we get a grid with all unique alpha values
        let alpha: Array1<f64> = polars
            .iter()
            .flat_map(|polar| polar.data.column(0).to_vec())
            .sorted_by(f64::total_cmp)
            .dedup()
            .collect();

        let mut re = Vec::with_capacity(polars.len() + 2);
        let mut clcd = Vec::with_capacity(polars.len() + 2);
        for polar in &polars {
            re.push(polar.re);
            clcd.push(interpolate::resample(
                polar.data.column(0),
                polar.data.slice(s![.., 1..]),
                &alpha,
            )?);
        }

        // duplicate the lowest and highest polar for extrapolation over re
        if re[0] > 0.0 {
            let lowest = clcd[0].clone();
            re.insert(0, 0.0);
            clcd.insert(0, lowest);
        }
        let last = re.len() - 1;
        if re[last] < f64::MAX {
            let highest = clcd[last].clone();
            re.push(f64::MAX);
            clcd.push(highest);
        }

        let views: Vec<ArrayView2<f64>> = clcd.iter().map(|arr| arr.view()).collect();
        let data = stack(Axis(1), &views)?;

        let alpha_range = [alpha[0], alpha[alpha.len() - 1]];
        let re_range = [re[0], re[re.len() - 1]];
        let lut = Interp2D::builder(data)
            .x(alpha)
            .y(Array::from(re))
            .strategy(Biliniar)
            .build()?;
        Ok(Aerofoil {
            lut,
            alpha_range,
            re_range,
            symmetric: self.symmetric,
        })
    }

    fn corrected_polars(&self) -> Result<Vec<Polar>, AerofoilBuildError> {
        if !self.update_aspect_ratio || self.aspect_ratio >= INFINITE_ASPECT_RATIO {
            return Ok(self.data.clone());
        }
        if !self.symmetric {
            return Err(AerofoilBuildError::NotImplemented(
                "aspect ratio correction for asymmetric profiles".into(),
            ));
        }
        self.data
            .iter()
            .map(|polar| polar.with_aspect_ratio(self.aspect_ratio))
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum AerofoilBuildError {
    #[error("data for the reynolds-number {0} is already stored")]
    Duplicate(f64),
    #[error("{0} is not implemented")]
    NotImplemented(String),
    #[error("stall point not found in the polar for the reynolds-number {0}")]
    StallNotFound(f64),
    #[error("malformed polar: {0}")]
    Malformed(String),
    #[error("{0}")]
    NotEnoughData(String),
    #[error("interpolation failed: {0}")]
    Interpolation(String),
}

impl From<BuilderError> for AerofoilBuildError {
    fn from(value: BuilderError) -> Self {
        match value {
            BuilderError::NotEnoughData(s) => AerofoilBuildError::NotEnoughData(s),
            other => AerofoilBuildError::Malformed(format!("{other:?}")),
        }
    }
}

impl From<InterpolateError> for AerofoilBuildError {
    fn from(value: InterpolateError) -> Self {
        AerofoilBuildError::Interpolation(format!("{value:?}"))
    }
}

impl From<ShapeError> for AerofoilBuildError {
    fn from(value: ShapeError) -> Self {
        AerofoilBuildError::Malformed(value.to_string())
    }
}

/// A single `[alpha, cl, cd]` row of a polar
trait DataPoint {
    fn a(&self) -> f64;
    fn cl(&self) -> f64;
    fn cd(&self) -> f64;
}

impl<S: Data<Elem = f64>> DataPoint for ArrayBase<S, Ix1> {
    fn a(&self) -> f64 {
        self[0]
    }

    fn cl(&self) -> f64 {
        self[1]
    }

    fn cd(&self) -> f64 {
        self[2]
    }
}

trait DataPointMut: DataPoint {
    fn lanchester_prandtl(&mut self, aspect_ratio: f64);
    fn viterna_corrigan(&mut self, stall: &impl DataPoint, aspect_ratio: f64);
}

impl<S: DataMut<Elem = f64>> DataPointMut for ArrayBase<S, Ix1> {
    fn lanchester_prandtl(&mut self, aspect_ratio: f64) {
        self[2] = self.cd() + self.cl().powi(2) / (PI * aspect_ratio);
        self[0] = self.a() + self.cl() / (PI * aspect_ratio);
    }

    /// cl and cd at the current alpha, anchored at the stall point
    fn viterna_corrigan(&mut self, stall: &impl DataPoint, aspect_ratio: f64) {
        let cd_max = if aspect_ratio > 50.0 { 2.01 } else { 1.1 + 0.018 * aspect_ratio };
        let kd = (stall.cd() - cd_max * stall.a().sin().powi(2)) / stall.a().cos();
        let kl = (stall.cl() - cd_max * stall.a().sin() * stall.a().cos()) * stall.a().sin()
            / stall.a().cos().powi(2);
        self[1] =
            cd_max / 2.0 * (2.0 * self.a()).sin() + kl * self.a().cos().powi(2) / self.a().sin();
        self[2] = cd_max * self.a().sin().powi(2) + kd * self.a().cos();
    }
}
