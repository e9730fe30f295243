//! Performance prediction of vertical axis wind turbines with the
//! double-multiple-streamtube (DMST) method.
//!
//! The swept area of the turbine is split into streamtubes. For every streamtube the
//! induction factor balancing the momentum loss of the wind against the force on the
//! foil is solved. Streamtubes on the downwind half see the wind already slowed by
//! their upwind partner.
//!
//! ```no_run
//! use vawt::{Aerofoil, VAWTSolver};
//! # fn polar() -> Vec<(f64, f64, f64)> { vec![] }
//! let aerofoil = Aerofoil::builder()
//!     .load_rows(polar(), 80_000.0)?
//!     .symmetric(true)
//!     .build()?;
//! let solution = VAWTSolver::new(&aerofoil).tsr(3.25).solidity(0.35).solve(0.0);
//! println!("cp = {}", solution.c_power());
//! # Ok::<(), vawt::AerofoilBuildError>(())
//! ```
use std::f64::consts::PI;

use log::{debug, info};
use ndarray::{s, Array, Array1, ArrayView1, Zip};

pub mod aerofoil;
mod interpolate;
pub mod streamtube;
mod turbine;

pub use aerofoil::{Aerofoil, AerofoilBuildError, AerofoilBuilder, ClCd};
pub use streamtube::{StreamTube, StreamTubeSolution};
pub use turbine::VAWTCase;

/// rotate the 2d vector `v` by the angle `phi` (in radians)
pub(crate) fn rot_vec([x, y]: [f64; 2], phi: f64) -> [f64; 2] {
    [phi.cos() * x + (-phi).sin() * y, phi.sin() * x + phi.cos() * y]
}

/// A VAWT case and solver settings
#[derive(Debug, Clone)]
pub struct VAWTSolver<'a> {
    aerofoil: &'a Aerofoil,
    n_streamtubes: usize,
    tsr: f64,
    re: f64,
    solidity: f64,
    epsilon: f64,
}

impl<'a> VAWTSolver<'a> {
    /// create a new Solver with the following default values:
    ///
    /// - `n_streamtubes = 50` Number of streamtubes over the whole turbine
    /// - `tsr = 2.0` Tipspeed ratio of the turbine
    /// - `re = 60_000.0` Reynolds number of the turbine
    /// - `solidity = 0.1` Solidity of the Turbine
    /// - `epsilon = 0.01` the solution accuracy for a
    pub fn new(aerofoil: &'a Aerofoil) -> VAWTSolver<'a> {
        VAWTSolver {
            aerofoil,
            n_streamtubes: 50,
            tsr: 2.0,
            re: 60_000.0,
            solidity: 0.1,
            epsilon: 0.01,
        }
    }

    /// update the number of streamtubes for the solution,
    /// if n is not a multiple of 2 `n+1` is used.
    pub fn n_streamtubes(&mut self, n: usize) -> &mut Self {
        let n = n.max(2);
        self.n_streamtubes = if n % 2 == 0 { n } else { n + 1 };
        self
    }

    /// update the tipspeed ratio for the solution
    pub fn tsr(&mut self, tsr: f64) -> &mut Self {
        self.tsr = tsr;
        self
    }

    /// update the reynolds number for the solution
    pub fn re(&mut self, re: f64) -> &mut Self {
        self.re = re;
        self
    }

    /// update the turbine solidity for the solution
    pub fn solidity(&mut self, solidity: f64) -> &mut Self {
        self.solidity = solidity;
        self
    }

    /// update the accuracy of the induction factor
    pub fn epsilon(&mut self, epsilon: f64) -> &mut Self {
        self.epsilon = epsilon;
        self
    }

    /// the turbine settings shared by all streamtubes
    pub fn case(&self) -> VAWTCase<'a> {
        VAWTCase {
            re: self.re,
            tsr: self.tsr,
            solidity: self.solidity,
            aerofoil: self.aerofoil,
        }
    }

    /// solve the VAWT Turbine with a constant beta angle in radians
    pub fn solve(&self, beta: f64) -> VAWTSolution<'a> {
        self.solve_with_beta_fn(|_| beta)
    }

    /// solve the VAWT Turbine with a provided beta angle as function of theta in radians
    pub fn solve_with_beta_fn(&self, beta: impl Fn(f64) -> f64 + Sync) -> VAWTSolution<'a> {
        self.iter_streamtubes(|case, &theta_up, &theta_down| {
            let beta_up = beta(theta_up);
            let beta_down = beta(theta_down);
            let a_up = StreamTube::new(theta_up, beta_up, 0.0).solve_a(case, self.epsilon);
            let a_down = StreamTube::new(theta_down, beta_down, a_up).solve_a(case, self.epsilon);

            (beta_up, beta_down, a_up, a_down)
        })
    }

    /// iterate over all streamtubes, applying `solve_fn`.
    ///
    /// `solve_fn` is called in parallel for each pair of up and downstream streamtubes with:
    /// `Fn(case: &VAWTCase, theta_up: &f64, theta_down: &f64) -> (beta_up: f64, beta_down: f64, a_up: f64, a_down: f64)`
    fn iter_streamtubes(
        &self,
        solve_fn: impl Fn(&VAWTCase, &f64, &f64) -> (f64, f64, f64, f64) + Sync,
    ) -> VAWTSolution<'a> {
        info!(
            "solving {} streamtubes for tsr = {}, re = {}, solidity = {}",
            self.n_streamtubes, self.tsr, self.re, self.solidity
        );
        let d_t_half = PI / self.n_streamtubes as f64;
        let theta = Array::linspace(d_t_half, PI * 2.0 - d_t_half, self.n_streamtubes);
        let mut beta = Array::zeros(self.n_streamtubes);
        let mut a = Array::zeros(self.n_streamtubes);
        let mut a_0 = Array::zeros(self.n_streamtubes);

        let slice_up = s![..self.n_streamtubes / 2];
        let slice_down = s![self.n_streamtubes / 2..;-1];

        let (beta_up, beta_down) = beta.multi_slice_mut((slice_up, slice_down));
        let (a_up, a_down) = a.multi_slice_mut((slice_up, slice_down));

        let case = self.case();

        let func = |theta_up: &f64,
                    theta_down: &f64,
                    beta_up: &mut f64,
                    beta_down: &mut f64,
                    a_up: &mut f64,
                    a_down: &mut f64| {
            debug!(
                "solving for theta = {:.2}° and theta = {:.2}°",
                theta_up.to_degrees(),
                theta_down.to_degrees()
            );
            (*beta_up, *beta_down, *a_up, *a_down) = solve_fn(&case, theta_up, theta_down)
        };

        Zip::from(theta.slice(slice_up))
            .and(theta.slice(slice_down))
            .and(beta_up)
            .and(beta_down)
            .and(a_up)
            .and(a_down)
            .par_for_each(func);

        a_0.slice_mut(slice_down).assign(&a.slice(slice_up));

        VAWTSolution {
            case,
            n_streamtubes: self.n_streamtubes,
            theta,
            beta,
            a,
            a_0,
            epsilon: self.epsilon,
        }
    }
}

/// The solution of a VAWT case
///
/// Point queries at an arbitrary `theta` interpolate the stored streamtube samples linearly.
#[derive(Debug, Clone)]
pub struct VAWTSolution<'a> {
    case: VAWTCase<'a>,
    n_streamtubes: usize,
    theta: Array1<f64>,
    beta: Array1<f64>,
    a: Array1<f64>,
    a_0: Array1<f64>,
    epsilon: f64,
}

impl<'a> VAWTSolution<'a> {
    /// Torque coefficient of the turbine
    pub fn c_torque(&self) -> f64 {
        let ct = self
            .streamtubes()
            .map(|solution| solution.c_tan() * solution.w().powi(2))
            .sum::<f64>();
        ct * self.case.solidity / (self.n_streamtubes as f64)
    }

    /// Power coefficient of the turbine
    pub fn c_power(&self) -> f64 {
        self.c_torque() * self.case.tsr
    }

    /// the pitch angle `beta` at the location `theta`
    pub fn beta(&self, theta: f64) -> f64 {
        interpolate::linear_at(self.theta.view(), self.beta.view(), theta)
    }

    /// the induction factor `a` at the location `theta`
    pub fn a(&self, theta: f64) -> f64 {
        interpolate::linear_at(self.theta.view(), self.a.view(), theta)
    }

    /// the upstream induction factor `a_0` at the location `theta`
    pub fn a_0(&self, theta: f64) -> f64 {
        interpolate::linear_at(self.theta.view(), self.a_0.view(), theta)
    }

    /// the difference between the wind thrust and the foil force
    /// (solution error) at the location `theta`
    pub fn thrust_error(&self, theta: f64) -> f64 {
        self.solution(theta).thrust_error()
    }

    /// tangential foil coefficient at the location `theta`
    pub fn c_tan(&self, theta: f64) -> f64 {
        self.solution(theta).c_tan()
    }

    /// the relative windspeed at the foil at the location `theta`
    pub fn w(&self, theta: f64) -> f64 {
        self.solution(theta).w()
    }

    /// the angle of attack at the foil at the location `theta`
    pub fn alpha(&self, theta: f64) -> f64 {
        self.solution(theta).alpha()
    }

    /// the local reynolds number at the foil at the location `theta`
    pub fn re(&self, theta: f64) -> f64 {
        self.solution(theta).re()
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn n_streamtubes(&self) -> usize {
        self.n_streamtubes
    }

    pub fn case(&self) -> VAWTCase<'a> {
        self.case
    }

    /// streamtube positions in solver order
    pub fn theta_samples(&self) -> ArrayView1<f64> {
        self.theta.view()
    }

    pub fn beta_samples(&self) -> ArrayView1<f64> {
        self.beta.view()
    }

    pub fn a_samples(&self) -> ArrayView1<f64> {
        self.a.view()
    }

    pub fn a_0_samples(&self) -> ArrayView1<f64> {
        self.a_0.view()
    }

    /// the streamtube solution interpolated at the location `theta`
    pub fn solution(&self, theta: f64) -> StreamTubeSolution<'a> {
        let tube = StreamTube::new(theta, self.beta(theta), self.a_0(theta));
        StreamTubeSolution::new(self.case, tube, self.a(theta))
    }

    /// the solved streamtubes, without interpolation
    pub fn streamtubes(&self) -> impl Iterator<Item = StreamTubeSolution<'a>> + '_ {
        self.theta
            .iter()
            .zip(&self.beta)
            .zip(&self.a)
            .zip(&self.a_0)
            .map(|(((&theta, &beta), &a), &a_0)| {
                StreamTubeSolution::new(self.case, StreamTube::new(theta, beta, a_0), a)
            })
    }
}
