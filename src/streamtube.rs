use std::{f64::consts::PI, ops::Sub};

use log::debug;

use crate::{rot_vec, turbine::VAWTCase};

/// Induction factors bracketing the bisection search
const A_BRACKET: (f64, f64) = (-2.0, 2.0);

/// Iterations of the fixed point fallback
const FIXED_POINT_ITERATIONS: usize = 10;

/// A single streamtube of the turbine, crossed by the foil once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamTube {
    /// Induction factor of the upwind streamtube.
    /// For upwind steamtubes (θ < 180°) this should be 0
    a_0: f64,
    /// Steamtube position
    theta: f64,
    /// Pitch angle of the foil relative to the turbine tangent
    beta: f64,
}

impl StreamTube {
    /// - `theta` streamtube position in the turbine (radians)
    /// - `beta` foil pitch angle (radians)
    /// - `a_0` upstream induction factor, 0 for the upwind half of the turbine
    pub fn new(theta: f64, beta: f64, a_0: f64) -> Self {
        Self { a_0, theta, beta }
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn a_0(&self) -> f64 {
        self.a_0
    }

    /// solve the streamtube for the given case
    pub fn solve<'a>(&self, case: &VAWTCase<'a>, epsilon: f64) -> StreamTubeSolution<'a> {
        StreamTubeSolution::new(*case, *self, self.solve_a(case, epsilon))
    }

    /// calculate the induction factor for the streamtube
    ///
    /// The root of [`StreamTube::thrust_error`] is searched with bisection between
    /// `a = -2` and `a = 2` until the bracket is smaller than `epsilon`.
    /// When the bracket does not contain a sign change a fixed point iteration is used
    /// instead, its result is not bound by `epsilon`.
    pub fn solve_a(&self, case: &VAWTCase, epsilon: f64) -> f64 {
        let (mut a_left, mut a_right) = A_BRACKET;
        let mut err_left = self.thrust_error(a_left, case);
        let err_right = self.thrust_error(a_right, case);
        if err_left * err_right > 0.0 {
            debug!(
                "no root bracketed at theta = {:.2}°, falling back to fixed point iteration",
                self.theta.to_degrees()
            );
            return self.a_fixed_point(case);
        }

        while (a_right - a_left) > epsilon {
            let a = a_left + (a_right - a_left) / 2.0;
            if a <= a_left || a >= a_right {
                // bracket exhausted at floating point resolution
                break;
            }
            let err = self.thrust_error(a, case);

            if err_left * err <= 0.0 {
                a_right = a;
            } else {
                a_left = a;
                err_left = err;
            }
        }

        a_left + (a_right - a_left) / 2.0
    }

    fn a_fixed_point(&self, case: &VAWTCase) -> f64 {
        let mut a = 0.0;
        for _ in 0..FIXED_POINT_ITERATIONS {
            let c_s = self.foil_thrust(a, case);
            let a_new = 0.25 * c_s + a.powi(2);
            a = if a_new < 1.0 { a_new } else { 1.0 };
        }
        a
    }

    /// the difference between the wind thrust and the foil force
    /// this needs to be minimized
    pub fn thrust_error(&self, a: f64, case: &VAWTCase) -> f64 {
        self.foil_thrust(a, case) - StreamTube::wind_thrust(a)
    }

    /// Thrust coefficient of the foil in wind direction for the induction factor `a`
    pub fn foil_thrust(&self, a: f64, case: &VAWTCase) -> f64 {
        let (w, alpha, re) = self.w_alpha_re(a, case);

        let cl_cd = case.aerofoil.cl_cd(alpha, re);
        let (_, force_coeff) = cl_cd.to_global(alpha, self.beta, self.theta);

        -force_coeff * (w / self.c_0()).powi(2) * case.solidity / (PI * self.theta.sin().abs())
    }

    /// Thrust coefficient by momentum theory or Glauert empirical formula
    ///
    /// A crude straight line approximation for Glauert formula is used
    /// between 0.4 < a < 1.0,  0.96 < CtubeThru < 2.0
    pub fn wind_thrust(a: f64) -> f64 {
        if a < 0.4 {
            4.0 * a * (1.0 - a)
        } else {
            26.0 / 15.0 * a + 4.0 / 15.0
        }
    }

    /// the relative velocity magnitude `w`, the angle of attack `alpha` in radians
    /// and the local reynolds number `re` at the foil for the induction factor `a`
    pub fn w_alpha_re(&self, a: f64, case: &VAWTCase) -> (f64, f64, f64) {
        let w = self.w(a, case);
        let (w_x_foil, w_y_foil) = w.to_foil(self.theta, self.beta);
        let alpha = w_y_foil.atan2(w_x_foil) + PI / 2.0;
        let w = w.magnitude();
        (w, alpha, case.re * w)
    }

    /// tangential foil coefficient for the induction factor `a`
    pub fn c_tan(&self, a: f64, case: &VAWTCase) -> f64 {
        let (_, alpha, re) = self.w_alpha_re(a, case);
        let (_, c_t) = case.aerofoil.cl_cd(alpha, re).to_tangential(alpha, self.beta);
        c_t
    }

    /// reference windspeed
    fn c_0(&self) -> f64 {
        1.0 - 2.0 * self.a_0
    }

    /// windspeed at the foil in negative y direction
    fn c_1(&self, a: f64) -> Velocity {
        Velocity::from_global(0.0, -self.c_0() * (1.0 - a))
    }

    /// relative velocity at foil in global xy coordinates
    fn w(&self, a: f64, case: &VAWTCase) -> Velocity {
        self.c_1(a) - Velocity::from_tangential(0.0, case.tsr, self.theta)
    }
}

/// A solved streamtube
#[derive(Debug, Clone, Copy)]
pub struct StreamTubeSolution<'a> {
    case: VAWTCase<'a>,
    tube: StreamTube,
    a: f64,
}

impl<'a> StreamTubeSolution<'a> {
    pub(crate) fn new(case: VAWTCase<'a>, tube: StreamTube, a: f64) -> Self {
        Self { case, tube, a }
    }

    /// the induction factor of the solution
    pub fn a(&self) -> f64 {
        self.a
    }

    /// the induction factor of the upstream streamtube
    pub fn a_0(&self) -> f64 {
        self.tube.a_0
    }

    /// the pitch angle in radians
    pub fn beta(&self) -> f64 {
        self.tube.beta
    }

    /// the streamtube location in radians
    pub fn theta(&self) -> f64 {
        self.tube.theta
    }

    /// the relative windspeed at the foil
    pub fn w(&self) -> f64 {
        self.tube.w(self.a, &self.case).magnitude()
    }

    /// the angle of attack at the foil
    pub fn alpha(&self) -> f64 {
        self.tube.w_alpha_re(self.a, &self.case).1
    }

    /// the local reynolds number at the foil
    pub fn re(&self) -> f64 {
        self.w() * self.case.re
    }

    /// the difference between the wind thrust and the foil force of the solution
    pub fn thrust_error(&self) -> f64 {
        self.tube.thrust_error(self.a, &self.case)
    }

    /// tangential foil coefficient
    pub fn c_tan(&self) -> f64 {
        self.tube.c_tan(self.a, &self.case)
    }
}

/// A velocity in global coordinates
#[derive(Debug, Clone, Copy)]
struct Velocity([f64; 2]);

impl Velocity {
    fn from_global(x: f64, y: f64) -> Self {
        Velocity([x, y])
    }

    fn from_tangential(x: f64, y: f64, theta: f64) -> Self {
        Velocity(rot_vec([x, y], theta))
    }

    fn to_foil(self, theta: f64, beta: f64) -> (f64, f64) {
        let [x, y] = rot_vec(self.0, -theta - beta);
        (x, y)
    }

    fn magnitude(&self) -> f64 {
        self.0[0].hypot(self.0[1])
    }
}

impl Sub for Velocity {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        let Velocity([x_l, y_l]) = self;
        let Velocity([x_r, y_r]) = rhs;
        Velocity([x_l - x_r, y_l - y_r])
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::aerofoil::Aerofoil;

    fn aerofoil() -> Aerofoil {
        let rows = (0..=30).map(|deg| {
            let deg = f64::from(deg);
            if deg <= 10.0 {
                (deg, 0.1 * deg, 0.02 + 0.0004 * deg * deg)
            } else {
                (deg, 1.0 - 0.02 * (deg - 10.0), 0.06 + 0.04 * (deg - 10.0))
            }
        });
        Aerofoil::builder()
            .load_rows(rows, 60_000.0)
            .unwrap()
            .symmetric(true)
            .build()
            .unwrap()
    }

    fn case(aerofoil: &Aerofoil, solidity: f64) -> VAWTCase<'_> {
        VAWTCase {
            re: 60_000.0,
            tsr: 3.0,
            solidity,
            aerofoil,
        }
    }

    #[test]
    fn wind_thrust_is_continuous() {
        assert_abs_diff_eq!(StreamTube::wind_thrust(0.0), 0.0);
        assert_abs_diff_eq!(StreamTube::wind_thrust(0.2), 0.64, epsilon = 1e-12);
        assert_abs_diff_eq!(StreamTube::wind_thrust(0.4), 0.96, epsilon = 1e-12);
        assert_abs_diff_eq!(StreamTube::wind_thrust(0.4 - 1e-12), 0.96, epsilon = 1e-9);
        assert_abs_diff_eq!(StreamTube::wind_thrust(1.0), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn velocity_triangle() {
        let aerofoil = aerofoil();
        let case = case(&aerofoil, 0.1);

        // foil moving against the wind
        let (w, alpha, re) = StreamTube::new(0.0, 0.0, 0.0).w_alpha_re(0.0, &case);
        assert_abs_diff_eq!(w, 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(alpha, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(re, 240_000.0, epsilon = 1e-6);

        // foil moving across the wind
        let (w, alpha, _) = StreamTube::new(PI / 2.0, 0.0, 0.0).w_alpha_re(0.0, &case);
        assert_abs_diff_eq!(w, 10.0f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(alpha, -(1.0f64 / 3.0).atan(), epsilon = 1e-12);

        // pitch reduces the angle of attack
        let (_, alpha_pitched, _) = StreamTube::new(PI / 2.0, 0.1, 0.0).w_alpha_re(0.0, &case);
        assert_abs_diff_eq!(alpha_pitched, alpha - 0.1, epsilon = 1e-12);

        // downstream the wind is slowed by the upstream induction factor
        let (w, ..) = StreamTube::new(0.0, 0.0, 0.25).w_alpha_re(0.5, &case);
        assert_abs_diff_eq!(w, 3.25, epsilon = 1e-12);
    }

    #[test]
    fn bisection_finds_thrust_balance() {
        let aerofoil = aerofoil();
        let case = case(&aerofoil, 0.2);
        let epsilon = 0.01;
        let tube = StreamTube::new(PI / 2.0, 0.0, 0.0);
        assert!(tube.thrust_error(-2.0, &case) * tube.thrust_error(2.0, &case) < 0.0);

        let a = tube.solve_a(&case, epsilon);
        let err_below = tube.thrust_error(a - epsilon, &case);
        assert!(err_below * tube.thrust_error(a + epsilon, &case) <= 0.0);
        assert!(tube.thrust_error(a, &case).abs() <= 10.0 * epsilon);

        let solution = tube.solve(&case, epsilon);
        assert_eq!(solution.a(), a);
        assert_eq!(solution.thrust_error(), tube.thrust_error(a, &case));
        assert_abs_diff_eq!(solution.re(), solution.w() * 60_000.0, epsilon = 1e-6);
    }

    #[test]
    fn bisection_is_used_when_bracketed() {
        let aerofoil = aerofoil();
        let case = case(&aerofoil, 0.2);
        let tube = StreamTube::new(PI / 2.0, 0.0, 0.0);
        assert!(tube.thrust_error(-2.0, &case) * tube.thrust_error(2.0, &case) <= 0.0);

        let a = tube.solve_a(&case, 0.01);
        assert_ne!(a, tube.a_fixed_point(&case));
        // bisection of [-2, 2] down to 0.01 ends on a midpoint of the 1/256 grid
        assert_eq!(((a + 2.0) * 256.0).fract(), 0.0);
    }

    #[test]
    fn fixed_point_is_used_without_bracket() {
        let aerofoil = aerofoil();
        let case = case(&aerofoil, 3.0);
        let tube = StreamTube::new(0.1, 0.0, 0.4);
        let err_left = tube.thrust_error(-2.0, &case);
        let err_right = tube.thrust_error(2.0, &case);
        assert!(err_left * err_right > 0.0);

        let a = tube.solve_a(&case, 0.01);
        assert_eq!(a, tube.a_fixed_point(&case));
        assert_eq!(a, 1.0);
        assert_eq!(tube.solve(&case, 0.01).a(), a);
    }

    #[test]
    fn zero_solidity_has_no_induction() {
        let aerofoil = aerofoil();
        let case = case(&aerofoil, 0.0);
        let epsilon = 0.01;
        for theta in [0.3, 1.2, 2.5, 4.0, 5.5] {
            let tube = StreamTube::new(theta, 0.0, 0.0);
            assert_eq!(tube.foil_thrust(0.3, &case), 0.0);
            assert_abs_diff_eq!(tube.solve_a(&case, epsilon), 0.0, epsilon = epsilon);
            assert_eq!(tube.a_fixed_point(&case), 0.0);
        }
    }

    #[test]
    fn fixed_point_is_limited() {
        let aerofoil = aerofoil();
        let case = case(&aerofoil, 3.0);
        for theta in [0.05, 0.5, 1.5, 3.0] {
            let a = StreamTube::new(theta, 0.0, 0.0).a_fixed_point(&case);
            assert!(a <= 1.0);
        }
    }

    #[test]
    fn tangential_coefficient_drives_before_stall() {
        let aerofoil = aerofoil();
        let case = case(&aerofoil, 0.1);
        let tube = StreamTube::new(PI / 2.0, 0.0, 0.0);
        let (_, alpha, re) = tube.w_alpha_re(0.5, &case);
        let clcd = aerofoil.cl_cd(alpha, re);
        assert_abs_diff_eq!(
            tube.c_tan(0.5, &case),
            clcd.cl() * alpha.sin() - clcd.cd() * alpha.cos(),
            epsilon = 1e-12
        );
        assert!(tube.c_tan(0.5, &case) > 0.0);
    }
}
