use std::{error::Error, f64::consts::PI, fs::File};

use approx::assert_abs_diff_eq;
use csv::ReaderBuilder;
use ndarray::Array2;
use ndarray_csv::Array2Reader;
use vawt::{Aerofoil, AerofoilBuildError, AerofoilBuilder, StreamTube, VAWTSolution, VAWTSolver};

const POLARS: [(&str, f64); 3] = [
    ("tests/polars/symmetric_re080k.csv", 80_000.0),
    ("tests/polars/symmetric_re040k.csv", 40_000.0),
    ("tests/polars/symmetric_re160k.csv", 160_000.0),
];

fn read_array(path: &str) -> Result<Array2<f64>, Box<dyn Error>> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .delimiter(b',')
        .from_reader(file);

    Ok(reader.deserialize_array2_dynamic()?)
}

fn symmetric_builder() -> Result<AerofoilBuilder, Box<dyn Error>> {
    let mut builder = Aerofoil::builder();
    for (path, re) in POLARS {
        builder.load_data(read_array(path)?, re)?;
    }
    builder.symmetric(true);
    Ok(builder)
}

fn load_corrected() -> Result<Aerofoil, Box<dyn Error>> {
    Ok(symmetric_builder()?
        .set_aspect_ratio(12.8)
        .request_aspect_ratio_correction(true)
        .build()?)
}

fn solve_reference(aerofoil: &Aerofoil) -> VAWTSolution<'_> {
    VAWTSolver::new(aerofoil)
        .re(31_300.0)
        .solidity(0.3525)
        .n_streamtubes(72)
        .tsr(3.25)
        .solve(0.0)
}

#[test]
fn reference_turbine() -> Result<(), Box<dyn Error>> {
    let aerofoil = load_corrected()?;
    let solution = solve_reference(&aerofoil);

    assert_eq!(solution.n_streamtubes(), 72);
    for &a in solution.a_samples() {
        assert!((-1.0..=1.2).contains(&a), "induction factor {a} out of range");
    }
    let c_torque = solution.c_torque();
    let c_power = solution.c_power();
    assert!(c_torque.is_finite());
    assert!(c_power.is_finite());
    assert!(c_power > 0.0);
    assert_abs_diff_eq!(c_power, c_torque * 3.25, epsilon = 1e-12);
    Ok(())
}

#[test]
fn bracketed_streamtubes_balance_thrust() -> Result<(), Box<dyn Error>> {
    let aerofoil = load_corrected()?;
    let solution = solve_reference(&aerofoil);
    let case = solution.case();

    for tube in solution.streamtubes() {
        let streamtube = StreamTube::new(tube.theta(), tube.beta(), tube.a_0());
        let err_left = streamtube.thrust_error(-2.0, &case);
        let bracketed = err_left * streamtube.thrust_error(2.0, &case) <= 0.0;
        if bracketed {
            assert!(
                tube.thrust_error().abs() <= 10.0 * solution.epsilon(),
                "thrust error {} at theta = {}",
                tube.thrust_error(),
                tube.theta()
            );
        }
    }
    Ok(())
}

#[test]
fn zero_solidity_has_no_torque() -> Result<(), Box<dyn Error>> {
    let aerofoil = load_corrected()?;
    for tsr in [0.5, 1.0, 2.0, 3.25, 5.0] {
        let solution = VAWTSolver::new(&aerofoil).solidity(0.0).tsr(tsr).solve(0.0);
        assert_eq!(solution.c_torque(), 0.0);
        assert_eq!(solution.c_power(), 0.0);
    }
    Ok(())
}

#[test]
fn solution_is_exact_on_streamtubes() -> Result<(), Box<dyn Error>> {
    let aerofoil = load_corrected()?;
    let solution = solve_reference(&aerofoil);
    for (theta, a) in solution.theta_samples().iter().zip(solution.a_samples()) {
        assert_eq!(solution.a(*theta), *a);
    }
    Ok(())
}

#[test]
fn interpolated_queries_match_streamtubes() -> Result<(), Box<dyn Error>> {
    let aerofoil = load_corrected()?;
    let solution = solve_reference(&aerofoil);
    for tube in solution.streamtubes() {
        let theta = tube.theta();
        assert_eq!(solution.w(theta), tube.w());
        assert_eq!(solution.alpha(theta), tube.alpha());
        assert_eq!(solution.re(theta), tube.re());
        assert_eq!(solution.c_tan(theta), tube.c_tan());
        assert_eq!(solution.thrust_error(theta), tube.thrust_error());
    }

    // between two streamtubes the induction factor is interpolated linearly
    let theta = solution.theta_samples();
    let a = solution.a_samples();
    let mid = (theta[3] + theta[4]) / 2.0;
    assert_abs_diff_eq!(solution.a(mid), (a[3] + a[4]) / 2.0, epsilon = 1e-12);
    Ok(())
}

#[test]
fn pitch_follows_theta() -> Result<(), Box<dyn Error>> {
    let aerofoil = load_corrected()?;
    let beta = |theta: f64| theta.sin() * 10.0f64.to_radians();
    let solution = VAWTSolver::new(&aerofoil)
        .re(31_300.0)
        .solidity(0.3525)
        .n_streamtubes(72)
        .tsr(3.25)
        .solve_with_beta_fn(beta);

    for (&theta, &solved_beta) in solution.theta_samples().iter().zip(solution.beta_samples()) {
        assert_eq!(solved_beta, beta(theta));
    }
    assert!(solution.c_torque().is_finite());
    Ok(())
}

#[test]
fn parallel_solution_is_deterministic() -> Result<(), Box<dyn Error>> {
    let aerofoil = load_corrected()?;
    let first = solve_reference(&aerofoil);
    let second = solve_reference(&aerofoil);
    assert_eq!(first.a_samples(), second.a_samples());
    assert_eq!(first.a_0_samples(), second.a_0_samples());
    assert_eq!(first.c_torque(), second.c_torque());
    Ok(())
}

#[test]
fn duplicate_polar_leaves_dataset_unchanged() -> Result<(), Box<dyn Error>> {
    let mut builder = symmetric_builder()?;
    assert_eq!(builder.len(), 3);
    let err = builder
        .load_data(read_array(POLARS[0].0)?, POLARS[0].1)
        .unwrap_err();
    assert!(matches!(err, AerofoilBuildError::Duplicate(_)));
    assert_eq!(builder.len(), 3);
    assert_eq!(
        builder.reynolds_numbers().collect::<Vec<_>>(),
        vec![40_000.0, 80_000.0, 160_000.0]
    );
    Ok(())
}

#[test]
fn polar_samples_are_reproduced() -> Result<(), Box<dyn Error>> {
    let (path, re) = POLARS[1];
    let data = read_array(path)?;
    let aerofoil = Aerofoil::builder()
        .load_data(data.clone(), re)?
        .symmetric(true)
        .build()?;
    for row in data.rows() {
        let clcd = aerofoil.cl_cd(row[0].to_radians(), re);
        assert_abs_diff_eq!(clcd.cl(), row[1], epsilon = 1e-12);
        assert_abs_diff_eq!(clcd.cd(), row[2], epsilon = 1e-12);
    }
    Ok(())
}

#[test]
fn symmetric_lut_is_mirrored() -> Result<(), Box<dyn Error>> {
    let aerofoil = load_corrected()?;
    for deg in [0.5, 4.0, 11.3, 25.0, 60.0, 89.0] {
        let alpha = f64::to_radians(deg);
        for re in [10_000.0, 31_300.0, 60_000.0, 120_000.0, 500_000.0] {
            let pos = aerofoil.cl_cd(alpha, re);
            let neg = aerofoil.cl_cd(-alpha, re);
            assert_eq!(neg.cl(), -pos.cl());
            assert_eq!(neg.cd(), pos.cd());
        }
    }
    let cd_max = aerofoil.cl_cd(PI / 2.0, 80_000.0).cd();
    assert_abs_diff_eq!(cd_max, 1.1 + 0.018 * 12.8, epsilon = 1e-9);
    Ok(())
}
