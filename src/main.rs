use std::{
    error::Error,
    fs::File,
    path::{Path, PathBuf},
};

use clap::{Args, Parser, Subcommand};
use csv::ReaderBuilder;
use ndarray::{Array, Array2};
use ndarray_csv::Array2Reader;

use vawt::{Aerofoil, VAWTSolver};

#[derive(Parser, Debug)]
#[command(name = "vawt")]
#[command(version)]
#[command(about = "Double-multiple-streamtube performance of vertical axis wind turbines")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve a turbine and print its torque and power coefficients
    Solve {
        #[command(flatten)]
        aerofoil: AerofoilArgs,

        /// Tipspeed ratio
        #[arg(long, default_value_t = 2.0)]
        tsr: f64,

        /// Reynolds number of the turbine
        #[arg(long, default_value_t = 60_000.0)]
        re: f64,

        /// Turbine solidity
        #[arg(long, default_value_t = 0.1)]
        solidity: f64,

        /// Number of streamtubes over the whole turbine
        #[arg(long, default_value_t = 50)]
        n_streamtubes: usize,

        /// Accuracy of the induction factor
        #[arg(long, default_value_t = 0.01)]
        epsilon: f64,

        /// Constant pitch angle in degrees
        #[arg(long, default_value_t = 0.0, conflicts_with = "beta_amplitude")]
        beta: f64,

        /// Pitch the foil sinusoidally over theta with this amplitude in degrees
        #[arg(long)]
        beta_amplitude: Option<f64>,

        /// Print the solution of every streamtube
        #[arg(long)]
        details: bool,
    },
    /// Print the lift and drag coefficients of an aerofoil
    Polar {
        #[command(flatten)]
        aerofoil: AerofoilArgs,

        /// Number of angles of attack between 0° and 90°
        #[arg(long, default_value_t = 45)]
        alpha_steps: usize,

        #[arg(long, default_value_t = 30_000.0)]
        re_min: f64,

        #[arg(long, default_value_t = 180_000.0)]
        re_max: f64,

        #[arg(long, default_value_t = 20)]
        re_steps: usize,
    },
}

#[derive(Args, Debug)]
struct AerofoilArgs {
    /// Polar data as `RE=PATH`, the file holds `alpha, cl, cd` rows with alpha in degrees
    #[arg(long = "polar", value_parser = parse_polar, required = true)]
    polars: Vec<(f64, PathBuf)>,

    /// Aspect ratio of the foil, the polars are corrected when it is set
    #[arg(long)]
    aspect_ratio: Option<f64>,

    /// Mirror the polars for negative angles of attack
    #[arg(long)]
    symmetric: bool,
}

impl AerofoilArgs {
    fn build(&self) -> Result<Aerofoil, Box<dyn Error>> {
        let mut builder = Aerofoil::builder();
        for (re, path) in &self.polars {
            builder.load_data(read_array(path)?, *re)?;
        }
        if let Some(ar) = self.aspect_ratio {
            builder
                .set_aspect_ratio(ar)
                .request_aspect_ratio_correction(true);
        }
        Ok(builder.symmetric(self.symmetric).build()?)
    }
}

fn parse_polar(arg: &str) -> Result<(f64, PathBuf), String> {
    let (re, path) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected RE=PATH, got `{arg}`"))?;
    let re = re
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("invalid reynolds number `{re}`: {err}"))?;
    Ok((re, PathBuf::from(path.trim())))
}

fn read_array(path: &Path) -> Result<Array2<f64>, Box<dyn Error>> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .delimiter(b',')
        .from_reader(file);

    Ok(reader.deserialize_array2_dynamic()?)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Solve {
            aerofoil,
            tsr,
            re,
            solidity,
            n_streamtubes,
            epsilon,
            beta,
            beta_amplitude,
            details,
        } => {
            let aerofoil = aerofoil.build()?;
            let mut solver = VAWTSolver::new(&aerofoil);
            solver
                .tsr(tsr)
                .re(re)
                .solidity(solidity)
                .n_streamtubes(n_streamtubes)
                .epsilon(epsilon);
            let solution = match beta_amplitude {
                Some(amplitude) => {
                    let amplitude = amplitude.to_radians();
                    solver.solve_with_beta_fn(|theta| theta.sin() * amplitude)
                }
                None => solver.solve(beta.to_radians()),
            };

            if details {
                println!("theta\ta\tw\talpha\tre\tthrust_error\tc_tan");
                for tube in solution.streamtubes() {
                    println!(
                        "{:.2}\t{:.4}\t{:.4}\t{:.2}\t{:.0}\t{:.4}\t{:.4}",
                        tube.theta().to_degrees(),
                        tube.a(),
                        tube.w(),
                        tube.alpha().to_degrees(),
                        tube.re(),
                        tube.thrust_error(),
                        tube.c_tan()
                    );
                }
            }
            println!("c_torque = {}", solution.c_torque());
            println!("c_power = {}", solution.c_power());
        }
        Command::Polar {
            aerofoil,
            alpha_steps,
            re_min,
            re_max,
            re_steps,
        } => {
            let aerofoil = aerofoil.build()?;
            let alphas = Array::linspace(0.0, 90.0f64.to_radians(), alpha_steps);
            let reynolds_numbers = Array::linspace(re_min, re_max, re_steps);
            println!("alpha\tre\tcl\tcd");
            for &alpha in &alphas {
                for &re in &reynolds_numbers {
                    let clcd = aerofoil.cl_cd(alpha, re);
                    println!(
                        "{:.2}\t{:.0}\t{:.4}\t{:.4}",
                        alpha.to_degrees(),
                        re,
                        clcd.cl(),
                        clcd.cd()
                    );
                }
            }
        }
    }
    Ok(())
}
