use crate::aerofoil::Aerofoil;

/// Turbine settings for the VAWT case
#[derive(Debug, Clone, Copy)]
pub struct VAWTCase<'a> {
    /// Reynolds number of the turbine
    pub re: f64,
    /// Tipspeed ratio of the turbine
    pub tsr: f64,
    /// Turbine solidity
    pub solidity: f64,
    /// Aerofoil
    pub aerofoil: &'a Aerofoil,
}
