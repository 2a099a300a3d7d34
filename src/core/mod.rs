pub mod columns;
pub mod energy_supply;
pub mod irradiance;
pub mod optical_losses;
pub mod shading;
pub mod solar_geometry;
pub(crate) mod solvers;
pub mod units;
