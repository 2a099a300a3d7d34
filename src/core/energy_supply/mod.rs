pub mod ac_losses;
pub mod clipping;
pub mod inverter;
pub mod pv;
pub mod single_diode;
