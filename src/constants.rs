use crate::Float;

/// Speed of light [m/s]
pub const C: Float = 299_792_458.0;
/// Elementary charge [C]
pub const E: Float = 1.602_176_634e-19;
/// Proton rest mass [eV/c^2]
pub const M_P: Float = 938.272_088_16e6;
/// Electron rest mass [eV/c^2]
pub const M_E: Float = 0.510_998_950e6;

// Ratio between the FWHM and the RMS width of a gaussian, 2*sqrt(2 ln 2).
pub const CFWHM: Float = 2.354_820_045_030_949_3;
