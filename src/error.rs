//! Typed errors for configuration and set-up of a tracking run.
//!
//! Everything in here is fatal: the driver reports it and stops. Numerical
//! trouble during tracking never ends up here, it shows up as `NaN` in the
//! affected arrays instead.

use crate::Float;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("number of turns must be at least 1")]
    NoTurns,

    #[error("alpha_order must be 0, 1 or 2, got {0}")]
    AlphaOrder(usize),

    #[error("at least one RF cavity is required")]
    NoCavities,

    #[error("the beam must hold at least one macroparticle")]
    NoMacroparticles,

    #[error("intensity must be positive, got {0}")]
    NonPositiveIntensity(Float),

    #[error("a profile needs at least 2 slices, got {0}")]
    TooFewSlices(usize),

    #[error("cut_left ({left}) must be smaller than cut_right ({right})")]
    InvalidCuts { left: Float, right: Float },

    #[error("frequency resolution must be a non-negative number, got {0}")]
    FreqResolution(Float),

    #[error("output interval and stride must be positive when output is written")]
    OutputInterval,

    #[error("source `{0}` does not provide a wake function")]
    MissingWake(String),

    #[error("source `{0}` does not provide an impedance")]
    MissingImpedance(String),

    #[error("table `{name}` has {got} entries, expected {expected}")]
    TableLength {
        name: &'static str,
        got: usize,
        expected: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_cuts() {
        let err = ConfigError::InvalidCuts {
            left: 2.0,
            right: 1.0,
        };
        assert_eq!(
            err.to_string(),
            "cut_left (2) must be smaller than cut_right (1)"
        );
    }

    #[test]
    fn display_missing_wake() {
        let err = ConfigError::MissingWake("resonators".into());
        assert!(err.to_string().contains("resonators"));
        assert!(err.to_string().contains("wake"));
    }

    #[test]
    fn converts_into_anyhow() {
        let err: anyhow::Error = ConfigError::TooFewSlices(1).into();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::TooFewSlices(1))
        );
    }
}
