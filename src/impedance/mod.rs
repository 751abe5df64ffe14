//! Wake and impedance sources, and their sums on a common grid.

use crate::error::ConfigError;
use crate::Float;
use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;

pub mod resonators;
pub use crate::impedance::resonators::Resonators;

/// Anything that can describe the machine response on a grid, either as a
/// wake in time [V/s per unit charge] or as an impedance in frequency [Ohm].
///
/// A source may provide only one of the two; the other returns `None`.
pub trait ImpedanceSource: Send + Sync {
    fn name(&self) -> &str;

    /// Wake on a grid of non-negative time lags.
    fn wake(&self, _time: &[Float]) -> Option<Vec<Float>> {
        None
    }

    fn impedance(&self, _freq: &[Float]) -> Option<Vec<Complex<Float>>> {
        None
    }
}

/// Element-wise sum of the wakes of every source on `time`.
pub fn sum_wakes(
    sources: &[Box<dyn ImpedanceSource>],
    time: &[Float],
) -> Result<Vec<Float>, ConfigError> {
    if !cfg!(feature = "unchecked") {
        // wakes are causal, never sample a negative lag
        assert!(time.iter().all(|&t| t >= 0.0));
    }
    let mut total = vec![0.0; time.len()];
    for source in sources {
        let wake = source
            .wake(time)
            .ok_or_else(|| ConfigError::MissingWake(source.name().to_string()))?;
        for (t, w) in total.iter_mut().zip(wake.iter()) {
            *t += *w;
        }
    }
    Ok(total)
}

/// Element-wise sum of the impedances of every source on `freq`.
pub fn sum_impedances(
    sources: &[Box<dyn ImpedanceSource>],
    freq: &[Float],
) -> Result<Vec<Complex<Float>>, ConfigError> {
    let mut total = vec![Complex::zero(); freq.len()];
    for source in sources {
        let imp = individual_impedance(source.as_ref(), freq)?;
        for (t, z) in total.iter_mut().zip(imp.iter()) {
            *t += *z;
        }
    }
    Ok(total)
}

pub(crate) fn individual_impedance(
    source: &dyn ImpedanceSource,
    freq: &[Float],
) -> Result<Vec<Complex<Float>>, ConfigError> {
    source
        .impedance(freq)
        .ok_or_else(|| ConfigError::MissingImpedance(source.name().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct WakeOnly;

    impl ImpedanceSource for WakeOnly {
        fn name(&self) -> &str {
            "wake_only"
        }

        fn wake(&self, time: &[Float]) -> Option<Vec<Float>> {
            Some(time.iter().map(|t| 2.0 * t).collect())
        }
    }

    #[test]
    fn wakes_add_up() {
        let sources: Vec<Box<dyn ImpedanceSource>> = vec![Box::new(WakeOnly), Box::new(WakeOnly)];
        let total = sum_wakes(&sources, &[0.0, 1.0, 2.0]).unwrap();
        assert_eq!(total, vec![0.0, 4.0, 8.0]);
    }

    #[test]
    fn missing_capability_is_reported() {
        let sources: Vec<Box<dyn ImpedanceSource>> = vec![Box::new(WakeOnly)];
        let err = sum_impedances(&sources, &[0.0, 1.0]).unwrap_err();
        assert_eq!(err, ConfigError::MissingImpedance("wake_only".into()));
    }

    #[test]
    fn no_sources_give_zeros() {
        let sources: Vec<Box<dyn ImpedanceSource>> = Vec::new();
        assert_eq!(sum_wakes(&sources, &[0.0, 1.0]).unwrap(), vec![0.0, 0.0]);
        assert!(sum_impedances(&sources, &[0.0, 1.0])
            .unwrap()
            .iter()
            .all(|z| z.is_zero()));
    }
}
