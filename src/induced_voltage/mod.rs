//! Induced voltage from the beam profile and the machine response, and the
//! kick it gives back to the particles.

use crate::beam::Beam;
use crate::profile::Profile;
use crate::smooth::next_regular;
use crate::{Float, PRTL_CHUNK_SIZE};
use anyhow::Result;
use rayon::prelude::*;
use serde::Deserialize;
use tracing::warn;

pub mod freq;
pub mod memory;
pub mod time;
pub mod total;

pub use crate::induced_voltage::freq::{FreqOptions, InducedVoltageFreq};
pub use crate::induced_voltage::memory::InducedVoltageMemory;
pub use crate::induced_voltage::time::InducedVoltageTime;
pub use crate::induced_voltage::total::TotalInducedVoltage;

/// A generator owns its cached wake/impedance tables and the voltage it
/// computed last. It only ever reads the profile and the beam.
pub trait InducedVoltage: Send {
    /// Rebuild everything derived from the profile grid.
    fn reprocess(&mut self, profile: &Profile) -> Result<()>;

    /// Recompute the voltage on `profile.bin_centers` and cache it. The
    /// returned copy is truncated or zero-extended to `length` when given.
    fn induced_voltage_generation(
        &mut self,
        profile: &Profile,
        beam: &Beam,
        charge: Float,
        length: Option<usize>,
    ) -> Result<Vec<Float>>;

    /// Voltage from the last generation, one value per slice.
    fn induced_voltage(&self) -> &[Float];
}

/// How a requested frequency resolution becomes a number of samples.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FreqResOption {
    Round,
    Ceil,
    Floor,
}

impl Default for FreqResOption {
    fn default() -> Self {
        FreqResOption::Round
    }
}

/// Transform length for a frequency step `freq_resolution` on a grid of
/// spacing `time_resolution`. Zero resolution means one sample per slice.
///
/// A length too short to cover the `n_slices` window is raised to the
/// smallest 5-smooth length that does, with a warning.
pub fn sampling_length(
    freq_resolution: Float,
    time_resolution: Float,
    option: FreqResOption,
    n_slices: usize,
) -> usize {
    if freq_resolution == 0.0 {
        return n_slices;
    }
    let b = (freq_resolution * time_resolution).powi(-1);
    let a = match option {
        FreqResOption::Round => b.round(),
        FreqResOption::Ceil => b.ceil(),
        FreqResOption::Floor => b.floor(),
    };
    let n = next_regular(a.max(1.0) as usize);
    if n < n_slices {
        let corrected = next_regular(n_slices);
        warn!(
            requested = n,
            corrected,
            "frequency resolution too coarse to sample the whole bunch, using a finer one"
        );
        corrected
    } else {
        n
    }
}

/// Add to `de` the voltage interpolated linearly between the bin centres
/// at each particle's `dt`. Particles outside the first and last centre get
/// nothing; a NaN position gives a NaN kick.
pub fn linear_interp_kick(dt: &[Float], de: &mut [Float], voltage: &[Float], bin_centers: &[Float]) {
    let n_slices = bin_centers.len();
    if !cfg!(feature = "unchecked") {
        assert_eq!(voltage.len(), n_slices);
        assert_eq!(dt.len(), de.len());
        assert!(n_slices >= 2);
    }
    let bin_first = bin_centers[0];
    let bin_last = bin_centers[n_slices - 1];
    let inv_bin_width = (n_slices - 1) as Float / (bin_last - bin_first);

    (dt, de)
        .into_par_iter()
        .chunks(PRTL_CHUNK_SIZE)
        .for_each(|o| {
            o.into_iter().for_each(|(&a, de)| {
                if a < bin_first || a > bin_last {
                    return;
                }
                // the last centre itself uses the last interval
                let ffbin = (((a - bin_first) * inv_bin_width) as usize).min(n_slices - 2);
                *de += voltage[ffbin]
                    + (a - bin_centers[ffbin]) * (voltage[ffbin + 1] - voltage[ffbin]) * inv_bin_width;
            })
        });
}

pub(crate) fn fit_length(mut voltage: Vec<Float>, length: Option<usize>) -> Vec<Float> {
    if let Some(length) = length {
        voltage.resize(length, 0.0);
    }
    voltage
}
