//! Beam line density on a fixed time window.

use crate::beam::Beam;
use crate::constants::CFWHM;
use crate::error::ConfigError;
use crate::params::linspace;
use crate::spectrum::{rfftfreq, RealFft};
use crate::Float;
use itertools::izip;
use rustfft::num_complex::Complex;
use serde::Deserialize;

pub mod histogram;
use crate::profile::histogram::{histogram, smooth_histogram};

/// Unit the configured cuts are given in.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CutsUnit {
    /// Seconds
    S,
    /// RF phase of the main cavity
    Rad,
}

impl Default for CutsUnit {
    fn default() -> Self {
        CutsUnit::S
    }
}

impl CutsUnit {
    /// `cut` in seconds, given the RF angular frequency of the main cavity.
    pub fn to_seconds(self, cut: Float, omega_rf: Float) -> Float {
        match self {
            CutsUnit::S => cut,
            CutsUnit::Rad => cut / omega_rf,
        }
    }
}

/// How particles are deposited on the slices.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SliceMode {
    /// Whole particles counted in the bin they fall in.
    Histogram,
    /// Particles shared linearly between the two nearest bin centres.
    Smooth,
}

impl Default for SliceMode {
    fn default() -> Self {
        SliceMode::Histogram
    }
}

pub struct Profile {
    pub n_slices: usize,
    pub cut_left: Float,
    pub cut_right: Float,
    pub n_sigma: Float,
    pub edges: Vec<Float>,
    pub bin_centers: Vec<Float>,
    pub n_macroparticles: Vec<u32>,
    pub mode: SliceMode,
    // Smoothed deposit, filled in `SliceMode::Smooth` only.
    pub line_density: Vec<Float>,
    pub bl_rms: Float,
    pub bp_rms: Float,
    pub bl_fwhm: Float,
    pub bp_fwhm: Float,
}

impl Profile {
    /// With both cuts at 0 the window is taken from the beam: the whole
    /// bunch plus 5% of its extent on each side, or `n_sigma` RMS lengths
    /// around the mean when `n_sigma` is non-zero. Explicit cuts are read in
    /// `cuts_unit`; `omega_rf` converts phases to time.
    pub fn new(
        n_slices: usize,
        cut_left: Float,
        cut_right: Float,
        n_sigma: Float,
        cuts_unit: CutsUnit,
        omega_rf: Float,
        beam: &Beam,
    ) -> Result<Profile, ConfigError> {
        let (cut_left, cut_right) = if cut_left == 0.0 && cut_right == 0.0 {
            auto_cuts(beam, n_sigma)
        } else {
            (
                cuts_unit.to_seconds(cut_left, omega_rf),
                cuts_unit.to_seconds(cut_right, omega_rf),
            )
        };
        let mut profile = Profile::with_cuts(n_slices, cut_left, cut_right)?;
        profile.n_sigma = n_sigma;
        Ok(profile)
    }

    /// Empty profile on an explicit window.
    pub fn with_cuts(
        n_slices: usize,
        cut_left: Float,
        cut_right: Float,
    ) -> Result<Profile, ConfigError> {
        if n_slices < 2 {
            return Err(ConfigError::TooFewSlices(n_slices));
        }
        let mut profile = Profile {
            n_slices,
            cut_left: 0.0,
            cut_right: 0.0,
            n_sigma: 0.0,
            edges: Vec::new(),
            bin_centers: Vec::new(),
            n_macroparticles: vec![0; n_slices],
            mode: SliceMode::Histogram,
            line_density: Vec::new(),
            bl_rms: 0.0,
            bp_rms: 0.0,
            bl_fwhm: 0.0,
            bp_fwhm: 0.0,
        };
        profile.set_cuts(cut_left, cut_right)?;
        Ok(profile)
    }

    /// Move the window and rebuild `edges` and `bin_centers`. Generators that
    /// cached anything derived from the grid need a `reprocess` afterwards.
    pub fn set_cuts(&mut self, cut_left: Float, cut_right: Float) -> Result<(), ConfigError> {
        if !(cut_left < cut_right) {
            return Err(ConfigError::InvalidCuts {
                left: cut_left,
                right: cut_right,
            });
        }
        self.cut_left = cut_left;
        self.cut_right = cut_right;
        self.edges = linspace(cut_left, cut_right, self.n_slices + 1);
        self.bin_centers = self
            .edges
            .windows(2)
            .map(|w| 0.5 * (w[0] + w[1]))
            .collect();
        Ok(())
    }

    /// Slice the beam. The integer counts are always refreshed; in
    /// `SliceMode::Smooth` the smoothed deposit is computed as well and
    /// becomes what [`Profile::counts`] returns.
    pub fn track(&mut self, beam: &Beam) {
        histogram(
            &beam.dt,
            &mut self.n_macroparticles,
            self.cut_left,
            self.cut_right,
        );
        if self.mode == SliceMode::Smooth {
            self.line_density.resize(self.n_slices, 0.0);
            smooth_histogram(
                &beam.dt,
                &mut self.line_density,
                self.cut_left,
                self.cut_right,
            );
        }
    }

    /// Shift the window so it stays centred on `beam.mean_dt`. Needs fresh
    /// beam statistics.
    pub fn track_cuts(&mut self, beam: &Beam) {
        let delta = beam.mean_dt - 0.5 * (self.cut_left + self.cut_right);
        self.cut_left += delta;
        self.cut_right += delta;
        for e in self.edges.iter_mut() {
            *e += delta;
        }
        for b in self.bin_centers.iter_mut() {
            *b += delta;
        }
    }

    #[inline(always)]
    pub fn time_resolution(&self) -> Float {
        self.bin_centers[1] - self.bin_centers[0]
    }

    /// Particles per slice as the induced voltage and the bunch length
    /// measurements see them.
    pub fn counts(&self) -> Vec<Float> {
        match self.mode {
            SliceMode::Smooth if self.line_density.len() == self.n_slices => {
                self.line_density.clone()
            }
            _ => self.n_macroparticles.iter().map(|&c| c as Float).collect(),
        }
    }

    /// RMS bunch length (4 sigma) and position from the line density.
    /// An empty profile gives NaN.
    pub fn rms(&mut self) {
        let dt = self.time_resolution();
        let counts = self.counts();
        let norm = trapezoid(&counts, dt);
        let density: Vec<Float> = counts.iter().map(|c| c / norm).collect();

        let first: Vec<Float> = izip!(&self.bin_centers, &density)
            .map(|(t, d)| t * d)
            .collect();
        let bp = trapezoid(&first, dt);
        let second: Vec<Float> = izip!(&self.bin_centers, &density)
            .map(|(t, d)| (t - bp) * (t - bp) * d)
            .collect();

        self.bp_rms = bp;
        self.bl_rms = 4.0 * trapezoid(&second, dt).sqrt();
    }

    /// Bunch length and position from the full width at half maximum above
    /// `shift`, assuming a Gaussian line density. When the half maximum is
    /// not crossed strictly inside the window both come out as NaN.
    pub fn fwhm(&mut self, shift: Float) {
        let counts = self.counts();
        let n = self.n_slices;
        let max = counts.iter().cloned().fold(Float::NEG_INFINITY, Float::max);
        let half_max = shift + 0.5 * (max - shift);
        let dt = self.time_resolution();

        let taux1 = counts.iter().position(|&c| c >= half_max);
        let taux2 = counts.iter().rposition(|&c| c >= half_max);

        match (taux1, taux2) {
            (Some(i1), Some(i2)) if i1 > 0 && i2 < n - 1 => {
                let t1 = self.bin_centers[i1]
                    - (counts[i1] - half_max) / (counts[i1] - counts[i1 - 1]) * dt;
                let t2 = self.bin_centers[i2]
                    + (counts[i2] - half_max) / (counts[i2] - counts[i2 + 1]) * dt;
                self.bl_fwhm = 4.0 * (t2 - t1) / CFWHM;
                self.bp_fwhm = 0.5 * (t1 + t2);
            }
            _ => {
                self.bl_fwhm = Float::NAN;
                self.bp_fwhm = Float::NAN;
            }
        }
    }

    /// Width between the outermost bins at or above half the peak, scaled
    /// by the Gaussian FWHM factor.
    pub fn fast_fwhm(&self) -> Float {
        let counts = self.counts();
        let max = counts.iter().cloned().fold(Float::NEG_INFINITY, Float::max);
        let half_max = 0.5 * max;
        let i1 = counts.iter().position(|&c| c >= half_max);
        let i2 = counts.iter().rposition(|&c| c >= half_max);
        match (i1, i2) {
            (Some(i1), Some(i2)) => CFWHM * (self.bin_centers[i2] - self.bin_centers[i1]),
            _ => Float::NAN,
        }
    }

    /// Spectrum of the histogram, zero-padded or truncated to `fft.len()`.
    pub fn beam_spectrum(&self, fft: &mut RealFft) -> Vec<Complex<Float>> {
        fft.rfft(&self.counts())
    }

    /// Frequencies matching [`Profile::beam_spectrum`] for an `n`-point transform.
    pub fn beam_spectrum_freq(&self, n: usize) -> Vec<Float> {
        rfftfreq(n, self.time_resolution())
    }
}

fn auto_cuts(beam: &Beam, n_sigma: Float) -> (Float, Float) {
    let alive = || {
        izip!(&beam.dt, &beam.id)
            .filter(|(_, id)| **id != 0)
            .map(|(dt, _)| *dt)
    };
    if n_sigma == 0.0 {
        let (min, max) = alive().fold((Float::INFINITY, Float::NEG_INFINITY), |(lo, hi), x| {
            (lo.min(x), hi.max(x))
        });
        let margin = 0.05 * (max - min);
        (min - margin, max + margin)
    } else {
        let n = alive().count() as Float;
        let mean = alive().sum::<Float>() / n;
        let sigma = (alive().map(|x| (x - mean) * (x - mean)).sum::<Float>() / n).sqrt();
        (mean - 0.5 * n_sigma * sigma, mean + 0.5 * n_sigma * sigma)
    }
}

fn trapezoid(f: &[Float], dx: Float) -> Float {
    f.windows(2).map(|w| 0.5 * (w[0] + w[1]) * dx).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PI;
    use approx::assert_relative_eq;

    fn gaussian_profile(n_slices: usize, sigma: Float) -> Profile {
        let mut profile = Profile::with_cuts(n_slices, -1.0, 1.0).unwrap();
        profile.n_macroparticles = profile
            .bin_centers
            .iter()
            .map(|t| (1e4 * (-t * t / (2.0 * sigma * sigma)).exp()).round() as u32)
            .collect();
        profile
    }

    #[test]
    fn grid_geometry() {
        let profile = Profile::with_cuts(4, 0.0, 2.0).unwrap();
        assert_eq!(profile.edges.len(), 5);
        assert_eq!(profile.bin_centers.len(), 4);
        assert_relative_eq!(profile.bin_centers[0], 0.25);
        assert_relative_eq!(profile.bin_centers[3], 1.75);
        assert_relative_eq!(profile.time_resolution(), 0.5);
        for w in profile.edges.windows(2) {
            assert!(w[0] < w[1]);
        }
    }

    #[test]
    fn degenerate_window_is_rejected() {
        assert!(matches!(
            Profile::with_cuts(4, 1.0, 1.0),
            Err(ConfigError::InvalidCuts { .. })
        ));
        assert_eq!(
            Profile::with_cuts(1, 0.0, 1.0).err(),
            Some(ConfigError::TooFewSlices(1))
        );
    }

    #[test]
    fn automatic_cuts_cover_the_bunch() {
        let mut beam = Beam::new(3, 1.0);
        beam.dt = vec![1.0, 3.0, 2.0];
        let profile = Profile::new(10, 0.0, 0.0, 0.0, CutsUnit::S, 1.0, &beam).unwrap();
        assert_relative_eq!(profile.cut_left, 0.9, max_relative = 1e-12);
        assert_relative_eq!(profile.cut_right, 3.1, max_relative = 1e-12);

        let profile = Profile::new(10, 0.0, 0.0, 4.0, CutsUnit::Rad, 1e9, &beam).unwrap();
        let sigma = (2.0 as Float / 3.0).sqrt();
        assert_relative_eq!(profile.cut_left, 2.0 - 2.0 * sigma, epsilon = 1e-12);
        assert_relative_eq!(profile.cut_right, 2.0 + 2.0 * sigma, epsilon = 1e-12);
    }

    #[test]
    fn track_fills_the_histogram() {
        let mut beam = Beam::new(4, 1.0);
        beam.dt = vec![0.1, 0.6, 0.7, 5.0];
        let mut profile = Profile::with_cuts(2, 0.0, 1.0).unwrap();
        profile.track(&beam);
        assert_eq!(profile.n_macroparticles, vec![1, 2]);
    }

    #[test]
    fn track_cuts_follows_the_mean() {
        let mut beam = Beam::new(1, 1.0);
        beam.mean_dt = 3.0;
        let mut profile = Profile::with_cuts(2, 0.0, 2.0).unwrap();
        profile.track_cuts(&beam);
        assert_relative_eq!(profile.cut_left, 2.0);
        assert_relative_eq!(profile.cut_right, 4.0);
        assert_relative_eq!(profile.bin_centers[0], 2.5);
        assert_relative_eq!(profile.edges[2], 4.0);
    }

    #[test]
    fn rms_of_a_gaussian() {
        let mut profile = gaussian_profile(200, 0.1);
        profile.rms();
        assert!(profile.bp_rms.abs() < 1e-6);
        assert_relative_eq!(profile.bl_rms, 0.4, max_relative = 1e-2);
    }

    #[test]
    fn rms_of_an_empty_profile_is_nan() {
        let mut profile = Profile::with_cuts(10, 0.0, 1.0).unwrap();
        profile.rms();
        assert!(profile.bl_rms.is_nan());
        assert!(profile.bp_rms.is_nan());
    }

    #[test]
    fn fwhm_of_a_gaussian() {
        let mut profile = gaussian_profile(200, 0.1);
        profile.fwhm(0.0);
        assert_relative_eq!(profile.bl_fwhm, 0.4, max_relative = 1e-2);
        assert!(profile.bp_fwhm.abs() < 1e-3);
        let fast = profile.fast_fwhm();
        assert_relative_eq!(fast, CFWHM * CFWHM * 0.1, max_relative = 5e-2);
    }

    #[test]
    fn fwhm_at_the_window_edge_is_nan() {
        let mut profile = Profile::with_cuts(4, 0.0, 1.0).unwrap();
        profile.n_macroparticles = vec![10, 2, 1, 0];
        profile.fwhm(0.0);
        assert!(profile.bl_fwhm.is_nan());
        assert!(profile.bp_fwhm.is_nan());
    }

    #[test]
    fn spectrum_dc_is_total_count() {
        let mut profile = Profile::with_cuts(8, 0.0, 8.0).unwrap();
        profile.n_macroparticles = vec![0, 1, 2, 3, 3, 2, 1, 0];
        let mut fft = RealFft::new(16);
        let spec = profile.beam_spectrum(&mut fft);
        assert_eq!(spec.len(), 9);
        assert_relative_eq!(spec[0].re, 12.0, epsilon = 1e-9);
        let freq = profile.beam_spectrum_freq(16);
        assert_eq!(freq.len(), 9);
        assert_relative_eq!(freq[1], 1.0 / 16.0);
    }

    #[test]
    fn cuts_in_radians_become_seconds() {
        let beam = Beam::new(1, 1.0);
        let omega_rf: Float = 2.0 * PI * 400.79e6;
        let profile =
            Profile::new(8, -PI, PI, 0.0, CutsUnit::Rad, omega_rf, &beam).unwrap();
        assert_relative_eq!(profile.cut_left, -PI / omega_rf, max_relative = 1e-12);
        assert_relative_eq!(profile.cut_right, PI / omega_rf, max_relative = 1e-12);
        // and back to the phase window
        assert_relative_eq!(profile.cut_right * omega_rf, PI, max_relative = 1e-12);
        assert_relative_eq!(
            (profile.edges[8] - profile.edges[0]) * omega_rf,
            2.0 * PI,
            max_relative = 1e-12
        );

        let seconds = Profile::new(8, -1e-9, 1e-9, 0.0, CutsUnit::S, omega_rf, &beam).unwrap();
        assert_eq!(seconds.cut_left, -1e-9);
        assert_eq!(seconds.cut_right, 1e-9);
    }

    #[test]
    fn smooth_mode_keeps_the_particle_count() {
        let mut beam = Beam::new(1000, 1.0);
        beam.dt = (0..1000)
            .map(|i| 3.0 * ((i as Float) * 0.618_033_988_7).fract() - 1.0)
            .collect();
        let mut profile = Profile::with_cuts(20, 0.0, 1.0).unwrap();
        profile.mode = SliceMode::Smooth;
        profile.track(&beam);

        let inside = beam.dt.iter().filter(|&&t| (0.0..=1.0).contains(&t)).count();
        let counts = profile.counts();
        assert_eq!(counts, profile.line_density);
        assert_relative_eq!(counts.iter().sum::<Float>(), inside as Float, epsilon = 1e-9);
        assert_eq!(profile.n_macroparticles.iter().sum::<u32>() as usize, inside);
        // smoothing only moves weight between neighbours
        assert!(counts != profile.n_macroparticles.iter().map(|&c| c as Float).collect::<Vec<_>>());
    }
}
