use crate::beam::Beam;
use crate::constants::E;
use crate::convolution::{convolve_direct, ConvolutionMode, FftConvolver};
use crate::impedance::{sum_wakes, ImpedanceSource};
use crate::induced_voltage::{fit_length, InducedVoltage};
use crate::profile::Profile;
use crate::smooth::next_regular;
use crate::Float;
use anyhow::Result;

/// Induced voltage as the convolution of the profile with the total wake.
pub struct InducedVoltageTime {
    sources: Vec<Box<dyn ImpedanceSource>>,
    mode: ConvolutionMode,
    time_array: Vec<Float>,
    total_wake: Vec<Float>,
    cut: usize,
    shape: usize,
    convolver: Option<FftConvolver>,
    induced_voltage: Vec<Float>,
}

impl InducedVoltageTime {
    pub fn new(
        sources: Vec<Box<dyn ImpedanceSource>>,
        profile: &Profile,
        mode: ConvolutionMode,
    ) -> Result<InducedVoltageTime> {
        let mut iv = InducedVoltageTime {
            sources,
            mode,
            time_array: Vec::new(),
            total_wake: Vec::new(),
            cut: 0,
            shape: 0,
            convolver: None,
            induced_voltage: vec![0.0; profile.n_slices],
        };
        iv.reprocess(profile)?;
        Ok(iv)
    }

    /// Time lags the wake is sampled on, starting at 0.
    pub fn time_array(&self) -> &[Float] {
        &self.time_array
    }

    pub fn total_wake(&self) -> &[Float] {
        &self.total_wake
    }

    /// Length of the full linear convolution.
    pub fn cut(&self) -> usize {
        self.cut
    }

    /// Padded transform length used for the FFT convolution.
    pub fn shape(&self) -> usize {
        self.shape
    }
}

impl InducedVoltage for InducedVoltageTime {
    fn reprocess(&mut self, profile: &Profile) -> Result<()> {
        let t0 = profile.bin_centers[0];
        self.time_array = profile.bin_centers.iter().map(|t| t - t0).collect();
        self.total_wake = sum_wakes(&self.sources, &self.time_array)?;
        self.cut = self.time_array.len() + profile.n_slices - 1;
        self.shape = next_regular(self.cut);
        self.convolver = match self.mode {
            ConvolutionMode::Fft => Some(FftConvolver::new(&self.total_wake, profile.n_slices)),
            ConvolutionMode::Direct => None,
        };
        self.induced_voltage = vec![0.0; profile.n_slices];
        Ok(())
    }

    fn induced_voltage_generation(
        &mut self,
        profile: &Profile,
        beam: &Beam,
        charge: Float,
        length: Option<usize>,
    ) -> Result<Vec<Float>> {
        let counts = profile.counts();
        let mut voltage = match self.convolver.as_mut() {
            Some(conv) => conv.convolve(&counts),
            None => convolve_direct(&counts, &self.total_wake),
        };
        let factor = -charge * E * beam.ratio();
        voltage.truncate(profile.n_slices);
        for v in voltage.iter_mut() {
            *v *= factor;
        }
        self.induced_voltage = voltage;
        Ok(fit_length(self.induced_voltage.clone(), length))
    }

    fn induced_voltage(&self) -> &[Float] {
        &self.induced_voltage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impedance::Resonators;
    use approx::assert_relative_eq;

    fn setup() -> (Profile, Beam) {
        let mut beam = Beam::new(1000, 1e11);
        beam.dt = (0..1000)
            .map(|i| {
                let x = (i as Float + 0.5) / 1000.0;
                1e-9 * (x - 0.5) * (x - 0.5).abs()
            })
            .collect();
        let mut profile = Profile::with_cuts(64, -0.3e-9, 0.3e-9).unwrap();
        profile.track(&beam);
        (profile, beam)
    }

    fn resonator() -> Vec<Box<dyn ImpedanceSource>> {
        vec![Box::new(Resonators::new(vec![1e5], vec![2e9], vec![1.0]))]
    }

    #[test]
    fn grid_starts_at_zero_lag() {
        let (profile, _) = setup();
        let iv = InducedVoltageTime::new(resonator(), &profile, ConvolutionMode::Fft).unwrap();
        assert_eq!(iv.time_array()[0], 0.0);
        assert_eq!(iv.time_array().len(), 64);
        assert_eq!(iv.cut(), 127);
        assert_eq!(iv.shape(), 128);
    }

    #[test]
    fn direct_and_fft_agree() {
        let (profile, beam) = setup();
        let mut direct =
            InducedVoltageTime::new(resonator(), &profile, ConvolutionMode::Direct).unwrap();
        let mut fft = InducedVoltageTime::new(resonator(), &profile, ConvolutionMode::Fft).unwrap();
        let a = direct
            .induced_voltage_generation(&profile, &beam, 1.0, None)
            .unwrap();
        let b = fft.induced_voltage_generation(&profile, &beam, 1.0, None).unwrap();
        assert_eq!(a.len(), 64);
        let scale = a.iter().fold(0.0 as Float, |m, v| m.max(v.abs()));
        assert!(scale > 0.0);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-8 * scale);
        }
    }

    #[test]
    fn voltage_before_the_bunch_is_zero() {
        // nothing at the head of the window, so nothing ahead of it is induced
        let (profile, beam) = setup();
        let mut iv = InducedVoltageTime::new(resonator(), &profile, ConvolutionMode::Direct).unwrap();
        let v = iv.induced_voltage_generation(&profile, &beam, 1.0, None).unwrap();
        let first = profile
            .n_macroparticles
            .iter()
            .position(|&c| c > 0)
            .unwrap();
        assert!(first > 0);
        assert!(v[..first].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn requested_length_does_not_change_the_cache() {
        let (profile, beam) = setup();
        let mut iv = InducedVoltageTime::new(resonator(), &profile, ConvolutionMode::Fft).unwrap();
        let short = iv.induced_voltage_generation(&profile, &beam, 1.0, Some(10)).unwrap();
        assert_eq!(short.len(), 10);
        assert_eq!(iv.induced_voltage().len(), 64);
        let long = iv.induced_voltage_generation(&profile, &beam, 1.0, Some(100)).unwrap();
        assert_eq!(long.len(), 100);
        assert!(long[64..].iter().all(|&x| x == 0.0));
        assert_eq!(&long[..64], iv.induced_voltage());
    }
}
