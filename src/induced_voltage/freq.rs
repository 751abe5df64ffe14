use crate::beam::Beam;
use crate::constants::E;
use crate::impedance::{individual_impedance, sum_impedances, ImpedanceSource};
use crate::induced_voltage::{fit_length, sampling_length, FreqResOption, InducedVoltage};
use crate::profile::Profile;
use crate::spectrum::{rfftfreq, RealFft};
use crate::Float;
use anyhow::Result;
use rustfft::num_complex::Complex;

#[derive(Debug, Clone, Copy, Default)]
pub struct FreqOptions {
    /// Requested frequency step [Hz]; 0 samples the spectrum once per slice.
    pub freq_resolution: Float,
    pub freq_res_option: FreqResOption,
    /// Re-evaluate the impedances on every generation.
    pub recalculate_impedance: bool,
    /// Keep one voltage per source next to the total.
    pub save_individual_voltages: bool,
}

/// Induced voltage as the inverse transform of the beam spectrum times the
/// total impedance.
pub struct InducedVoltageFreq {
    sources: Vec<Box<dyn ImpedanceSource>>,
    options: FreqOptions,
    n_fft: usize,
    freq_resolution: Float,
    freq_array: Vec<Float>,
    total_impedance: Vec<Complex<Float>>,
    individual_impedances: Vec<Vec<Complex<Float>>>,
    individual_voltages: Vec<Vec<Float>>,
    spectrum_fft: RealFft,
    voltage_fft: RealFft,
    induced_voltage: Vec<Float>,
}

impl InducedVoltageFreq {
    pub fn new(
        sources: Vec<Box<dyn ImpedanceSource>>,
        profile: &Profile,
        options: FreqOptions,
    ) -> Result<InducedVoltageFreq> {
        let mut iv = InducedVoltageFreq {
            sources,
            options,
            n_fft: 0,
            freq_resolution: 0.0,
            freq_array: Vec::new(),
            total_impedance: Vec::new(),
            individual_impedances: Vec::new(),
            individual_voltages: Vec::new(),
            spectrum_fft: RealFft::new(profile.n_slices),
            voltage_fft: RealFft::new(profile.n_slices),
            induced_voltage: Vec::new(),
        };
        iv.reprocess(profile)?;
        Ok(iv)
    }

    /// Number of samples the profile is transformed on.
    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    /// Frequency step actually used [Hz].
    pub fn freq_resolution(&self) -> Float {
        self.freq_resolution
    }

    pub fn freq_array(&self) -> &[Float] {
        &self.freq_array
    }

    pub fn total_impedance(&self) -> &[Complex<Float>] {
        &self.total_impedance
    }

    /// One row per source, empty unless individual voltages are saved.
    pub fn individual_voltages(&self) -> &[Vec<Float>] {
        &self.individual_voltages
    }

    fn refresh_impedances(&mut self) -> Result<()> {
        self.total_impedance = sum_impedances(&self.sources, &self.freq_array)?;
        if self.options.save_individual_voltages {
            self.individual_impedances = self
                .sources
                .iter()
                .map(|s| individual_impedance(s.as_ref(), &self.freq_array))
                .collect::<Result<_, _>>()?;
        }
        Ok(())
    }

    fn voltage_from(
        &mut self,
        impedance: &[Complex<Float>],
        spectrum: &[Complex<Float>],
        n_slices: usize,
        factor: Float,
    ) -> Vec<Float> {
        let product: Vec<Complex<Float>> = impedance
            .iter()
            .zip(spectrum.iter())
            .map(|(z, s)| z * s)
            .collect();
        let mut voltage = self.voltage_fft.irfft(&product);
        voltage.resize(n_slices, 0.0);
        for v in voltage.iter_mut() {
            *v *= factor;
        }
        voltage
    }
}

impl InducedVoltage for InducedVoltageFreq {
    fn reprocess(&mut self, profile: &Profile) -> Result<()> {
        let dt = profile.time_resolution();
        self.n_fft = sampling_length(
            self.options.freq_resolution,
            dt,
            self.options.freq_res_option,
            profile.n_slices,
        );
        self.freq_resolution = (self.n_fft as Float * dt).powi(-1);
        self.freq_array = rfftfreq(self.n_fft, dt);
        self.spectrum_fft = RealFft::new(self.n_fft);
        // inverse on the even length the one-sided spectrum describes
        self.voltage_fft = RealFft::new(2 * (self.freq_array.len() - 1));
        self.refresh_impedances()?;
        self.individual_voltages = if self.options.save_individual_voltages {
            vec![vec![0.0; profile.n_slices]; self.sources.len()]
        } else {
            Vec::new()
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
        if self.options.recalculate_impedance {
            self.refresh_impedances()?;
        }
        let spectrum = profile.beam_spectrum(&mut self.spectrum_fft);
        let factor = -charge
            * E
            * beam.ratio()
            * self.freq_array[1]
            * 2.0
            * (spectrum.len() - 1) as Float;
        let n_slices = profile.n_slices;

        if self.options.save_individual_voltages {
            let impedances = std::mem::take(&mut self.individual_impedances);
            let voltages: Vec<Vec<Float>> = impedances
                .iter()
                .map(|z| self.voltage_from(z, &spectrum, n_slices, factor))
                .collect();
            self.individual_impedances = impedances;
            let mut total = vec![0.0; n_slices];
            for row in &voltages {
                for (t, v) in total.iter_mut().zip(row.iter()) {
                    *t += *v;
                }
            }
            self.individual_voltages = voltages;
            self.induced_voltage = total;
        } else {
            let impedance = std::mem::take(&mut self.total_impedance);
            self.induced_voltage = self.voltage_from(&impedance, &spectrum, n_slices, factor);
            self.total_impedance = impedance;
        }
        Ok(fit_length(self.induced_voltage.clone(), length))
    }

    fn induced_voltage(&self) -> &[Float] {
        &self.induced_voltage
    }
}
