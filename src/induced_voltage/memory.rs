use crate::beam::Beam;
use crate::constants::E;
use crate::impedance::{sum_impedances, ImpedanceSource};
use crate::induced_voltage::{fit_length, InducedVoltage};
use crate::profile::Profile;
use crate::smooth::next_regular;
use crate::spectrum::{rfftfreq, RealFft};
use crate::Float;
use anyhow::Result;
use rustfft::num_complex::Complex;

/// Frequency-domain induced voltage for wakes that outlive one turn.
///
/// The impedance is sampled once on a grid long enough for
/// `n_turns_memory + 1` repetitions of the profile window. The voltage of
/// every turn is accumulated into a buffer of that length, which is shifted
/// by one window per generation, so a bunch keeps feeling what earlier
/// turns left behind.
///
/// The shift assumes the profile window spans one revolution period, so that
/// window `k` of the buffer is what the bunch meets `k` turns later. With a
/// window shorter than `t_rev` the remembered wake arrives too early.
pub struct InducedVoltageMemory {
    sources: Vec<Box<dyn ImpedanceSource>>,
    n_turns_memory: usize,
    n_slices: usize,
    len_array_mem: usize,
    len_array_mem_ext: usize,
    n_points: usize,
    freq_array_mem: Vec<Float>,
    time_array_mem: Vec<Float>,
    total_impedance_mem: Vec<Complex<Float>>,
    fft: RealFft,
    memory: Vec<Float>,
    induced_voltage: Vec<Float>,
}

impl InducedVoltageMemory {
    pub fn new(
        sources: Vec<Box<dyn ImpedanceSource>>,
        profile: &Profile,
        n_turns_memory: usize,
    ) -> Result<InducedVoltageMemory> {
        let mut iv = InducedVoltageMemory {
            sources,
            n_turns_memory,
            n_slices: 0,
            len_array_mem: 0,
            len_array_mem_ext: 0,
            n_points: 0,
            freq_array_mem: Vec::new(),
            time_array_mem: Vec::new(),
            total_impedance_mem: Vec::new(),
            fft: RealFft::new(profile.n_slices),
            memory: Vec::new(),
            induced_voltage: Vec::new(),
        };
        iv.reprocess(profile)?;
        Ok(iv)
    }

    pub fn n_turns_memory(&self) -> usize {
        self.n_turns_memory
    }

    /// Transform length, the smallest 5-smooth number holding
    /// `n_turns_memory + 2` windows.
    pub fn n_points(&self) -> usize {
        self.n_points
    }

    pub fn len_array_mem(&self) -> usize {
        self.len_array_mem
    }

    pub fn len_array_mem_ext(&self) -> usize {
        self.len_array_mem_ext
    }

    /// Bin centres of the current window and of the following
    /// `n_turns_memory` windows.
    pub fn time_array_mem(&self) -> &[Float] {
        &self.time_array_mem
    }

    pub fn freq_array_mem(&self) -> &[Float] {
        &self.freq_array_mem
    }

    /// Voltage accumulated over the remembered turns; the first `n_slices`
    /// values are the current window.
    pub fn memory_buffer(&self) -> &[Float] {
        &self.memory
    }
}

impl InducedVoltage for InducedVoltageMemory {
    fn reprocess(&mut self, profile: &Profile) -> Result<()> {
        let n_slices = profile.n_slices;
        let dt = profile.time_resolution();
        self.n_slices = n_slices;
        self.len_array_mem = (self.n_turns_memory + 1) * n_slices;
        self.len_array_mem_ext = (self.n_turns_memory + 2) * n_slices;
        self.n_points = next_regular(self.len_array_mem_ext);
        self.freq_array_mem = rfftfreq(self.n_points, dt);

        let window = profile.edges[n_slices] - profile.edges[0];
        self.time_array_mem = (0..=self.n_turns_memory)
            .flat_map(|i| {
                profile
                    .bin_centers
                    .iter()
                    .map(move |t| t + window * i as Float)
            })
            .collect();

        self.total_impedance_mem = sum_impedances(&self.sources, &self.freq_array_mem)?;
        self.fft = RealFft::new(self.n_points);
        self.memory = vec![0.0; self.len_array_mem];
        self.induced_voltage = vec![0.0; n_slices];
        Ok(())
    }

    fn induced_voltage_generation(
        &mut self,
        profile: &Profile,
        beam: &Beam,
        charge: Float,
        length: Option<usize>,
    ) -> Result<Vec<Float>> {
        if !cfg!(feature = "unchecked") {
            assert_eq!(profile.n_slices, self.n_slices);
        }
        let spectrum = profile.beam_spectrum(&mut self.fft);
        let product: Vec<Complex<Float>> = self
            .total_impedance_mem
            .iter()
            .zip(spectrum.iter())
            .map(|(z, s)| z * s)
            .collect();
        let voltage = self.fft.irfft(&product);
        let factor = -charge * E * beam.ratio() * self.freq_array_mem[1] * self.n_points as Float;

        // drop the window that just passed, open an empty one at the far end
        let n_slices = self.n_slices;
        let len = self.len_array_mem;
        self.memory.copy_within(n_slices.., 0);
        for m in self.memory[len - n_slices..].iter_mut() {
            *m = 0.0;
        }
        for (m, v) in self.memory.iter_mut().zip(voltage.iter()) {
            *m += factor * v;
        }

        self.induced_voltage.clear();
        self.induced_voltage
            .extend_from_slice(&self.memory[..n_slices]);
        Ok(fit_length(self.induced_voltage.clone(), length))
    }

    fn induced_voltage(&self) -> &[Float] {
        &self.induced_voltage
    }
}
