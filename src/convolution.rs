use crate::smooth::next_regular;
use crate::spectrum::RealFft;
use crate::Float;
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConvolutionMode {
    Direct,
    Fft,
}

impl Default for ConvolutionMode {
    fn default() -> Self {
        ConvolutionMode::Fft
    }
}

/// Full linear convolution, `signal.len() + kernel.len() - 1` samples.
pub fn convolve(signal: &[Float], kernel: &[Float], mode: ConvolutionMode) -> Vec<Float> {
    match mode {
        ConvolutionMode::Direct => convolve_direct(signal, kernel),
        ConvolutionMode::Fft => convolve_fft(signal, kernel),
    }
}

/// `res[n] = sum_j signal[j] * kernel[n - j]`, one output sample per task.
pub fn convolve_direct(signal: &[Float], kernel: &[Float]) -> Vec<Float> {
    if signal.is_empty() || kernel.is_empty() {
        return Vec::new();
    }
    let signal_len = signal.len();
    let kernel_len = kernel.len();
    let size = signal_len + kernel_len - 1;
    (0..size)
        .into_par_iter()
        .map(|n| {
            let kmin = if n >= kernel_len - 1 {
                n - (kernel_len - 1)
            } else {
                0
            };
            let kmax = n.min(signal_len - 1);
            (kmin..=kmax)
                .map(|k| signal[k] * kernel[n - k])
                .sum::<Float>()
        })
        .collect()
}

/// Same result as [`convolve_direct`], computed in the frequency domain.
pub fn convolve_fft(signal: &[Float], kernel: &[Float]) -> Vec<Float> {
    if signal.is_empty() || kernel.is_empty() {
        return Vec::new();
    }
    FftConvolver::new(kernel, signal.len()).convolve(signal)
}

/// Transform-domain convolution against a fixed kernel.
///
/// The kernel spectrum is computed once, so repeated calls only pay for one
/// forward and one inverse transform of the padded signal. The padded length
/// is the smallest 5-smooth number that holds the whole linear convolution,
/// which keeps the circular product free of wrap-around.
pub struct FftConvolver {
    signal_len: usize,
    output_len: usize,
    kernel_spectrum: Vec<Complex<Float>>,
    fft: RealFft,
}

impl FftConvolver {
    pub fn new(kernel: &[Float], signal_len: usize) -> FftConvolver {
        let output_len = (signal_len + kernel.len()).saturating_sub(1);
        let shape = next_regular(output_len);
        if !cfg!(feature = "unchecked") {
            assert!(shape >= output_len);
        }
        let mut fft = RealFft::new(shape);
        let kernel_spectrum = fft.rfft(kernel);
        FftConvolver {
            signal_len,
            output_len,
            kernel_spectrum,
            fft,
        }
    }

    /// Padded transform length.
    pub fn shape(&self) -> usize {
        self.fft.len()
    }

    pub fn output_len(&self) -> usize {
        self.output_len
    }

    pub fn convolve(&mut self, signal: &[Float]) -> Vec<Float> {
        if !cfg!(feature = "unchecked") {
            assert_eq!(signal.len(), self.signal_len);
        }
        let mut spectrum = self.fft.rfft(signal);
        for (s, k) in spectrum.iter_mut().zip(self.kernel_spectrum.iter()) {
            *s *= *k;
        }
        let mut res = self.fft.irfft(&spectrum);
        res.truncate(self.output_len);
        res
    }
}
