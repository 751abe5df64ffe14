use crate::Float;
use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;
use rustfft::FftPlanner;

/// Real-input transforms of a fixed length `n`, with numpy's `rfft`/`irfft`
/// conventions: the spectrum holds the `n / 2 + 1` non-negative frequencies
/// and the inverse is normalised by `1 / n`.
///
/// The plans and the work buffers are built once and reused.
pub struct RealFft {
    n: usize,
    fft: std::sync::Arc<dyn rustfft::Fft<Float>>,
    ifft: std::sync::Arc<dyn rustfft::Fft<Float>>,
    buffer: Vec<Complex<Float>>,
    scratch: Vec<Complex<Float>>,
}

impl RealFft {
    pub fn new(n: usize) -> RealFft {
        let mut planner = FftPlanner::<Float>::new();
        let fft = planner.plan_fft_forward(n);
        let ifft = planner.plan_fft_inverse(n);
        let scratch_len = fft
            .get_inplace_scratch_len()
            .max(ifft.get_inplace_scratch_len());
        RealFft {
            n,
            fft,
            ifft,
            buffer: vec![Complex::zero(); n],
            scratch: vec![Complex::zero(); scratch_len],
        }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Number of bins of the one-sided spectrum.
    pub fn spectrum_len(&self) -> usize {
        self.n / 2 + 1
    }

    /// One-sided spectrum of `input`, zero-padded or truncated to `n` samples.
    pub fn rfft(&mut self, input: &[Float]) -> Vec<Complex<Float>> {
        if self.n == 0 {
            return Vec::new();
        }
        for (i, v) in self.buffer.iter_mut().enumerate() {
            *v = match input.get(i) {
                Some(&x) => Complex::new(x, 0.0),
                None => Complex::zero(),
            };
        }
        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);
        self.buffer[..self.spectrum_len()].to_vec()
    }

    /// `n` real samples whose one-sided spectrum is `spectrum`. Missing bins
    /// count as zero, extra bins are ignored.
    pub fn irfft(&mut self, spectrum: &[Complex<Float>]) -> Vec<Float> {
        let n = self.n;
        if n == 0 {
            return Vec::new();
        }
        for v in self.buffer.iter_mut() {
            *v = Complex::zero();
        }
        // rebuild the hermitian half we never stored
        for k in 0..=n / 2 {
            let v = spectrum.get(k).copied().unwrap_or_else(Complex::zero);
            self.buffer[k] = v;
            if k > 0 && n - k != k {
                self.buffer[n - k] = v.conj();
            }
        }
        self.ifft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);
        let norm = (n as Float).powi(-1);
        self.buffer.iter().map(|v| v.re * norm).collect()
    }
}

/// Frequencies of the `n / 2 + 1` bins of an `n`-point real transform with
/// sample spacing `d`.
pub fn rfftfreq(n: usize, d: Float) -> Vec<Float> {
    let norm = (n as Float * d).powi(-1);
    (0..n / 2 + 1).map(|i| i as Float * norm).collect()
}
