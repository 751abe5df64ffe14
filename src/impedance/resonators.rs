use crate::impedance::ImpedanceSource;
use crate::{Float, ResonatorConfig, PI};
use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;

/// A set of RLC resonators, each given by its shunt impedance [Ohm],
/// resonant frequency [Hz] and quality factor.
pub struct Resonators {
    r_shunt: Vec<Float>,
    f_res: Vec<Float>,
    q: Vec<Float>,
}

impl Resonators {
    pub fn new(r_shunt: Vec<Float>, f_res: Vec<Float>, q: Vec<Float>) -> Resonators {
        if !cfg!(feature = "unchecked") {
            assert_eq!(r_shunt.len(), f_res.len());
            assert_eq!(r_shunt.len(), q.len());
        }
        Resonators { r_shunt, f_res, q }
    }

    pub fn from_config(cfg: &[ResonatorConfig]) -> Resonators {
        Resonators::new(
            cfg.iter().map(|r| r.r_shunt).collect(),
            cfg.iter().map(|r| r.f_res).collect(),
            cfg.iter().map(|r| r.q).collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.r_shunt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.r_shunt.is_empty()
    }
}

impl ImpedanceSource for Resonators {
    fn name(&self) -> &str {
        "resonators"
    }

    fn wake(&self, time: &[Float]) -> Option<Vec<Float>> {
        let mut wake = vec![0.0; time.len()];
        for ((&r, &f), &q) in self.r_shunt.iter().zip(self.f_res.iter()).zip(self.q.iter()) {
            let omega_r = 2.0 * PI * f;
            let alpha = omega_r / (2.0 * q);
            let omega_bar = (omega_r * omega_r - alpha * alpha).sqrt();
            for (w, &t) in wake.iter_mut().zip(time.iter()) {
                // half weight on t = 0, nothing before it
                let step = if t > 0.0 {
                    2.0
                } else if t == 0.0 {
                    1.0
                } else {
                    0.0
                };
                *w += step
                    * r
                    * alpha
                    * (-alpha * t).exp()
                    * ((omega_bar * t).cos() - alpha / omega_bar * (omega_bar * t).sin());
            }
        }
        Some(wake)
    }

    fn impedance(&self, freq: &[Float]) -> Option<Vec<Complex<Float>>> {
        let mut imp = vec![Complex::zero(); freq.len()];
        for ((&r, &f_r), &q) in self.r_shunt.iter().zip(self.f_res.iter()).zip(self.q.iter()) {
            for (z, &f) in imp.iter_mut().zip(freq.iter()) {
                if f == 0.0 {
                    continue;
                }
                *z += Complex::new(r, 0.0) / Complex::new(1.0, q * (f / f_r - f_r / f));
            }
        }
        Some(imp)
    }
}
