//! Turn-indexed machine and RF tables.
//!
//! The tracker only ever reads these. Every per-turn table has `n_turns + 1`
//! entries, one for the start of each turn plus the final state, except the
//! energy increment which has one entry per turn.

use crate::constants::{C, M_E, M_P};
use crate::error::ConfigError;
use crate::{CavityConfig, Float, RingConfig, PI};
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Particle {
    Proton,
    Electron,
}

impl Particle {
    /// Rest mass [eV/c^2]
    pub fn mass(&self) -> Float {
        match self {
            Particle::Proton => M_P,
            Particle::Electron => M_E,
        }
    }

    /// Charge in units of the elementary charge.
    pub fn charge(&self) -> Float {
        match self {
            Particle::Proton => 1.0,
            Particle::Electron => -1.0,
        }
    }
}

/// How the drift map treats the momentum compaction.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DriftSolver {
    /// First order in the slippage factor.
    Simple,
    /// Slippage expanded up to `eta_2`.
    Legacy,
}

impl Default for DriftSolver {
    fn default() -> Self {
        DriftSolver::Simple
    }
}

pub struct RingParameters {
    pub n_turns: usize,
    pub circumference: Float,
    pub particle: Particle,
    pub mass: Float,
    pub charge: Float,
    pub alpha_order: usize,
    pub alpha: [Float; 3],
    pub momentum: Vec<Float>,
    pub beta: Vec<Float>,
    pub gamma: Vec<Float>,
    pub energy: Vec<Float>,
    pub t_rev: Vec<Float>,
    pub eta_0: Vec<Float>,
    pub eta_1: Vec<Float>,
    pub eta_2: Vec<Float>,
}

impl RingParameters {
    /// `momentum` is the synchronous momentum program [eV/c], one value per
    /// turn boundary. `alpha` holds the momentum compaction coefficients up
    /// to `alpha_order`; missing ones are zero.
    pub fn new(
        n_turns: usize,
        circumference: Float,
        momentum: Vec<Float>,
        alpha: &[Float],
        alpha_order: usize,
        particle: Particle,
    ) -> Result<RingParameters, ConfigError> {
        if n_turns == 0 {
            return Err(ConfigError::NoTurns);
        }
        if alpha_order > 2 {
            return Err(ConfigError::AlphaOrder(alpha_order));
        }
        if momentum.len() != n_turns + 1 {
            return Err(ConfigError::TableLength {
                name: "momentum",
                got: momentum.len(),
                expected: n_turns + 1,
            });
        }
        let mut coeffs = [0.0; 3];
        for (c, a) in coeffs.iter_mut().zip(alpha.iter()).take(alpha_order + 1) {
            *c = *a;
        }

        let mass = particle.mass();
        let energy: Vec<Float> = momentum
            .iter()
            .map(|p| (p * p + mass * mass).sqrt())
            .collect();
        let beta: Vec<Float> = momentum
            .iter()
            .zip(energy.iter())
            .map(|(p, e)| p / e)
            .collect();
        let gamma: Vec<Float> = energy.iter().map(|e| e / mass).collect();
        let t_rev: Vec<Float> = beta.iter().map(|b| circumference / (b * C)).collect();

        let [a0, a1, a2] = coeffs;
        let mut eta_0 = vec![0.0; n_turns + 1];
        let mut eta_1 = vec![0.0; n_turns + 1];
        let mut eta_2 = vec![0.0; n_turns + 1];
        for i in 0..=n_turns {
            let b2 = beta[i] * beta[i];
            let g2inv = gamma[i].powi(-2);
            eta_0[i] = a0 - g2inv;
            if alpha_order >= 1 {
                eta_1[i] = 1.5 * b2 * g2inv + a1 - a0 * eta_0[i];
            }
            if alpha_order >= 2 {
                eta_2[i] = -b2 * (5.0 * b2 - 1.0) * 0.5 * g2inv + a2 - 2.0 * a0 * a1
                    + a1 * g2inv
                    + a0 * a0 * eta_0[i]
                    - 1.5 * b2 * a0 * g2inv;
            }
        }

        Ok(RingParameters {
            n_turns,
            circumference,
            particle,
            mass,
            charge: particle.charge(),
            alpha_order,
            alpha: coeffs,
            momentum,
            beta,
            gamma,
            energy,
            t_rev,
            eta_0,
            eta_1,
            eta_2,
        })
    }

    /// Momentum ramped linearly from `p_i` to `p_f` over `n_turns`.
    pub fn linear_ramp(
        n_turns: usize,
        circumference: Float,
        p_i: Float,
        p_f: Float,
        alpha: &[Float],
        alpha_order: usize,
        particle: Particle,
    ) -> Result<RingParameters, ConfigError> {
        let momentum = linspace(p_i, p_f, n_turns + 1);
        RingParameters::new(n_turns, circumference, momentum, alpha, alpha_order, particle)
    }

    pub fn from_config(cfg: &RingConfig, n_turns: usize) -> Result<RingParameters, ConfigError> {
        let alpha = [
            cfg.gamma_transition.powi(-2),
            cfg.alpha_1,
            cfg.alpha_2,
        ];
        RingParameters::linear_ramp(
            n_turns,
            cfg.circumference,
            cfg.momentum_initial,
            cfg.momentum_final,
            &alpha,
            cfg.alpha_order,
            cfg.particle,
        )
    }

    /// Energy gained by the synchronous particle on each turn [eV].
    pub fn energy_increment(&self) -> Vec<Float> {
        self.energy.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

pub struct RfParameters {
    pub n_rf: usize,
    pub harmonic: Vec<Vec<Float>>,
    pub voltage: Vec<Vec<Float>>,
    pub phi_rf: Vec<Vec<Float>>,
    pub omega_rf: Vec<Vec<Float>>,
    pub e_increment: Vec<Float>,
    pub phi_s: Vec<Float>,
    // Fraction of the ring covered by this section.
    pub length_ratio: Float,
}

impl RfParameters {
    /// One row per cavity in `harmonic`, `voltage` and `phi_rf`, each row
    /// `n_turns + 1` long.
    pub fn new(
        ring: &RingParameters,
        harmonic: Vec<Vec<Float>>,
        voltage: Vec<Vec<Float>>,
        phi_rf: Vec<Vec<Float>>,
    ) -> Result<RfParameters, ConfigError> {
        let n_rf = harmonic.len();
        if n_rf == 0 {
            return Err(ConfigError::NoCavities);
        }
        let n = ring.n_turns + 1;
        let tables = [("harmonic", &harmonic), ("voltage", &voltage), ("phi_rf", &phi_rf)];
        for &(name, table) in tables.iter() {
            if table.len() != n_rf {
                return Err(ConfigError::TableLength {
                    name,
                    got: table.len(),
                    expected: n_rf,
                });
            }
            if let Some(row) = table.iter().find(|row| row.len() != n) {
                return Err(ConfigError::TableLength {
                    name,
                    got: row.len(),
                    expected: n,
                });
            }
        }

        let omega_rf: Vec<Vec<Float>> = harmonic
            .iter()
            .map(|h| {
                h.iter()
                    .zip(ring.beta.iter())
                    .map(|(h, b)| 2.0 * PI * b * C * h / ring.circumference)
                    .collect()
            })
            .collect();

        let e_increment = ring.energy_increment();

        // Synchronous phase of the main cavity. An acceleration the cavity
        // cannot provide gives NaN.
        let phi_s = (0..n)
            .map(|i| {
                let de = e_increment[i.min(ring.n_turns - 1)];
                let ratio = de / (ring.charge * voltage[0][i]);
                let phi = ratio.asin();
                if ring.eta_0[i] > 0.0 {
                    PI - phi
                } else {
                    phi
                }
            })
            .collect();

        Ok(RfParameters {
            n_rf,
            harmonic,
            voltage,
            phi_rf,
            omega_rf,
            e_increment,
            phi_s,
            length_ratio: 1.0,
        })
    }

    /// Constant programs, one cavity per entry.
    pub fn from_config(
        cavities: &[CavityConfig],
        ring: &RingParameters,
    ) -> Result<RfParameters, ConfigError> {
        let n = ring.n_turns + 1;
        let harmonic = cavities.iter().map(|c| vec![c.harmonic; n]).collect();
        let voltage = cavities.iter().map(|c| vec![c.voltage; n]).collect();
        let phi_rf = cavities.iter().map(|c| vec![c.phi_offset; n]).collect();
        RfParameters::new(ring, harmonic, voltage, phi_rf)
    }
}

pub(crate) fn linspace(start: Float, end: Float, n: usize) -> Vec<Float> {
    if n == 1 {
        return vec![start];
    }
    let step = (end - start) / (n - 1) as Float;
    (0..n).map(|i| start + i as Float * step).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn lhc_like(n_turns: usize) -> RingParameters {
        let gamma_t: Float = 55.759505;
        RingParameters::linear_ramp(
            n_turns,
            26658.883,
            450e9,
            460.005e9,
            &[gamma_t.powi(-2)],
            1,
            Particle::Proton,
        )
        .unwrap()
    }

    #[test]
    fn tables_have_one_entry_per_turn_boundary() {
        let ring = lhc_like(10);
        assert_eq!(ring.momentum.len(), 11);
        assert_eq!(ring.eta_0.len(), 11);
        assert_eq!(ring.energy_increment().len(), 10);
        assert_relative_eq!(ring.momentum[10], 460.005e9, max_relative = 1e-12);
    }

    #[test]
    fn relativistic_quantities() {
        let ring = lhc_like(1);
        let e0 = (450e9 as Float * 450e9 + M_P * M_P).sqrt();
        assert_relative_eq!(ring.energy[0], e0, max_relative = 1e-12);
        assert_relative_eq!(ring.beta[0], 450e9 / e0, max_relative = 1e-12);
        assert_relative_eq!(ring.t_rev[0], 26658.883 / (ring.beta[0] * C), max_relative = 1e-12);
        let gamma_t: Float = 55.759505;
        let expected_eta = gamma_t.powi(-2) - ring.gamma[0].powi(-2);
        assert_relative_eq!(ring.eta_0[0], expected_eta, max_relative = 1e-12);
        // above transition
        assert!(ring.eta_0[0] > 0.0);
        // higher orders stay off for a first order lattice
        assert_eq!(ring.eta_2[0], 0.0);
    }

    #[test]
    fn momentum_table_length_is_checked() {
        let err = RingParameters::new(3, 1.0, vec![1e9; 3], &[1e-3], 1, Particle::Proton);
        assert!(matches!(err, Err(ConfigError::TableLength { .. })));
    }

    #[test]
    fn rf_angular_frequency() {
        let ring = lhc_like(2);
        let rf = RfParameters::new(
            &ring,
            vec![vec![35640.0; 3]],
            vec![vec![6e6; 3]],
            vec![vec![0.0; 3]],
        )
        .unwrap();
        let f_rev = 1.0 / ring.t_rev[0];
        assert_relative_eq!(rf.omega_rf[0][0], 2.0 * PI * 35640.0 * f_rev, max_relative = 1e-12);
        // above transition the bucket sits near pi
        assert!(rf.phi_s[0] > PI / 2.0 && rf.phi_s[0] <= PI);
    }

    #[test]
    fn missing_cavity_is_an_error() {
        let ring = lhc_like(2);
        let err = RfParameters::new(&ring, vec![], vec![], vec![]);
        assert_eq!(err.err(), Some(ConfigError::NoCavities));
    }
}
