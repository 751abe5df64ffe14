use crate::beam::Beam;
use crate::induced_voltage::TotalInducedVoltage;
use crate::params::{DriftSolver, RfParameters, RingParameters};
use crate::profile::Profile;
use crate::{Float, PRTL_CHUNK_SIZE};
use anyhow::Result;
use rayon::prelude::*;
use tracing::debug;

/// Where a turn stands. A tracker starts `Idle`, walks through one stage per
/// [`Tracker::advance`] and comes back to `Idle` at the end of each turn,
/// until the last turn leaves it `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Kicking,
    Drifting,
    Slicing,
    ComputingInducedVoltage,
    Finished,
}

/// The RF kick and the drift through the arc.
pub struct RingAndRfSection {
    acceleration_kick: Vec<Float>,
    solver: DriftSolver,
}

impl RingAndRfSection {
    pub fn new(rf: &RfParameters, solver: DriftSolver) -> RingAndRfSection {
        RingAndRfSection {
            acceleration_kick: rf.e_increment.iter().map(|e| -e).collect(),
            solver,
        }
    }

    pub fn solver(&self) -> DriftSolver {
        self.solver
    }

    /// Energy kick of every cavity at turn `index`, plus the share of the
    /// synchronous energy gain each cavity takes away.
    pub fn kick(&self, ring: &RingParameters, rf: &RfParameters, beam: &mut Beam, index: usize) {
        let acc_kick = self.acceleration_kick[index] / rf.n_rf as Float;
        for j in 0..rf.n_rf {
            let voltage = ring.charge * rf.voltage[j][index];
            let omega_rf = rf.omega_rf[j][index];
            let phi_rf = rf.phi_rf[j][index];
            (&beam.dt[..], &mut beam.de[..])
                .into_par_iter()
                .chunks(PRTL_CHUNK_SIZE)
                .for_each(|o| {
                    o.into_iter().for_each(|(dt, de)| {
                        *de += voltage * (omega_rf * dt + phi_rf).sin() + acc_kick;
                    })
                });
        }
    }

    /// Arrival time update over one turn with the ring state at `index`.
    pub fn drift(&self, ring: &RingParameters, rf: &RfParameters, beam: &mut Beam, index: usize) {
        let t = ring.t_rev[index] * rf.length_ratio;
        let beta = ring.beta[index];
        let energy = ring.energy[index];
        let eta_0 = ring.eta_0[index];
        match self.solver {
            DriftSolver::Simple => {
                let coeff = t * eta_0 / (beta * beta * energy);
                (&mut beam.dt[..], &beam.de[..])
                    .into_par_iter()
                    .chunks(PRTL_CHUNK_SIZE)
                    .for_each(|o| {
                        o.into_iter().for_each(|(dt, de)| {
                            *dt += coeff * de;
                        })
                    });
            }
            DriftSolver::Legacy => {
                let eta_1 = ring.eta_1[index];
                let eta_2 = ring.eta_2[index];
                let inv = (beta * beta * energy).powi(-1);
                (&mut beam.dt[..], &beam.de[..])
                    .into_par_iter()
                    .chunks(PRTL_CHUNK_SIZE)
                    .for_each(|o| {
                        o.into_iter().for_each(|(dt, de)| {
                            let delta = de * inv;
                            let slip = delta * (eta_0 + delta * (eta_1 + delta * eta_2));
                            *dt += t * ((1.0 - slip).powi(-1) - 1.0);
                        })
                    });
            }
        }
    }
}

/// Owns everything a run mutates and drives it turn by turn.
pub struct Tracker {
    pub ring: RingParameters,
    pub rf: RfParameters,
    pub beam: Beam,
    pub profile: Profile,
    pub induced_voltage: Option<TotalInducedVoltage>,
    section: RingAndRfSection,
    state: TrackerState,
    counter: usize,
}

impl Tracker {
    pub fn new(
        ring: RingParameters,
        rf: RfParameters,
        beam: Beam,
        profile: Profile,
        induced_voltage: Option<TotalInducedVoltage>,
        solver: DriftSolver,
    ) -> Tracker {
        let section = RingAndRfSection::new(&rf, solver);
        Tracker {
            ring,
            rf,
            beam,
            profile,
            induced_voltage,
            section,
            state: TrackerState::Idle,
            counter: 0,
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Turns completed so far.
    pub fn turn(&self) -> usize {
        self.counter
    }

    pub fn n_turns(&self) -> usize {
        self.ring.n_turns
    }

    /// Run the stage the tracker is in and move to the next one.
    pub fn advance(&mut self) -> Result<TrackerState> {
        self.state = match self.state {
            TrackerState::Idle if self.counter >= self.ring.n_turns => TrackerState::Finished,
            TrackerState::Idle => TrackerState::Kicking,
            TrackerState::Kicking => {
                self.section
                    .kick(&self.ring, &self.rf, &mut self.beam, self.counter);
                TrackerState::Drifting
            }
            TrackerState::Drifting => {
                self.section
                    .drift(&self.ring, &self.rf, &mut self.beam, self.counter + 1);
                TrackerState::Slicing
            }
            TrackerState::Slicing => {
                self.profile.track(&self.beam);
                TrackerState::ComputingInducedVoltage
            }
            TrackerState::ComputingInducedVoltage => {
                if let Some(total) = self.induced_voltage.as_mut() {
                    total.track(&self.profile, &mut self.beam, self.ring.charge)?;
                }
                self.counter += 1;
                if self.counter >= self.ring.n_turns {
                    TrackerState::Finished
                } else {
                    TrackerState::Idle
                }
            }
            TrackerState::Finished => TrackerState::Finished,
        };
        Ok(self.state)
    }

    /// One full turn. Does nothing once finished.
    pub fn step(&mut self) -> Result<TrackerState> {
        if self.state == TrackerState::Finished {
            return Ok(self.state);
        }
        loop {
            match self.advance()? {
                TrackerState::Idle | TrackerState::Finished => break,
                _ => {}
            }
        }
        debug!(turn = self.counter, "turn done");
        Ok(self.state)
    }

    pub fn run(&mut self) -> Result<()> {
        while self.step()? != TrackerState::Finished {}
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Particle;
    use approx::assert_relative_eq;

    fn setup(n_turns: usize, voltage: Float, solver: DriftSolver) -> Tracker {
        let gamma_t: Float = 55.759505;
        let ring = RingParameters::linear_ramp(
            n_turns,
            26658.883,
            450e9,
            450e9,
            &[gamma_t.powi(-2)],
            1,
            Particle::Proton,
        )
        .unwrap();
        let n = n_turns + 1;
        let rf = RfParameters::new(
            &ring,
            vec![vec![35640.0; n]],
            vec![vec![voltage; n]],
            vec![vec![0.0; n]],
        )
        .unwrap();
        let mut beam = Beam::new(4, 1e9);
        beam.dt = vec![-0.2e-9, -0.1e-9, 0.1e-9, 0.3e-9];
        beam.de = vec![1e8, -2e8, 0.0, 5e7];
        let profile = Profile::with_cuts(10, -1.25e-9, 1.25e-9).unwrap();
        Tracker::new(ring, rf, beam, profile, None, solver)
    }

    #[test]
    fn stages_run_in_order() {
        let mut tracker = setup(2, 6e6, DriftSolver::Simple);
        assert_eq!(tracker.state(), TrackerState::Idle);
        let expected = [
            TrackerState::Kicking,
            TrackerState::Drifting,
            TrackerState::Slicing,
            TrackerState::ComputingInducedVoltage,
            TrackerState::Idle,
        ];
        for s in expected.iter() {
            assert_eq!(tracker.advance().unwrap(), *s);
        }
        assert_eq!(tracker.turn(), 1);
        assert_eq!(tracker.step().unwrap(), TrackerState::Finished);
        assert_eq!(tracker.turn(), 2);
        // finished is terminal
        assert_eq!(tracker.advance().unwrap(), TrackerState::Finished);
        assert_eq!(tracker.turn(), 2);
    }

    #[test]
    fn zero_voltage_turn_only_drifts() {
        let mut tracker = setup(1, 0.0, DriftSolver::Simple);
        let de0 = tracker.beam.de.clone();
        let dt0 = tracker.beam.dt.clone();
        tracker.run().unwrap();
        let ring = &tracker.ring;
        let coeff = ring.t_rev[1] * ring.eta_0[1] / (ring.beta[1] * ring.beta[1] * ring.energy[1]);
        for i in 0..4 {
            assert_eq!(tracker.beam.de[i], de0[i]);
            assert_relative_eq!(tracker.beam.dt[i], dt0[i] + coeff * de0[i], max_relative = 1e-12);
        }
        assert_eq!(tracker.profile.n_macroparticles.iter().sum::<u32>(), 4);
    }

    #[test]
    fn legacy_matches_simple_to_first_order() {
        let mut simple = setup(1, 0.0, DriftSolver::Simple);
        let mut legacy = setup(1, 0.0, DriftSolver::Legacy);
        simple.run().unwrap();
        legacy.run().unwrap();
        for (a, b) in simple.beam.dt.iter().zip(legacy.beam.dt.iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-4);
        }
    }

    #[test]
    fn legacy_drift_keeps_the_higher_order_slippage() {
        use crate::constants::{C, M_P};

        // low energy ring with a strong second order lattice, so that
        // delta is large and eta_1, eta_2 matter
        let (a0, a1, a2): (Float, Float, Float) = (1e-2, 3e-2, -0.5);
        let p: Float = 2e9;
        let circumference: Float = 628.0;
        let ring = RingParameters::new(
            1,
            circumference,
            vec![p; 2],
            &[a0, a1, a2],
            2,
            Particle::Proton,
        )
        .unwrap();
        let rf = RfParameters::new(&ring, vec![vec![8.0; 2]], vec![vec![0.0; 2]], vec![vec![0.0; 2]])
            .unwrap();
        let mut beam = Beam::new(3, 1e9);
        beam.dt = vec![0.0, 1e-9, -2e-9];
        beam.de = vec![2e8, -1.5e8, 0.0];
        let dt0 = beam.dt.clone();

        let section = RingAndRfSection::new(&rf, DriftSolver::Legacy);
        section.drift(&ring, &rf, &mut beam, 1);

        let energy = (p * p + M_P * M_P).sqrt();
        let beta = p / energy;
        let gamma = energy / M_P;
        let b2 = beta * beta;
        let g2inv = 1.0 / (gamma * gamma);
        let t_rev = circumference / (beta * C);
        let eta_0 = a0 - g2inv;
        let eta_1 = 1.5 * b2 * g2inv + a1 - a0 * eta_0;
        let eta_2 = -b2 * (5.0 * b2 - 1.0) / 2.0 * g2inv + a2 - 2.0 * a0 * a1 + a1 * g2inv
            + a0 * a0 * eta_0
            - 1.5 * b2 * a0 * g2inv;
        assert!(eta_1.abs() > 1e-3 && eta_2.abs() > 1e-2);

        for i in 0..3 {
            let delta = beam.de[i] / (b2 * energy);
            let slip = eta_0 * delta + eta_1 * delta * delta + eta_2 * delta * delta * delta;
            let expected = dt0[i] + t_rev * (1.0 / (1.0 - slip) - 1.0);
            assert_relative_eq!(beam.dt[i], expected, max_relative = 1e-10, epsilon = 1e-22);

            // first order alone is measurably off
            if beam.de[i] != 0.0 {
                let first = dt0[i] + t_rev * eta_0 * delta;
                assert!((beam.dt[i] - first).abs() > 1e-3 * (first - dt0[i]).abs());
            }
        }
    }

    #[test]
    fn synchronous_particle_stays_put() {
        let mut tracker = setup(50, 6e6, DriftSolver::Simple);
        let phi_s = tracker.rf.phi_s[0];
        tracker.beam.dt = vec![phi_s / tracker.rf.omega_rf[0][0]; 4];
        tracker.beam.de = vec![0.0; 4];
        tracker.run().unwrap();
        for de in &tracker.beam.de {
            assert!(de.abs() < 1e-3);
        }
    }
}
