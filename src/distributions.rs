use crate::beam::Beam;
use crate::params::{RfParameters, RingParameters};
use crate::{Float, PI};
use itertools::izip;
use rand::prelude::*;
use rand_distr::StandardNormal;
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    Bigaussian,
}

/// Gaussian in both `dt` and `de`, centred on the synchronous phase of the
/// main cavity at the current turn `counter`.
///
/// When `sigma_de` is 0 it is taken from the bucket height seen by a
/// particle at `sigma_dt` from the centre. Only the first cavity is used.
pub fn longitudinal_bigaussian(
    ring: &RingParameters,
    rf: &RfParameters,
    beam: &mut Beam,
    counter: usize,
    sigma_dt: Float,
    sigma_de: Float,
    seed: u64,
) {
    let harmonic = rf.harmonic[0][counter];
    let energy = ring.energy[counter];
    let beta = ring.beta[counter];
    let omega_rf = rf.omega_rf[0][counter];
    let phi_s = rf.phi_s[counter];
    let phi_rf = rf.phi_rf[0][counter];
    let eta_0 = ring.eta_0[counter];

    let sigma_de = if sigma_de == 0.0 {
        let voltage = ring.charge * rf.voltage[0][counter];
        let phi_b = omega_rf * sigma_dt + phi_s;
        (voltage * energy * beta * beta
            * (phi_b.cos() - phi_s.cos() + (phi_b - phi_s) * phi_s.sin())
            / (PI * harmonic * eta_0))
            .abs()
            .sqrt()
    } else {
        sigma_de
    };

    let centre = if eta_0 > 0.0 {
        (phi_s - phi_rf) / omega_rf
    } else {
        (phi_s - phi_rf - PI) / omega_rf
    };

    let mut rng = StdRng::seed_from_u64(seed);
    for (dt, de) in izip!(&mut beam.dt, &mut beam.de) {
        let r: Float = rng.sample(StandardNormal);
        *dt = sigma_dt * r + centre;
        let r: Float = rng.sample(StandardNormal);
        *de = sigma_de * r;
    }
    beam.sigma_dt = sigma_dt;
    beam.sigma_de = sigma_de;
}
