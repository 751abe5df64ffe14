#![allow(dead_code)]

use longtrack_rs::beam::Beam;
use longtrack_rs::params::{Particle, RfParameters, RingParameters};
use longtrack_rs::profile::Profile;
use longtrack_rs::{Config, Float};
use std::str::FromStr;

pub const GAMMA_T: Float = 55.759505;
pub const HARMONIC: Float = 35640.0;

// A small LHC-like run with one generator of each kind.
pub const CONFIG: &str = r#"
[setup]
n_turns = 20
stats_interval = 5

[ring]
circumference = 26658.883
momentum_initial = 450e9
momentum_final = 450e9
gamma_transition = 55.759505
particle = "proton"

[[rf]]
harmonic = 35640.0
voltage = 6e6

[beam]
n_macroparticles = 2000
intensity = 1e10
distribution = "bigaussian"
bunch_length = 1e-9
seed = 1234

[profile]
n_slices = 64

[[collective]]
domain = "time"
convolution = "fft"

[[collective.resonators]]
r_shunt = 1e5
f_res = 2e9
q = 1.0

[[collective]]
domain = "frequency"
freq_resolution = 1e8
save_individual_voltages = true

[[collective.resonators]]
r_shunt = 1e5
f_res = 2e9
q = 1.0

[[collective.resonators]]
r_shunt = 5e4
f_res = 4e9
q = 5.0

[[collective]]
domain = "frequency"
n_turns_memory = 2

[[collective.resonators]]
r_shunt = 1e6
f_res = 1e9
q = 100.0

[output]
write_output = false
output_interval = 10
stride = 10
"#;

pub fn setup_config() -> Config {
    // This sets up a small run so that it can be used in testing
    Config::from_str(CONFIG).unwrap()
}

pub fn setup_ring(n_turns: usize, p_i: Float, p_f: Float) -> RingParameters {
    RingParameters::linear_ramp(
        n_turns,
        26658.883,
        p_i,
        p_f,
        &[GAMMA_T.powi(-2)],
        1,
        Particle::Proton,
    )
    .unwrap()
}

pub fn setup_rf(ring: &RingParameters, voltage: Float) -> RfParameters {
    let n = ring.n_turns + 1;
    RfParameters::new(
        ring,
        vec![vec![HARMONIC; n]],
        vec![vec![voltage; n]],
        vec![vec![0.0; n]],
    )
    .unwrap()
}

/// Deterministic bunch of `n` particles spread over `[centre - half, centre + half]`.
pub fn setup_beam(n: usize, centre: Float, half: Float) -> Beam {
    let mut beam = Beam::new(n, 1e11);
    beam.dt = (0..n)
        .map(|i| {
            let u = ((i as Float) * 0.618_033_988_7).fract();
            // denser in the middle
            let x = 2.0 * u - 1.0;
            centre + half * x * x.abs()
        })
        .collect();
    beam.de = (0..n)
        .map(|i| 1e8 * (((i as Float) * 0.754_877_666).fract() - 0.5))
        .collect();
    beam
}

pub fn setup_profile(beam: &Beam, n_slices: usize, cut_left: Float, cut_right: Float) -> Profile {
    let mut profile = Profile::with_cuts(n_slices, cut_left, cut_right).unwrap();
    profile.track(beam);
    profile
}
