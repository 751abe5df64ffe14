use crate::{Float, PI, PRTL_CHUNK_SIZE};
use itertools::izip;
use rayon::prelude::*;

/// The macroparticle ensemble.
///
/// `dt` is the arrival time offset [s] and `de` the energy offset [eV]
/// relative to the synchronous particle. `id == 0` marks a lost particle;
/// lost particles keep their slot in every array.
pub struct Beam {
    pub dt: Vec<Float>,
    pub de: Vec<Float>,
    pub id: Vec<u32>,
    pub intensity: Float,
    pub n_macroparticles: usize,
    pub mean_dt: Float,
    pub mean_de: Float,
    pub sigma_dt: Float,
    pub sigma_de: Float,
    pub epsn_rms_l: Float, // [eVs]
    pub n_macroparticles_lost: usize,
}

impl Beam {
    pub fn new(n_macroparticles: usize, intensity: Float) -> Beam {
        Beam {
            dt: vec![0.0; n_macroparticles],
            de: vec![0.0; n_macroparticles],
            id: (1..=n_macroparticles as u32).collect(),
            intensity,
            n_macroparticles,
            mean_dt: 0.0,
            mean_de: 0.0,
            sigma_dt: 0.0,
            sigma_de: 0.0,
            epsn_rms_l: 0.0,
            n_macroparticles_lost: 0,
        }
    }

    /// Real particles carried by one macroparticle.
    #[inline(always)]
    pub fn ratio(&self) -> Float {
        self.intensity / self.n_macroparticles as Float
    }

    pub fn n_macroparticles_alive(&self) -> usize {
        self.n_macroparticles - self.n_macroparticles_lost
    }

    /// Means, RMS sizes and emittance over the particles still alive.
    /// With every particle lost the moments come out as NaN.
    pub fn statistics(&mut self) {
        let (sum_dt, sum_de, n) = izip!(&self.dt, &self.de, &self.id)
            .filter(|(_, _, id)| **id != 0)
            .fold((0.0 as Float, 0.0 as Float, 0usize), |(a, b, n), (dt, de, _)| {
                (a + dt, b + de, n + 1)
            });
        let mean_dt = sum_dt / n as Float;
        let mean_de = sum_de / n as Float;
        let (var_dt, var_de) = izip!(&self.dt, &self.de, &self.id)
            .filter(|(_, _, id)| **id != 0)
            .fold((0.0 as Float, 0.0 as Float), |(a, b), (dt, de, _)| {
                (
                    a + (dt - mean_dt) * (dt - mean_dt),
                    b + (de - mean_de) * (de - mean_de),
                )
            });
        self.mean_dt = mean_dt;
        self.mean_de = mean_de;
        self.sigma_dt = (var_dt / n as Float).sqrt();
        self.sigma_de = (var_de / n as Float).sqrt();
        self.epsn_rms_l = PI * self.sigma_de * self.sigma_dt;
        self.n_macroparticles_lost = self.n_macroparticles - n;
    }

    /// Flag as lost every particle with `dt` outside `[dt_min, dt_max]`.
    pub fn losses_longitudinal_cut(&mut self, dt_min: Float, dt_max: Float) {
        (&self.dt[..], &mut self.id[..])
            .into_par_iter()
            .chunks(PRTL_CHUNK_SIZE)
            .for_each(|o| {
                o.into_iter().for_each(|(dt, id)| {
                    if (dt - dt_min) * (dt_max - dt) < 0.0 {
                        *id = 0;
                    }
                })
            });
    }

    /// Flag as lost every particle with `de` outside `[de_min, de_max]`.
    pub fn losses_energy_cut(&mut self, de_min: Float, de_max: Float) {
        (&self.de[..], &mut self.id[..])
            .into_par_iter()
            .chunks(PRTL_CHUNK_SIZE)
            .for_each(|o| {
                o.into_iter().for_each(|(de, id)| {
                    if (de - de_min) * (de_max - de) < 0.0 {
                        *id = 0;
                    }
                })
            });
    }
}
