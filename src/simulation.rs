use crate::beam::Beam;
use crate::distributions::{longitudinal_bigaussian, Distribution};
use crate::impedance::{ImpedanceSource, Resonators};
use crate::induced_voltage::{
    FreqOptions, InducedVoltage, InducedVoltageFreq, InducedVoltageMemory, InducedVoltageTime,
    TotalInducedVoltage,
};
use crate::params::{RfParameters, RingParameters};
use crate::profile::Profile;
use crate::save::save_output;
use crate::tracker::{Tracker, TrackerState};
use crate::{CollectiveConfig, Config, Output, VoltageDomain};
use anyhow::{Context, Result};
use tracing::{debug, info};

/// A configured run: the tracker plus what the driver needs around it.
pub struct Simulation {
    pub tracker: Tracker,
    output: Output,
    stats_interval: u32,
}

impl Simulation {
    /// Fails on a configuration that does not pass [`Config::validate`].
    pub fn from_config(cfg: &Config) -> Result<Simulation> {
        cfg.validate().context("Invalid configuration")?;
        let n_turns = cfg.setup.n_turns as usize;
        let ring = RingParameters::from_config(&cfg.ring, n_turns)
            .context("Could not build the ring parameters")?;
        let rf = RfParameters::from_config(&cfg.rf, &ring)
            .context("Could not build the RF parameters")?;

        let mut beam = Beam::new(cfg.beam.n_macroparticles, cfg.beam.intensity);
        match cfg.beam.distribution {
            Distribution::Bigaussian => longitudinal_bigaussian(
                &ring,
                &rf,
                &mut beam,
                0,
                cfg.beam.bunch_length / 4.0,
                cfg.beam.sigma_de,
                cfg.beam.seed,
            ),
        }
        beam.statistics();

        let mut profile = Profile::new(
            cfg.profile.n_slices,
            cfg.profile.cut_left,
            cfg.profile.cut_right,
            cfg.profile.n_sigma,
            cfg.profile.cuts_unit,
            // main cavity at the first turn
            rf.omega_rf[0][0],
            &beam,
        )
        .context("Could not build the beam profile")?;
        profile.mode = cfg.profile.mode;
        profile.track(&beam);

        let mut generators = Vec::<Box<dyn InducedVoltage>>::new();
        for collective in &cfg.collective {
            generators.push(build_generator(collective, &profile)?);
        }
        let induced_voltage = if generators.is_empty() {
            None
        } else {
            Some(TotalInducedVoltage::new(generators, &profile))
        };

        info!(
            n_turns,
            n_macroparticles = beam.n_macroparticles,
            n_slices = profile.n_slices,
            cut_left = profile.cut_left,
            cut_right = profile.cut_right,
            generators = cfg.collective.len(),
            "simulation set up"
        );

        let tracker = Tracker::new(
            ring,
            rf,
            beam,
            profile,
            induced_voltage,
            cfg.setup.drift_solver,
        );
        Ok(Simulation {
            tracker,
            output: cfg.output.clone(),
            stats_interval: cfg.setup.stats_interval,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        loop {
            let turn = self.tracker.turn() as u32;
            if self.output.write_output && turn % self.output.output_interval == 0 {
                debug!(turn, "saving output");
                save_output(turn, &self.output, &self.tracker.beam, &self.tracker.profile)?;
            }
            if self.stats_interval > 0 && turn % self.stats_interval == 0 {
                self.log_statistics(turn);
            }
            if self.tracker.step()? == TrackerState::Finished {
                break;
            }
        }

        let turn = self.tracker.turn() as u32;
        if self.output.write_output && turn % self.output.output_interval == 0 {
            save_output(turn, &self.output, &self.tracker.beam, &self.tracker.profile)?;
        }
        self.log_statistics(turn);
        Ok(())
    }

    fn log_statistics(&mut self, turn: u32) {
        let beam = &mut self.tracker.beam;
        beam.statistics();
        info!(
            turn,
            mean_dt = beam.mean_dt,
            sigma_dt = beam.sigma_dt,
            mean_de = beam.mean_de,
            sigma_de = beam.sigma_de,
            epsn_rms_l = beam.epsn_rms_l,
            lost = beam.n_macroparticles_lost,
            "beam statistics"
        );
    }
}

/// One induced-voltage generator per `[[collective]]` entry, with one
/// source per resonator so individual voltages can be told apart.
fn build_generator(cfg: &CollectiveConfig, profile: &Profile) -> Result<Box<dyn InducedVoltage>> {
    let sources: Vec<Box<dyn ImpedanceSource>> = cfg
        .resonators
        .iter()
        .map(|r| Box::new(Resonators::from_config(std::slice::from_ref(r))) as Box<dyn ImpedanceSource>)
        .collect();

    let generator: Box<dyn InducedVoltage> = match cfg.domain {
        VoltageDomain::Time => Box::new(
            InducedVoltageTime::new(sources, profile, cfg.convolution)
                .context("Could not set up a time domain induced voltage")?,
        ),
        VoltageDomain::Frequency if cfg.n_turns_memory > 0 => Box::new(
            InducedVoltageMemory::new(sources, profile, cfg.n_turns_memory)
                .context("Could not set up a multi-turn induced voltage")?,
        ),
        VoltageDomain::Frequency => {
            let options = FreqOptions {
                freq_resolution: cfg.freq_resolution,
                freq_res_option: cfg.freq_res_option,
                recalculate_impedance: cfg.recalculate_impedance,
                save_individual_voltages: cfg.save_individual_voltages,
            };
            Box::new(
                InducedVoltageFreq::new(sources, profile, options)
                    .context("Could not set up a frequency domain induced voltage")?,
            )
        }
    };
    Ok(generator)
}
