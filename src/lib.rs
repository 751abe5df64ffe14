use serde::Deserialize;
use std::fs;
use std::str::FromStr;

use anyhow::{Context, Result};

pub mod beam;
pub mod constants;
pub mod convolution;
pub mod distributions;
pub mod error;
pub mod impedance;
pub mod induced_voltage;
pub mod logging;
pub mod params;
pub mod profile;
pub mod save;
pub mod simulation;
pub mod smooth;
pub mod spectrum;
pub mod tracker;

use crate::convolution::ConvolutionMode;
use crate::distributions::Distribution;
use crate::error::ConfigError;
use crate::induced_voltage::FreqResOption;
use crate::logging::LogConfig;
use crate::params::{DriftSolver, Particle};
use crate::profile::{CutsUnit, SliceMode};

// We use a type alias for f64/Float to easily support
// double and single precision.
#[cfg(feature = "dprec")]
pub type Float = f64;

#[cfg(not(feature = "dprec"))]
pub type Float = f32;

pub const PI: Float = std::f64::consts::PI as Float;

// Particles per rayon chunk in the per-particle loops.
pub(crate) const PRTL_CHUNK_SIZE: usize = 1024;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub setup: Setup,
    pub ring: RingConfig,
    pub rf: Vec<CavityConfig>,
    pub beam: BeamConfig,
    pub profile: ProfileConfig,
    #[serde(default)]
    pub collective: Vec<CollectiveConfig>,
    pub output: Output,
    #[serde(default)]
    pub logging: LogConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Setup {
    pub n_turns: u32,
    #[serde(default)]
    pub drift_solver: DriftSolver,
    // How often beam statistics are logged. 0 turns it off.
    #[serde(default)]
    pub stats_interval: u32,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RingConfig {
    pub circumference: Float,
    pub momentum_initial: Float,
    pub momentum_final: Float,
    pub gamma_transition: Float,
    #[serde(default = "default_alpha_order")]
    pub alpha_order: usize,
    #[serde(default)]
    pub alpha_1: Float,
    #[serde(default)]
    pub alpha_2: Float,
    pub particle: Particle,
}

fn default_alpha_order() -> usize {
    1
}

#[derive(Deserialize, Debug, Clone)]
pub struct CavityConfig {
    pub harmonic: Float,
    pub voltage: Float,
    #[serde(default)]
    pub phi_offset: Float,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BeamConfig {
    pub n_macroparticles: usize,
    pub intensity: Float,
    pub distribution: Distribution,
    // Full (4 sigma) bunch length in seconds.
    pub bunch_length: Float,
    // 0 means "derive from the bucket height".
    #[serde(default)]
    pub sigma_de: Float,
    #[serde(default)]
    pub seed: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ProfileConfig {
    pub n_slices: usize,
    #[serde(default)]
    pub cut_left: Float,
    #[serde(default)]
    pub cut_right: Float,
    #[serde(default)]
    pub n_sigma: Float,
    #[serde(default)]
    pub cuts_unit: CutsUnit,
    #[serde(default)]
    pub mode: SliceMode,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum VoltageDomain {
    Time,
    Frequency,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CollectiveConfig {
    pub domain: VoltageDomain,
    #[serde(default)]
    pub convolution: ConvolutionMode,
    #[serde(default)]
    pub freq_resolution: Float,
    #[serde(default)]
    pub freq_res_option: FreqResOption,
    #[serde(default)]
    pub n_turns_memory: usize,
    #[serde(default)]
    pub recalculate_impedance: bool,
    #[serde(default)]
    pub save_individual_voltages: bool,
    pub resonators: Vec<ResonatorConfig>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ResonatorConfig {
    pub r_shunt: Float,
    pub f_res: Float,
    pub q: Float,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Output {
    pub write_output: bool,
    pub output_interval: u32,
    pub stride: usize,
    #[serde(default = "default_output_dir")]
    pub directory: String,
}

fn default_output_dir() -> String {
    "output".to_string()
}

impl Config {
    pub fn new() -> Result<Config> {
        let contents =
            fs::read_to_string("config.toml").context("Could not open the config.toml file")?;
        Config::from_str(&contents)
    }

    /// Cross-field checks that serde cannot express. Any failure here is
    /// fatal for the run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.setup.n_turns == 0 {
            return Err(ConfigError::NoTurns);
        }
        if self.ring.alpha_order > 2 {
            return Err(ConfigError::AlphaOrder(self.ring.alpha_order));
        }
        if self.rf.is_empty() {
            return Err(ConfigError::NoCavities);
        }
        if self.beam.n_macroparticles == 0 {
            return Err(ConfigError::NoMacroparticles);
        }
        if !(self.beam.intensity > 0.0) {
            return Err(ConfigError::NonPositiveIntensity(self.beam.intensity));
        }
        if self.profile.n_slices < 2 {
            return Err(ConfigError::TooFewSlices(self.profile.n_slices));
        }
        let (left, right) = (self.profile.cut_left, self.profile.cut_right);
        if !(left == 0.0 && right == 0.0) && !(left < right) {
            return Err(ConfigError::InvalidCuts { left, right });
        }
        for collective in &self.collective {
            if collective.freq_resolution < 0.0 || !collective.freq_resolution.is_finite() {
                return Err(ConfigError::FreqResolution(collective.freq_resolution));
            }
        }
        if self.output.write_output && (self.output.output_interval == 0 || self.output.stride == 0)
        {
            return Err(ConfigError::OutputInterval);
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(contents: &str) -> Result<Config> {
        toml::from_str(contents).with_context(|| "Could not parse Config file")
    }
}

pub fn run(cfg: Config) -> Result<()> {
    let mut sim = simulation::Simulation::from_config(&cfg)?;
    sim.run()
}
