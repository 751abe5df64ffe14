use crate::beam::Beam;
use crate::profile::Profile;
use crate::{Float, Output};
use anyhow::{Context, Result};

/// Write the strided phase space and the profile of turn `turn` under
/// `<directory>/dat_NNNNN/`, one directory per output interval.
pub(crate) fn save_output(turn: u32, output: &Output, beam: &Beam, profile: &Profile) -> Result<()> {
    let output_prefix = format!(
        "{}/dat_{:05}",
        output.directory,
        turn / output.output_interval
    );
    std::fs::create_dir_all(&output_prefix).context("Unable to create output directory")?;

    let dt: Vec<Float> = beam.dt.iter().step_by(output.stride).copied().collect();
    npy::to_file(format!("{}/dt.npy", output_prefix), dt)
        .context("Could not save dt data to file")?;

    let de: Vec<Float> = beam.de.iter().step_by(output.stride).copied().collect();
    npy::to_file(format!("{}/de.npy", output_prefix), de)
        .context("Could not save dE data to file")?;

    npy::to_file(format!("{}/profile.npy", output_prefix), profile.counts())
        .context("Could not save the profile histogram")?;
    npy::to_file(
        format!("{}/bin_centers.npy", output_prefix),
        profile.bin_centers.clone(),
    )
    .context("Could not save the bin centres")?;

    Ok(())
}
