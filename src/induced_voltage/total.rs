use crate::beam::Beam;
use crate::induced_voltage::{linear_interp_kick, InducedVoltage};
use crate::profile::Profile;
use crate::Float;
use anyhow::Result;

/// Sum of the voltages of any mix of generators, all on the same profile.
pub struct TotalInducedVoltage {
    generators: Vec<Box<dyn InducedVoltage>>,
    induced_voltage: Vec<Float>,
    time_array: Vec<Float>,
}

impl TotalInducedVoltage {
    pub fn new(generators: Vec<Box<dyn InducedVoltage>>, profile: &Profile) -> TotalInducedVoltage {
        TotalInducedVoltage {
            generators,
            induced_voltage: vec![0.0; profile.n_slices],
            time_array: profile.bin_centers.clone(),
        }
    }

    /// Regenerate every voltage and cache their sum. With `length` the
    /// generators' extended outputs are summed and returned as well;
    /// otherwise the returned vector is empty.
    pub fn induced_voltage_sum(
        &mut self,
        profile: &Profile,
        beam: &Beam,
        charge: Float,
        length: Option<usize>,
    ) -> Result<Vec<Float>> {
        let mut total = vec![0.0; profile.n_slices];
        let mut extended = Vec::new();
        for generator in self.generators.iter_mut() {
            let v = generator.induced_voltage_generation(profile, beam, charge, length)?;
            if length.is_some() {
                if extended.len() < v.len() {
                    extended.resize(v.len(), 0.0);
                }
                for (e, x) in extended.iter_mut().zip(v.iter()) {
                    *e += *x;
                }
            }
            let current = generator.induced_voltage();
            if total.len() < current.len() {
                total.resize(current.len(), 0.0);
            }
            for (t, x) in total.iter_mut().zip(current.iter()) {
                *t += *x;
            }
        }
        self.induced_voltage = total;
        Ok(extended)
    }

    /// Kick the beam with the summed voltage, scaled by the particle charge.
    pub fn track(&mut self, profile: &Profile, beam: &mut Beam, charge: Float) -> Result<()> {
        self.induced_voltage_sum(profile, beam, charge, None)?;
        let voltage: Vec<Float> = self.induced_voltage.iter().map(|v| charge * v).collect();
        linear_interp_kick(&beam.dt, &mut beam.de, &voltage, &profile.bin_centers);
        Ok(())
    }

    pub fn reprocess(&mut self, profile: &Profile) -> Result<()> {
        for generator in self.generators.iter_mut() {
            generator.reprocess(profile)?;
        }
        self.time_array = profile.bin_centers.clone();
        self.induced_voltage = vec![0.0; profile.n_slices];
        Ok(())
    }

    pub fn induced_voltage(&self) -> &[Float] {
        &self.induced_voltage
    }

    pub fn time_array(&self) -> &[Float] {
        &self.time_array
    }

    pub fn generators(&self) -> &[Box<dyn InducedVoltage>] {
        &self.generators
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}
