use crate::engines::evaluation::SweepPoint;
use crate::error::{Result, YagiError};
use crate::types::Individual;
use log::info;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Column names of the optimisation result file.
pub fn result_header(num_elements: usize) -> Vec<String> {
    let mut header: Vec<String> = (1..=num_elements).map(|i| format!("Length{}", i)).collect();
    header.extend((1..num_elements).map(|i| format!("Distance{}", i)));
    header.push("Max Gain (dB)".to_string());
    header.push("Real Impedance Penalty".to_string());
    header.push("Imaginary Impedance Penalty".to_string());
    header
}

pub struct ResultExporter {
    num_elements: usize,
}

impl ResultExporter {
    pub fn new(num_elements: usize) -> Self {
        Self { num_elements }
    }

    /// One row per individual: lengths, spacings, then the three objectives.
    /// Unevaluated individuals are written with the failure vector.
    pub fn to_dataframe(&self, individuals: &[Individual]) -> Result<DataFrame> {
        let genes = 2 * self.num_elements - 1;
        if let Some(bad) = individuals.iter().find(|ind| ind.genome.len() != genes) {
            return Err(YagiError::Export(format!(
                "genome has {} genes, expected {}",
                bad.genome.len(),
                genes
            )));
        }

        let header = result_header(self.num_elements);
        let mut columns: Vec<Vec<f64>> = vec![Vec::with_capacity(individuals.len()); header.len()];
        for individual in individuals {
            let objectives = individual.fitness().to_array();
            for (column, value) in columns
                .iter_mut()
                .zip(individual.genome.iter().chain(objectives.iter()))
            {
                column.push(*value);
            }
        }

        let columns: Vec<Column> = header
            .iter()
            .zip(columns)
            .map(|(name, values)| Column::new(name.as_str().into(), values))
            .collect();
        Ok(DataFrame::new(columns)?)
    }

    pub fn write_csv(&self, individuals: &[Individual], path: &Path) -> Result<()> {
        let mut df = self.to_dataframe(individuals)?;
        write_frame(&mut df, path)?;
        info!("Wrote {} individuals to {}", individuals.len(), path.display());
        Ok(())
    }

    /// `k`, impedance and gain per sweep point; failed points are left empty.
    pub fn sweep_dataframe(points: &[SweepPoint]) -> Result<DataFrame> {
        let k: Vec<f64> = points.iter().map(|p| p.k).collect();
        let real: Vec<Option<f64>> = points.iter().map(|p| p.real_impedance).collect();
        let imag: Vec<Option<f64>> = points.iter().map(|p| p.imag_impedance).collect();
        let gain: Vec<Option<f64>> = points.iter().map(|p| p.max_gain_db).collect();

        Ok(DataFrame::new(vec![
            Column::new("k".into(), k),
            Column::new("real_impedance".into(), real),
            Column::new("imag_impedance".into(), imag),
            Column::new("max_gain_db".into(), gain),
        ])?)
    }

    pub fn write_sweep_csv(points: &[SweepPoint], path: &Path) -> Result<()> {
        let mut df = Self::sweep_dataframe(points)?;
        write_frame(&mut df, path)?;
        info!("Wrote {} sweep points to {}", points.len(), path.display());
        Ok(())
    }
}

fn write_frame(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)
        .map_err(|e| YagiError::Export(format!("cannot create {}: {}", path.display(), e)))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .map_err(|e| YagiError::Export(format!("cannot write {}: {}", path.display(), e)))?;
    Ok(())
}
