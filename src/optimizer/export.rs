//! Sweep report (JSON), flat results table (CSV) and history frames (JSON).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::RunConfig;
use crate::data::ItemId;
use crate::error::ExportError;
use crate::optimizer::{SweepOutcome, SweepPoint};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub run_id: Uuid,
    pub generated_at: String,
    pub config: RunConfig,
    pub points: Vec<SweepPoint>,
    pub optimum: Option<SweepPoint>,
}

impl SweepReport {
    pub fn new(config: RunConfig, outcome: SweepOutcome) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            config,
            points: outcome.points,
            optimum: outcome.optimum,
        }
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), ExportError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ResultRow {
    region: f64,
    state: f64,
    county: f64,
    parameter: usize,
    mean: f64,
    std_dev: f64,
    std_err: f64,
    runs: usize,
}

impl From<&SweepPoint> for ResultRow {
    fn from(point: &SweepPoint) -> Self {
        let [region, state, county] = point.weights.as_array();
        Self {
            region,
            state,
            county,
            parameter: point.parameter,
            mean: point.statistic.mean,
            std_dev: point.statistic.std_dev,
            std_err: point.statistic.std_err,
            runs: point.statistic.runs,
        }
    }
}

/// One row per sweep point, header `region,state,county,parameter,mean,std_dev,std_err,runs`.
pub fn write_results_csv<W: Write>(writer: W, points: &[SweepPoint]) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    for point in points {
        csv.serialize(ResultRow::from(point))?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_results_csv_file(path: impl AsRef<Path>, points: &[SweepPoint]) -> Result<(), ExportError> {
    let file = File::create(path)?;
    write_results_csv(BufWriter::new(file), points)
}

/// Resident sets after each request, as a JSON array of arrays.
pub fn write_history_json<W: Write>(writer: W, history: &[Vec<ItemId>]) -> Result<(), ExportError> {
    serde_json::to_writer(writer, history)?;
    Ok(())
}
