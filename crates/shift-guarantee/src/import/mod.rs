//! CSV import of historical shifts, used to feed the volatility and accuracy reports
//! from an exported earnings log.

mod parser;

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::engine::{
    ensure_earnings, AccuracySample, EngineError, GuaranteeOutcome, GuaranteeThreshold, Location,
};
use crate::ledger::{ShiftCommitment, WorkerId};
use parser::{parse_datetime, ShiftRow};

#[derive(Debug)]
pub enum ShiftImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Engine { row: usize, source: EngineError },
}

impl std::fmt::Display for ShiftImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShiftImportError::Io(err) => write!(f, "failed to read shift export: {}", err),
            ShiftImportError::Csv(err) => write!(f, "invalid shift CSV data: {}", err),
            ShiftImportError::Engine { row, source } => {
                write!(f, "row {}: {}", row, source)
            }
        }
    }
}

impl std::error::Error for ShiftImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShiftImportError::Io(err) => Some(err),
            ShiftImportError::Csv(err) => Some(err),
            ShiftImportError::Engine { source, .. } => Some(source),
        }
    }
}

impl From<std::io::Error> for ShiftImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ShiftImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// One historical shift. `actual_earnings` is `None` while the shift is still open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedShift {
    pub worker_id: WorkerId,
    pub location: Location,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub predicted_earnings: f64,
    pub actual_earnings: Option<f64>,
}

impl ImportedShift {
    pub fn is_completed(&self) -> bool {
        self.actual_earnings.is_some()
    }

    pub fn start_hour(&self) -> u8 {
        self.starts_at.hour() as u8
    }

    pub fn accuracy_sample(&self) -> Option<AccuracySample> {
        self.actual_earnings.map(|actual| AccuracySample {
            predicted: self.predicted_earnings,
            actual,
            location: self.location,
            hour: self.start_hour(),
        })
    }

    pub fn commitment(&self) -> ShiftCommitment {
        ShiftCommitment {
            worker_id: self.worker_id.clone(),
            location: self.location,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            predicted_earnings: self.predicted_earnings,
        }
    }

    fn from_row(row: ShiftRow) -> Result<Self, EngineError> {
        let location: Location = row.location.parse()?;
        let starts_at = parse_datetime(&row.start_time).ok_or_else(|| EngineError::InvalidInput {
            field: "start_time",
            reason: format!("unrecognised timestamp '{}'", row.start_time),
        })?;
        let ends_at = parse_datetime(&row.end_time).ok_or_else(|| EngineError::InvalidInput {
            field: "end_time",
            reason: format!("unrecognised timestamp '{}'", row.end_time),
        })?;
        if ends_at <= starts_at {
            return Err(EngineError::InvalidInput {
                field: "end_time",
                reason: "shift must end after it starts".to_string(),
            });
        }

        let predicted_earnings = ensure_earnings("predicted_earnings", row.predicted_earnings)?;
        let actual_earnings = match row.actual_earnings.as_deref() {
            Some(raw) => {
                let value = raw.trim().parse::<f64>().map_err(|_| EngineError::InvalidInput {
                    field: "actual_earnings",
                    reason: format!("'{raw}' is not a number"),
                })?;
                Some(ensure_earnings("actual_earnings", value)?)
            }
            None => None,
        };

        Ok(Self {
            worker_id: WorkerId(row.worker_id),
            location,
            starts_at,
            ends_at,
            predicted_earnings,
            actual_earnings,
        })
    }
}

pub struct ShiftCsvImporter;

impl ShiftCsvImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<ImportedShift>, ShiftImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<ImportedShift>, ShiftImportError> {
        let rows = parser::parse_rows(reader)?;
        let shifts = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| {
                ImportedShift::from_row(row).map_err(|source| ShiftImportError::Engine {
                    row: index + 1,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(shifts = shifts.len(), "imported shift history");
        Ok(shifts)
    }
}

/// Completed shifts as `(without, with)` series, where `with` adds the top-up each shift
/// would have received at `threshold`.
pub fn volatility_series(
    shifts: &[ImportedShift],
    threshold: GuaranteeThreshold,
) -> Result<(Vec<f64>, Vec<f64>), EngineError> {
    let mut without = Vec::new();
    let mut with = Vec::new();
    for shift in shifts {
        if let Some(actual) = shift.actual_earnings {
            let outcome = GuaranteeOutcome::evaluate(shift.predicted_earnings, actual, threshold)?;
            without.push(actual);
            with.push(outcome.protected_earnings());
        }
    }
    Ok((without, with))
}

pub fn accuracy_samples(shifts: &[ImportedShift]) -> Vec<AccuracySample> {
    shifts
        .iter()
        .filter_map(ImportedShift::accuracy_sample)
        .collect()
}
