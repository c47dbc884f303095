//! Sensor file parser
//!
//! Turns textual time/value dumps into signals sharing a discharge-wide time
//! axis. Each line holds exactly two whitespace-separated numeric fields
//! `<time> <value>`; blank and comment lines are malformed. The parser is
//! permissive about axis drift between files (warn and continue) but a
//! malformed line fails the whole request.

use fpo_common::types::{Discharge, SensorFile, Signal};
use fpo_common::{Error, Result};

/// One parsed sensor file: the signal plus its own time column
#[derive(Debug, Clone)]
pub struct ParsedSignal {
    pub signal: Signal,
    pub times: Vec<f64>,
}

/// Parse a single `<time> <value>` text file
pub fn parse_signal_file(name: &str, content: &str) -> Result<ParsedSignal> {
    let mut times = Vec::new();
    let mut values = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let mut fields = line.split_whitespace();

        let (time_field, value_field) = match (fields.next(), fields.next()) {
            (Some(t), Some(v)) => (t, v),
            _ => {
                return Err(Error::Parse {
                    file: name.to_string(),
                    line: line_no,
                    message: "expected two whitespace-separated fields".to_string(),
                })
            }
        };
        if fields.next().is_some() {
            return Err(Error::Parse {
                file: name.to_string(),
                line: line_no,
                message: "unexpected trailing field".to_string(),
            });
        }

        let time: f64 = time_field.parse().map_err(|_| Error::Parse {
            file: name.to_string(),
            line: line_no,
            message: format!("invalid time value '{}'", time_field),
        })?;
        let value: f64 = value_field.parse().map_err(|_| Error::Parse {
            file: name.to_string(),
            line: line_no,
            message: format!("invalid sensor value '{}'", value_field),
        })?;

        times.push(time);
        values.push(value);
    }

    Ok(ParsedSignal {
        signal: Signal {
            file_name: name.to_string(),
            values,
        },
        times,
    })
}

/// Assemble a discharge from a set of sensor files
///
/// The first file's time column becomes the discharge's shared axis. Later
/// files that differ in length, or in any value at an equal index, are
/// logged as warnings and accepted anyway; downstream nodes may still reject
/// the data.
pub fn build_discharge(
    id: String,
    files: &[SensorFile],
    anomaly_time: Option<f64>,
) -> Result<Discharge> {
    let mut signals = Vec::with_capacity(files.len());
    let mut axis: Option<Vec<f64>> = None;

    for file in files {
        let parsed = parse_signal_file(&file.name, &file.content)?;

        match &axis {
            None => axis = Some(parsed.times),
            Some(shared) => {
                if parsed.times.len() != shared.len() {
                    tracing::warn!(
                        discharge = %id,
                        file = %file.name,
                        expected = shared.len(),
                        actual = parsed.times.len(),
                        "Signal length differs from discharge time axis"
                    );
                }
                if let Some(divergent) = first_divergence(shared, &parsed.times) {
                    tracing::warn!(
                        discharge = %id,
                        file = %file.name,
                        index = divergent,
                        "Signal time axis diverges from discharge time axis"
                    );
                }
            }
        }

        signals.push(parsed.signal);
    }

    let times = axis.unwrap_or_default();
    Ok(Discharge {
        id,
        length: times.len(),
        times,
        signals,
        anomaly_time,
    })
}

/// Index of the first differing time value, comparing up to the shorter axis
fn first_divergence(a: &[f64], b: &[f64]) -> Option<usize> {
    a.iter().zip(b.iter()).position(|(x, y)| x != y)
}
