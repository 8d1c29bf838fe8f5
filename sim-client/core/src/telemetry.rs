//! Telemetry trail
//!
//! Each telemetry message the handler reports becomes one
//! [`TelemetrySample`] holding the ground-plane position and speed. The
//! vertical `y` coordinate is not recorded.
//!
//! # File Format
//!
//! ```text
//! coordinates file created at 14:03:27
//! x_pos	y_pos	speed
//! 1.2346	2.0000	3.0000
//! ```
//!
//! The second column holds the `z` coordinate; its header keeps the
//! historical `y_pos` label so existing readers of `.aprfile` output keep
//! working. Samples carry no timestamp, so a stationary car and a car that
//! is not reporting look the same.

use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BridgeError;
use crate::messages::StructuredMessage;

/// Default telemetry destination, relative to the working directory
pub const DEFAULT_TELEMETRY_FILE: &str = "coords.aprfile";

/// Column header line
const COLUMN_HEADER: &str = "x_pos\ty_pos\tspeed";

/// One recorded vehicle state
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Ground-plane x coordinate
    pub x: f64,
    /// Ground-plane z coordinate
    pub z: f64,
    /// Vehicle speed
    pub speed: f64,
}

impl TelemetrySample {
    /// Create a sample
    #[must_use]
    pub fn new(x: f64, z: f64, speed: f64) -> Self {
        Self { x, z, speed }
    }

    /// Extract a sample from a telemetry record
    ///
    /// Reads exactly `x`, `z` and `speed`; every other field is ignored.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Schema` naming the first field that is
    /// absent or not a number.
    pub fn from_record(record: &StructuredMessage) -> Result<Self, BridgeError> {
        Ok(Self {
            x: numeric_field(record, "x")?,
            z: numeric_field(record, "z")?,
            speed: numeric_field(record, "speed")?,
        })
    }
}

fn numeric_field(record: &StructuredMessage, field: &'static str) -> Result<f64, BridgeError> {
    match record.get(field) {
        None => Err(BridgeError::Schema {
            field,
            reason: "is missing".to_string(),
        }),
        Some(value) => value.as_f64().ok_or_else(|| BridgeError::Schema {
            field,
            reason: format!("is not numeric: {}", describe(value)),
        }),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("string \"{s}\""),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Ordered, append-only sequence of samples
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TelemetryLog {
    samples: Vec<TelemetrySample>,
}

impl TelemetryLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample
    pub fn push(&mut self, sample: TelemetrySample) {
        self.samples.push(sample);
    }

    /// Recorded samples in insertion order
    #[must_use]
    pub fn samples(&self) -> &[TelemetrySample] {
        &self.samples
    }

    /// Number of recorded samples
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether nothing has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Render the tab-separated table with the given creation time
    #[must_use]
    pub fn render(&self, created_at: &str) -> String {
        let mut out = String::with_capacity(64 + self.samples.len() * 32);

        // Writing to a String cannot fail
        let _ = writeln!(out, "coordinates file created at {created_at}");
        let _ = writeln!(out, "{COLUMN_HEADER}");
        for sample in &self.samples {
            let _ = writeln!(
                out,
                "{:.4}\t{:.4}\t{:.4}",
                sample.x, sample.z, sample.speed
            );
        }

        out
    }

    /// Render the table stamped with the current local time
    #[must_use]
    pub fn render_now(&self) -> String {
        self.render(&chrono::Local::now().format("%H:%M:%S").to_string())
    }
}

/// Write a rendered table to `destination`, replacing any previous content
///
/// # Errors
///
/// Returns `BridgeError::Io` if the file cannot be written.
pub async fn write_table(destination: &Path, table: &str) -> Result<(), BridgeError> {
    tokio::fs::write(destination, table)
        .await
        .map_err(|source| BridgeError::Io {
            path: destination.to_path_buf(),
            source,
        })?;

    tracing::info!(path = %destination.display(), "Finished writing telemetry data");
    Ok(())
}
