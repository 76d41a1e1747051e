//! Check records and report writers.
//!
//! A [`CheckRecord`] flattens one trace or voltage query into the fields
//! report consumers rely on; the submodules render records and the loaded
//! system into the CSV reports and vendor constraint files.

pub mod check;
pub mod constraints;
pub mod pinout;

use serde::Serialize;

/// Flattened result of one trace or voltage check.
///
/// The CSV rendering is Excel-proofed: identifiers and voltages are wrapped
/// as `="..."` so spreadsheets keep them as text, and tri-state flags
/// render as `TRUE` / `FALSE` / `#N/A`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckRecord {
    pub from: String,
    pub to: String,
    pub group: Option<String>,
    pub desired_volt: Option<f64>,

    /// Some for trace checks; voltage-only checks have no trace verdict.
    pub trace: Option<bool>,

    /// Whether either endpoint's signal is operator-ignored.
    pub ignored: bool,

    pub path: Vec<String>,
    pub pulls: Vec<String>,
    pub voltages: Vec<f64>,
}

impl CheckRecord {
    /// The agreed voltage across all recorded pulls, when they agree.
    pub fn common_volt(&self) -> Option<f64> {
        let first = *self.voltages.first()?;
        self.voltages.iter().all(|v| *v == first).then_some(first)
    }

    /// Whether the desired voltage is met; None when none was asked for.
    pub fn volt_match(&self) -> Option<bool> {
        let desired = self.desired_volt?;
        Some(self.common_volt() == Some(desired))
    }

    /// Whether the recorded voltages exist and agree.
    pub fn has_common_volt(&self) -> bool {
        self.common_volt().is_some()
    }

    /// Render the record as one check-report line.
    ///
    /// Columns: comment (empty), from, to, desired voltage, trace flag,
    /// ignore flag, voltage-match flag, common-voltage flag and value, then
    /// the `PATH`, `PULL` and `VOLT` lists.
    pub fn csv_line(&self) -> String {
        let mut line = format!(",=\"{}\",=\"{}\",", self.from, self.to);

        match self.desired_volt {
            Some(volts) => line.push_str(&format!("=\"{:.2}\",", volts)),
            None => line.push(','),
        }

        match self.trace {
            Some(true) => line.push_str("TRUE,"),
            Some(false) => line.push_str("FALSE,"),
            None => line.push_str("#N/A,"),
        }

        line.push_str(if self.ignored { "TRUE," } else { "FALSE," });

        match self.volt_match() {
            Some(true) => line.push_str("TRUE,"),
            Some(false) => line.push_str("FALSE,"),
            None => line.push_str("#N/A,"),
        }

        if self.voltages.is_empty() {
            line.push_str("#N/A,#N/A,");
        } else {
            match self.common_volt() {
                Some(volts) => line.push_str(&format!("TRUE,=\"{:.2}\",", volts)),
                None => line.push_str("FALSE,#N/A,"),
            }
        }

        line.push_str("PATH,");
        for node in &self.path {
            line.push_str(&format!("=\"{}\",", node));
        }
        line.push_str("PULL,");
        for pull in &self.pulls {
            line.push_str(&format!("=\"{}\",", pull));
        }
        line.push_str("VOLT,");
        for volts in &self.voltages {
            line.push_str(&format!("=\"{:.2}\",", volts));
        }
        line
    }
}
