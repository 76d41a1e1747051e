//! Check and all-volt report writers.
//!
//! Line format matches what the downstream spreadsheets expect: a leading
//! empty comment column, `="..."` text guards, and `PATH`/`PULL`/`VOLT`
//! delimited lists. Comment blocks from the driver file pass through
//! verbatim ahead of their checks.

use std::io::{self, Write};

use crate::core::{AllVoltGroups, CheckOutput};

pub struct CheckReportWriter;

impl CheckReportWriter {
    /// Write one sequence of check outputs.
    pub fn write_checks<W: Write>(out: &mut W, outputs: &[CheckOutput]) -> io::Result<()> {
        for output in outputs {
            match output {
                CheckOutput::Comment(comment) => write!(out, "\n{}\n", comment)?,
                CheckOutput::Record(record) => writeln!(out, "{}", record.csv_line())?,
            }
        }
        Ok(())
    }

    /// Write the all-volt sweep: per-board conflict sections first, then
    /// the nets with no voltage information, then the agreeing nets.
    pub fn write_all_volt<W: Write>(out: &mut W, groups: &[AllVoltGroups]) -> io::Result<()> {
        for group in groups {
            write!(out, "\n\n,{} CONFLICT SIGNALS\n\n", group.board)?;
            for record in &group.conflicts {
                writeln!(out, "{}", record.csv_line())?;
            }
        }
        for group in groups {
            write!(out, "\n\n,{} NO VOLTAGE SIGNALS\n\n", group.board)?;
            for record in &group.no_volts {
                writeln!(out, "{}", record.csv_line())?;
            }
        }
        for group in groups {
            write!(out, "\n\n,{} NON-CONFLICTING SIGNALS\n\n", group.board)?;
            for record in &group.agreeing {
                writeln!(out, "{}", record.csv_line())?;
            }
        }
        Ok(())
    }
}
