//! Core run orchestration shared by library consumers and the CLI.
//! No file-format or output-format specifics beyond dispatching to the
//! parsers and report writers.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::engine::pull::{add_pulls, resolve_pulls, PullInfo};
use crate::engine::trace::check_trace;
use crate::model::system::{Endpoint, Queued, System, TraceRequest, VoltRequest};
use crate::parser::driver::{DriverParseError, DriverParser};
use crate::report::check::CheckReportWriter;
use crate::report::constraints::ConstraintWriter;
use crate::report::pinout::PinoutReportWriter;
use crate::report::CheckRecord;

#[derive(Debug, thiserror::Error)]
pub enum TraceGuardError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

impl From<DriverParseError> for TraceGuardError {
    fn from(e: DriverParseError) -> Self {
        TraceGuardError::Parse(e.to_string())
    }
}

/// Options for a verification run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Also resolve pulls for every net of every board.
    pub all_volt: bool,
}

/// One line of a check report: a passthrough comment block or a record.
#[derive(Debug, Clone)]
pub enum CheckOutput {
    Comment(String),
    Record(CheckRecord),
}

impl CheckOutput {
    pub fn as_record(&self) -> Option<&CheckRecord> {
        match self {
            CheckOutput::Record(r) => Some(r),
            _ => None,
        }
    }
}

/// Per-board groups of the all-volt sweep.
#[derive(Debug, Clone)]
pub struct AllVoltGroups {
    pub board: String,
    /// Nets whose reached voltages disagree.
    pub conflicts: Vec<CheckRecord>,
    /// Nets with no voltage information at all.
    pub no_volts: Vec<CheckRecord>,
    /// Nets whose reached voltages agree.
    pub agreeing: Vec<CheckRecord>,
}

/// Everything one run produced, ready for printing or writing.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub traces: Vec<CheckOutput>,
    pub volts: Vec<CheckOutput>,
    pub all_volt: Option<Vec<AllVoltGroups>>,
}

/// Core verification API used by both library consumers and the CLI.
pub struct TraceGuardCore;

impl TraceGuardCore {
    /// Load a driver file and everything it references.
    pub fn load_system(path: &Path) -> Result<System, TraceGuardError> {
        Ok(DriverParser::load(path)?)
    }

    /// Run a single trace check. Pulls are collected along the found path
    /// when the trace succeeds or a desired voltage was given.
    pub fn run_trace_check(system: &mut System, request: &TraceRequest) -> CheckRecord {
        let outcome = check_trace(&*system, &request.from, &request.to);
        let path: Vec<String> = outcome.walk.nodes().to_vec();

        let mut info = PullInfo::default();
        if request.desired_volt.is_some() || outcome.found {
            add_pulls(system, &path, &mut info);
        }

        CheckRecord {
            from: request.from.to_string(),
            to: request.to.to_string(),
            group: request.group.clone(),
            desired_volt: request.desired_volt,
            trace: Some(outcome.found),
            ignored: endpoint_ignored(system, &request.from)
                || endpoint_ignored(system, &request.to),
            path,
            pulls: info.pulls,
            voltages: info.voltages,
        }
    }

    /// Run a single voltage check.
    pub fn run_volt_check(system: &mut System, request: &VoltRequest) -> CheckRecord {
        let (path, info) = resolve_pulls(system, &request.endpoint);
        CheckRecord {
            from: request.endpoint.to_string(),
            to: request.endpoint.to_string(),
            group: request.group.clone(),
            desired_volt: request.desired_volt,
            trace: None,
            ignored: endpoint_ignored(system, &request.endpoint),
            path,
            pulls: info.pulls,
            voltages: info.voltages,
        }
    }

    /// Run every queued trace check, in file order, comments interleaved.
    pub fn run_trace_checks(system: &mut System) -> Vec<CheckOutput> {
        let queue = system.trace_checks.clone();
        queue
            .iter()
            .map(|entry| match entry {
                Queued::Comment(c) => CheckOutput::Comment(c.clone()),
                Queued::Check(request) => {
                    info!("Checking {} -> {}", request.from, request.to);
                    CheckOutput::Record(Self::run_trace_check(system, request))
                }
            })
            .collect()
    }

    /// Run every queued voltage check, in file order, comments interleaved.
    pub fn run_volt_checks(system: &mut System) -> Vec<CheckOutput> {
        let queue = system.volt_checks.clone();
        queue
            .iter()
            .map(|entry| match entry {
                Queued::Comment(c) => CheckOutput::Comment(c.clone()),
                Queued::Check(request) => {
                    info!("Checking voltage on {}", request.endpoint);
                    CheckOutput::Record(Self::run_volt_check(system, request))
                }
            })
            .collect()
    }

    /// Resolve pulls for every net of every board and group the results by
    /// agreement, in board load order and net declaration order.
    pub fn run_all_volt(system: &mut System) -> Vec<AllVoltGroups> {
        let mut groups = Vec::new();
        for board_id in system.board_order.clone() {
            let signals: Vec<String> = match system.boards.get(&board_id) {
                Some(board) => board.nets().map(|n| n.name.clone()).collect(),
                None => continue,
            };

            let mut group = AllVoltGroups {
                board: board_id.clone(),
                conflicts: Vec::new(),
                no_volts: Vec::new(),
                agreeing: Vec::new(),
            };
            for signal in signals {
                let request = VoltRequest {
                    endpoint: Endpoint::Signal {
                        board: board_id.clone(),
                        signal,
                    },
                    group: None,
                    desired_volt: None,
                };
                let record = Self::run_volt_check(system, &request);
                if record.voltages.is_empty() {
                    group.no_volts.push(record);
                } else if record.has_common_volt() {
                    group.agreeing.push(record);
                } else {
                    group.conflicts.push(record);
                }
            }
            groups.push(group);
        }
        groups
    }

    /// Run everything the driver file queued.
    pub fn run(system: &mut System, options: &RunOptions) -> RunReport {
        let traces = Self::run_trace_checks(system);
        let volts = Self::run_volt_checks(system);
        let all_volt = options.all_volt.then(|| Self::run_all_volt(system));
        RunReport {
            traces,
            volts,
            all_volt,
        }
    }

    /// Write the report files beside the given filename stem. Returns the
    /// paths written.
    pub fn write_reports(
        system: &System,
        report: &RunReport,
        stem: &str,
    ) -> Result<Vec<PathBuf>, TraceGuardError> {
        let mut written = Vec::new();

        let check_path = PathBuf::from(format!("{}_check.csv", stem));
        info!("Writing checks to {}", check_path.display());
        {
            let mut out = BufWriter::new(File::create(&check_path)?);
            CheckReportWriter::write_checks(&mut out, &report.traces)?;
            CheckReportWriter::write_checks(&mut out, &report.volts)?;
        }
        written.push(check_path);

        if let Some(groups) = &report.all_volt {
            let volt_path = PathBuf::from(format!("{}_volt.csv", stem));
            info!("Writing volt sweep to {}", volt_path.display());
            let mut out = BufWriter::new(File::create(&volt_path)?);
            CheckReportWriter::write_all_volt(&mut out, groups)?;
            written.push(volt_path);
        }

        let map_path = PathBuf::from(format!("{}_map.csv", stem));
        info!("Writing maps to {}", map_path.display());
        {
            let mut out = BufWriter::new(File::create(&map_path)?);
            PinoutReportWriter::write(&mut out, system)?;
        }
        written.push(map_path);

        let out_dir = Path::new(stem).parent().unwrap_or(Path::new(""));
        let out_dir = if out_dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            out_dir
        };
        written.extend(ConstraintWriter::write_all(system, out_dir)?);

        Ok(written)
    }
}

fn endpoint_ignored(system: &System, endpoint: &Endpoint) -> bool {
    system
        .endpoint_net(endpoint)
        .map_or(false, |net| system.ignore.signals.contains(&net.to_string()))
}
