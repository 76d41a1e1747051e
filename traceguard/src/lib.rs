//! TraceGuard - multi-board interconnect verification library
//!
//! This library ingests PCB netlists plus a driver file describing the
//! harnesses, connectors and device pin behavior that tie boards together,
//! and answers two electrical-design questions about the assembled system:
//! does a conductive path exist between two endpoints, and which supply
//! rails does a net resolve to — and do they agree.
//!
//! # Quick Start
//!
//! ```no_run
//! use traceguard::{TraceGuardCore, RunOptions};
//! use std::path::Path;
//!
//! let mut system = TraceGuardCore::load_system(Path::new("system.csv")).unwrap();
//! let report = TraceGuardCore::run(&mut system, &RunOptions::default());
//!
//! for output in &report.traces {
//!     if let Some(record) = output.as_record() {
//!         println!("{} -> {}: {:?}", record.from, record.to, record.trace);
//!     }
//! }
//! ```
//!
//! # Features
//!
//! - **Trace checks**: conductive-path search across nets, straight-through
//!   devices, board-to-board connectors and harness wiring
//! - **Voltage checks**: pull-resistor, stake and device-table resolution
//!   with conflict detection
//! - **Reports**: check/all-volt/pinout CSV files and vendor pin-constraint
//!   files (Xilinx, Altera, Lattice)

pub mod core;
pub mod engine;
pub mod model;
pub mod parser;
pub mod rail;
pub mod report;

// Re-export main types
pub use crate::core::{
    AllVoltGroups, CheckOutput, RunOptions, RunReport, TraceGuardCore, TraceGuardError,
};
pub use engine::pull::{resolve_pulls, PullInfo};
pub use engine::trace::{check_trace, TraceOutcome};
pub use model::board::Board;
pub use model::system::{Endpoint, System, TraceRequest, VoltRequest};
pub use parser::asc::AscParser;
pub use parser::driver::DriverParser;
pub use rail::classify_rail;
pub use report::CheckRecord;

/// Load a system description from a driver file (convenience wrapper).
pub fn load_system(path: &std::path::Path) -> Result<System, TraceGuardError> {
    TraceGuardCore::load_system(path)
}

/// Parse a single ASC netlist file (convenience wrapper).
pub fn parse_netlist(path: &std::path::Path) -> Result<Board, TraceGuardError> {
    AscParser::parse_file(path).map_err(|e| TraceGuardError::Parse(e.to_string()))
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        CheckOutput, CheckRecord, Endpoint, RunOptions, RunReport, System, TraceGuardCore,
        TraceGuardError,
    };
}
