//! ASC Netlist Parser
//!
//! Parses the line-oriented ASC netlist format into a [`Board`]:
//!
//! ```text
//! *PART*
//! R10 RES_10K
//! J1 CONN_2X5
//!
//! *CONNECTION*
//! *SIGNAL* SIG_X
//!  J1.5 U1.2
//!  U1.2 R10.1
//!
//! *MISC*
//! ```
//!
//! Blank lines are ignored and everything after `*MISC*` is ignored. Within
//! a `*SIGNAL*` subsection each line names two `Ref.Pin` tokens; the first
//! token joins the net only on the subsection's opening line, later lines
//! contribute only their second token. Rail classification runs on each
//! signal as it is introduced.
//!
//! Malformed lines are logged and skipped; parsing never aborts once the
//! file is open.

use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::board::Board;
use crate::rail::classify_rail;

/// Error type for netlist parsing
#[derive(Debug, Error)]
pub enum AscParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    None,
    Part,
    Connection,
}

/// Parser for ASC netlist files
pub struct AscParser;

impl AscParser {
    /// Parse an ASC netlist file into a board.
    pub fn parse_file(path: &Path) -> Result<Board, AscParseError> {
        let content = fs::read_to_string(path)?;
        info!("Loading netlist {}", path.display());
        Ok(Self::parse(&content))
    }

    /// Parse ASC netlist content into a board.
    pub fn parse(content: &str) -> Board {
        let mut board = Board::new();
        let mut section = Section::None;
        let mut signal = String::new();
        let mut new_signal = false;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if line.starts_with('*') {
                if line == "*PART*" {
                    section = Section::Part;
                    debug!("Loading parts");
                } else if line == "*CONNECTION*" {
                    section = Section::Connection;
                    debug!("Loading connections");
                } else if line == "*MISC*" {
                    break;
                } else if section == Section::Connection && line.starts_with("*SIGNAL*") {
                    match line.split_whitespace().nth(1) {
                        Some(name) => {
                            signal = name.to_string();
                            new_signal = true;
                            board.declare_signal(&signal);
                            if let Some(volts) = classify_rail(&signal) {
                                board.set_rail(&signal, volts);
                            }
                        }
                        None => warn!("Skipping unnamed *SIGNAL* line"),
                    }
                }
                // Other star lines carry no connectivity.
                continue;
            }

            match section {
                Section::Part => {
                    let mut tokens = line.split_whitespace();
                    match (tokens.next(), tokens.next()) {
                        (Some(refdes), Some(part_type)) => board.add_part(refdes, part_type),
                        _ => warn!("Skipping malformed part line {:?}", line),
                    }
                }
                Section::Connection => {
                    if signal.is_empty() {
                        warn!("Skipping connection line outside a *SIGNAL* block: {:?}", line);
                        continue;
                    }
                    let tokens: Vec<&str> = line.split_whitespace().collect();
                    // The second token always joins the net; the first only
                    // on the subsection's opening line.
                    if tokens.len() > 1 {
                        board.attach_pin(&signal, tokens[1]);
                    }
                    if new_signal {
                        if let Some(first) = tokens.first() {
                            board.attach_pin(&signal, first);
                        }
                        new_signal = false;
                    }
                }
                Section::None => {}
            }
        }

        let stats = board.stats();
        debug!(
            "Parsed {} components, {} nets ({} rails), {} pin connections",
            stats.component_count, stats.net_count, stats.rail_count, stats.connection_count
        );
        board
    }
}
