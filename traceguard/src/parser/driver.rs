//! Driver File Parser
//!
//! The driver is a comma-separated command file; each record's first column
//! selects a directive (`NETLIST`, `CONNECTION`, `HARNESSLINK`,
//! `CHECKTRACE`, ...). Records accumulate into a [`System`]: netlists are
//! parsed and attached as boards, inter-board wiring and device behavior
//! are registered, and check requests are queued for later runs.
//!
//! Trailing commas are stripped (spreadsheet exports pad to a common
//! width) and every field is trimmed. Unknown or short records are logged
//! and skipped; only a failure to open the root file aborts loading.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::system::{
    Endpoint, MapEntry, Queued, SignalRelation, System, TraceRequest, VoltRequest,
};
use crate::parser::asc::AscParser;

/// Error type for driver file parsing
#[derive(Debug, Error)]
pub enum DriverParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parser for driver command files
pub struct DriverParser {
    system: System,
    imported: HashSet<PathBuf>,
    comment_block: String,
    pending_comment: Option<String>,
}

impl DriverParser {
    /// Load a driver file (and everything it imports) into a fresh system.
    pub fn load(path: &Path) -> Result<System, DriverParseError> {
        let mut parser = DriverParser {
            system: System::new(),
            imported: HashSet::new(),
            comment_block: String::new(),
            pending_comment: None,
        };
        parser.imported.insert(path.to_path_buf());
        parser.load_file(path)?;
        Ok(parser.system)
    }

    fn load_file(&mut self, path: &Path) -> Result<(), DriverParseError> {
        let content = fs::read_to_string(path)?;
        info!("Loading system connection data from {}", path.display());
        let base = path.parent().unwrap_or(Path::new("")).to_path_buf();
        for raw in content.lines() {
            self.process_line(raw, &base);
        }
        Ok(())
    }

    fn process_line(&mut self, raw: &str, base: &Path) {
        let line = raw.trim().trim_end_matches(',');
        if line.is_empty() {
            return;
        }
        let tokens: Vec<&str> = line.split(',').map(str::trim).collect();

        if tokens[0] == "COMMENT" {
            // Everything after "COMMENT," verbatim, commas included.
            self.comment_block.push_str(line.get(8..).unwrap_or(""));
            self.comment_block.push('\n');
            return;
        }
        if !self.comment_block.is_empty() {
            // A finished comment block waits for the next directive that
            // records into a report sequence.
            self.pending_comment = Some(std::mem::take(&mut self.comment_block));
        }

        match tokens[0] {
            "" => {}
            "IMPORT" if tokens.len() > 1 => self.import(&base.join(tokens[1])),
            "NETLIST" if tokens.len() > 2 => self.netlist(tokens[1], &base.join(tokens[2])),
            "RAIL" if tokens.len() > 3 => self.rail(&tokens),
            "IGNORE" if tokens.len() > 3 => self.ignore(&tokens),
            "CHECKTRACE" if tokens.len() > 4 => self.check_trace(&tokens),
            "CHECKVOLT" if tokens.len() > 2 => self.check_volt(&tokens),
            "HARNESSLINK" if tokens.len() > 5 => self.harness_link(&tokens),
            "CONNECTION" if tokens.len() > 4 => self.connection(&tokens),
            "MAP" if tokens.len() > 3 => self.map(&tokens),
            "DEVICELINK" if tokens.len() > 3 => self.device_link(&tokens),
            "DEVICEPULL" if tokens.len() > 3 => self.device_pull(&tokens),
            "DEVICEVOLT" if tokens.len() > 2 => self.device_volt(&tokens),
            "DEVICEPIN" if tokens.len() > 5 => self.device_pin(&tokens),
            "REFVOLT" if tokens.len() > 4 => self.ref_volt(&tokens),
            "REFSIG" if tokens.len() > 5 => self.ref_sig(&tokens),
            "DEVICEPARAM" if tokens.len() > 3 => self.device_param(&tokens),
            _ => warn!("Unable to process: {}", line),
        }
    }

    fn import(&mut self, path: &Path) {
        if !self.imported.insert(path.to_path_buf()) {
            debug!("Already imported {}", path.display());
            return;
        }
        info!("Importing {}", path.display());
        if let Err(e) = self.load_file(path) {
            warn!("Failed to import {}: {}", path.display(), e);
        }
    }

    fn netlist(&mut self, id: &str, path: &Path) {
        match AscParser::parse_file(path) {
            Ok(board) => {
                if !self.system.boards.contains_key(id) {
                    self.system.board_order.push(id.to_string());
                }
                self.system.boards.insert(id.to_string(), board);
            }
            Err(e) => warn!("Failed to load netlist {}: {}", path.display(), e),
        }
    }

    fn rail(&mut self, tokens: &[&str]) {
        // RAIL, ID, SIGNAL, VOLTAGE
        let volts: f64 = tokens[3].parse().unwrap_or(0.0);
        let applied = self
            .system
            .boards
            .get_mut(tokens[1])
            .map_or(false, |board| board.set_rail(tokens[2], volts));
        if !applied {
            warn!(
                "RAIL names unknown board or signal: {}.{}",
                tokens[1], tokens[2]
            );
        }
    }

    fn ignore(&mut self, tokens: &[&str]) {
        // IGNORE, ID, SIGNAL|DEVICE, NAME
        let (id, kind, name) = (tokens[1], tokens[2], tokens[3]);
        let Some(board) = self.system.boards.get(id) else {
            warn!("IGNORE names unknown board {}", id);
            return;
        };
        match kind {
            "SIGNAL" => {
                if board.has_signal(name) {
                    self.system
                        .ignore
                        .signals
                        .insert(format!("{}.{}", id, name));
                } else {
                    warn!("IGNORE names unknown signal {}.{}", id, name);
                }
            }
            "DEVICE" => {
                self.system.ignore.devices.insert(name.to_string());
            }
            _ => warn!("IGNORE kind must be SIGNAL or DEVICE, got {:?}", kind),
        }
    }

    fn check_trace(&mut self, tokens: &[&str]) {
        // CHECKTRACE, FROM ID, FROM SIG/REF.PIN, TO ID, TO SIG/REF.PIN [, GROUP [, VOLT]]
        let from = Endpoint::parse(tokens[1], tokens[2]);
        let to = Endpoint::parse(tokens[3], tokens[4]);
        debug!("Decoding CHECKTRACE {} -> {}", from, to);
        if let Some(comment) = self.pending_comment.take() {
            self.system.trace_checks.push(Queued::Comment(comment));
        }
        self.system.trace_checks.push(Queued::Check(TraceRequest {
            from,
            to,
            group: tokens.get(5).map(|s| s.to_string()),
            desired_volt: tokens.get(6).and_then(|s| s.parse().ok()),
        }));
    }

    fn check_volt(&mut self, tokens: &[&str]) {
        // CHECKVOLT, ID, SIG/REF.PIN [, GROUP [, VOLT]]
        let endpoint = Endpoint::parse(tokens[1], tokens[2]);
        debug!("Decoding CHECKVOLT {}", endpoint);
        if let Some(comment) = self.pending_comment.take() {
            self.system.volt_checks.push(Queued::Comment(comment));
        }
        self.system.volt_checks.push(Queued::Check(VoltRequest {
            endpoint,
            group: tokens.get(3).map(|s| s.to_string()),
            desired_volt: tokens.get(4).and_then(|s| s.parse().ok()),
        }));
    }

    fn harness_link(&mut self, tokens: &[&str]) {
        // HARNESSLINK, ID, REF1, PIN1, REF2, PIN2
        if !self.system.is_harness(tokens[1]) {
            // Comment blocks bind to the first link of a harness, not to a
            // later check.
            self.pending_comment.take();
        }
        self.system.add_harness_link(
            tokens[1],
            &format!("{}.{}", tokens[2], tokens[3]),
            &format!("{}.{}", tokens[4], tokens[5]),
        );
    }

    fn connection(&mut self, tokens: &[&str]) {
        // CONNECTION, FROM ID, FROM REF, TO ID, TO REF
        self.system
            .add_connection(tokens[1], tokens[2], tokens[3], tokens[4]);
    }

    fn map(&mut self, tokens: &[&str]) {
        // MAP, ID, REF, NAME
        let id_ref = format!("{}.{}", tokens[1], tokens[2]);
        self.system.maps.insert(id_ref.clone(), tokens[3].to_string());
        if let Some(comment) = self.pending_comment.take() {
            self.system.map_seq.push(MapEntry::Comment(comment));
        }
        self.system.map_seq.push(MapEntry::Ref(id_ref));
    }

    fn device_link(&mut self, tokens: &[&str]) {
        // DEVICELINK, TYPE, PIN, PIN [, BIDIR [, VOLT, VOLT]]
        let device = self.system.device_mut(tokens[1]);
        device
            .straight_through
            .insert(tokens[2].to_string(), tokens[3].to_string());
        if tokens.get(4).map_or(false, |s| !s.is_empty()) {
            device
                .straight_through
                .insert(tokens[3].to_string(), tokens[2].to_string());
        }
        if tokens.len() > 6 {
            if let (Ok(volt_a), Ok(volt_b)) =
                (tokens[5].parse::<f64>(), tokens[6].parse::<f64>())
            {
                device.pin_volts.insert(tokens[2].to_string(), volt_a);
                device.pin_volts.insert(tokens[3].to_string(), volt_b);
            }
        }
    }

    fn device_pull(&mut self, tokens: &[&str]) {
        // DEVICEPULL, TYPE [, COUNT_A], DIR, PIN_A..., PIN_B...
        let (count_a, dir, a_start) =
            if !tokens[2].is_empty() && tokens[2].chars().all(|c| c.is_ascii_digit()) {
                match tokens.get(3) {
                    Some(dir) => (tokens[2].parse().unwrap_or(1), *dir, 4),
                    None => {
                        warn!("DEVICEPULL missing direction: {:?}", tokens);
                        return;
                    }
                }
            } else {
                (1usize, tokens[2], 3)
            };

        let a_end = (a_start + count_a).min(tokens.len());
        let pins_a = &tokens[a_start..a_end];
        let pins_b = &tokens[a_end.min(tokens.len())..];
        if pins_a.is_empty() || pins_b.is_empty() {
            warn!("DEVICEPULL needs pins on both sides: {:?}", tokens);
            return;
        }

        let device = self.system.device_mut(tokens[1]);
        for a in pins_a {
            for b in pins_b {
                match dir {
                    "BA" => {
                        device.pull_links.insert(b.to_string(), a.to_string());
                    }
                    "ABBA" => {
                        device.pull_links.insert(a.to_string(), b.to_string());
                        device.pull_links.insert(b.to_string(), a.to_string());
                    }
                    _ => {
                        device.pull_links.insert(a.to_string(), b.to_string());
                    }
                }
            }
        }
    }

    fn device_volt(&mut self, tokens: &[&str]) {
        // DEVICEVOLT, TYPE, VOLT, PIN [, PIN ...]
        let volts: f64 = match tokens[2].parse() {
            Ok(v) => v,
            Err(_) => {
                warn!("DEVICEVOLT: unable to convert {:?} into voltage", tokens[2]);
                return;
            }
        };
        let device = self.system.device_mut(tokens[1]);
        for pin in &tokens[3..] {
            device.pin_volts.insert(pin.to_string(), volts);
        }
    }

    fn device_pin(&mut self, tokens: &[&str]) {
        // DEVICEPIN, TYPE, RC, ROWS, COLS, DIR
        // DEVICEPIN, TYPE, ARB, ROW, COL, PIN
        // DEVICEPIN, TYPE, CATEGORY, NAME, PIN1 [, PIN2 ...]
        let device = self.system.device_mut(tokens[1]);
        let layout = device.layout.get_or_insert_with(Default::default);
        match tokens[2] {
            "RC" => {
                let rows = tokens[3].parse().unwrap_or(0);
                let cols = tokens[4].parse().unwrap_or(0);
                layout.fill_grid(rows, cols, tokens[5]);
            }
            "ARB" => {
                let row = tokens[3].parse().unwrap_or(0);
                let col = tokens[4].parse().unwrap_or(0);
                layout.place(row, col, tokens[5]);
            }
            "CATEGORY" => {
                let pins = tokens[4..].iter().map(|s| s.to_string()).collect();
                layout.set_category(tokens[3], pins);
            }
            other => warn!("DEVICEPIN layout kind {:?} not recognized", other),
        }
    }

    fn ref_volt(&mut self, tokens: &[&str]) {
        // REFVOLT, ID, REF, VOLT, PIN [, PIN ...]
        let volts: f64 = match tokens[3].parse() {
            Ok(v) => v,
            Err(_) => {
                warn!("REFVOLT: cannot convert {:?} into voltage", tokens[3]);
                return;
            }
        };
        for pin in &tokens[4..] {
            let id_ref_pin = format!("{}.{}.{}", tokens[1], tokens[2], pin);
            if self.system.ref_volts.contains_key(&id_ref_pin) {
                warn!("REFVOLT: duplicate voltage for {}, keeping the first", id_ref_pin);
            } else {
                self.system.ref_volts.insert(id_ref_pin, volts);
            }
        }
    }

    fn ref_sig(&mut self, tokens: &[&str]) {
        // REFSIG, ID, REF, PIN, INT SIGNAL, EXT SIGNAL [, IOSTANDARD]
        let id_ref = format!("{}.{}", tokens[1], tokens[2]);
        if !self.system.ref_sigs.contains_key(&id_ref) {
            self.system.ref_sig_order.push(id_ref.clone());
        }
        self.system
            .ref_sigs
            .entry(id_ref)
            .or_default()
            .push(SignalRelation {
                pin: tokens[3].to_string(),
                internal: tokens[4].to_string(),
                external: tokens[5].to_string(),
                io_standard: tokens.get(6).unwrap_or(&"NA").to_string(),
            });
    }

    fn device_param(&mut self, tokens: &[&str]) {
        // DEVICEPARAM, TYPE, PARAM, VALUE [, PARAM, VALUE ...]
        let device = self.system.device_mut(tokens[1]);
        if !device.params.is_empty() {
            debug!("DEVICEPARAM: {} already characterized, keeping the first", tokens[1]);
            return;
        }
        for pair in tokens[2..].chunks_exact(2) {
            device.params.insert(pair[0].to_string(), pair[1].to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::system::Queued;
    use std::io::Write;

    fn load_str(content: &str) -> System {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("driver.csv");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        DriverParser::load(&path).unwrap()
    }

    #[test]
    fn test_connection_and_harness() {
        let system = load_str(
            "CONNECTION, A, J1, H, P1,,,\n\
             HARNESSLINK, H, P1, 5, P2, 7\n",
        );
        assert_eq!(system.connections.get("A.J1"), Some(&"H.P1".to_string()));
        assert_eq!(system.connections.get("H.P1"), Some(&"A.J1".to_string()));
        assert_eq!(system.harnesses["H"].get("P1.5"), Some(&"P2.7".to_string()));
        assert_eq!(system.harnesses["H"].get("P2.7"), Some(&"P1.5".to_string()));
    }

    #[test]
    fn test_device_link_bidir_and_volts() {
        let system = load_str(
            "DEVICELINK, BUFFER, 1, 2\n\
             DEVICELINK, XCVR, 3, 4, BIDIR, 3.3, 1.8\n",
        );
        let buffer = system.device("BUFFER").unwrap();
        assert_eq!(buffer.straight_through.get("1"), Some(&"2".to_string()));
        assert_eq!(buffer.straight_through.get("2"), None);

        let xcvr = system.device("XCVR").unwrap();
        assert_eq!(xcvr.straight_through.get("3"), Some(&"4".to_string()));
        assert_eq!(xcvr.straight_through.get("4"), Some(&"3".to_string()));
        assert_eq!(xcvr.pin_volts.get("3"), Some(&3.3));
        assert_eq!(xcvr.pin_volts.get("4"), Some(&1.8));
    }

    #[test]
    fn test_device_pull_directions() {
        let system = load_str(
            "DEVICEPULL, SW_AB, AB, 1, 2, 3\n\
             DEVICEPULL, SW_BA, BA, 1, 2\n\
             DEVICEPULL, SW_BOTH, ABBA, 1, 2\n",
        );
        let ab = &system.device("SW_AB").unwrap().pull_links;
        assert_eq!(ab.get("1"), Some(&"3".to_string()));
        assert_eq!(ab.get("2"), None);

        let ba = &system.device("SW_BA").unwrap().pull_links;
        assert_eq!(ba.get("2"), Some(&"1".to_string()));
        assert_eq!(ba.get("1"), None);

        let both = &system.device("SW_BOTH").unwrap().pull_links;
        assert_eq!(both.get("1"), Some(&"2".to_string()));
        assert_eq!(both.get("2"), Some(&"1".to_string()));
    }

    #[test]
    fn test_device_pull_count_a() {
        let system = load_str("DEVICEPULL, LDO, 2, AB, 1, 2, 8, 9\n");
        let links = &system.device("LDO").unwrap().pull_links;
        // Pins 1 and 2 each link to both of 8 and 9; the last insert wins
        // per source pin.
        assert_eq!(links.get("1"), Some(&"9".to_string()));
        assert_eq!(links.get("2"), Some(&"9".to_string()));
        assert_eq!(links.len(), 2);
    }

    #[test]
    fn test_refvolt_keeps_first() {
        let system = load_str(
            "REFVOLT, A, U1, 3.3, 4, 5\n\
             REFVOLT, A, U1, 1.8, 4\n",
        );
        assert_eq!(system.ref_volts.get("A.U1.4"), Some(&3.3));
        assert_eq!(system.ref_volts.get("A.U1.5"), Some(&3.3));
    }

    #[test]
    fn test_checktrace_fields() {
        let system = load_str(
            "CHECKTRACE, A, SIG_X, B, SIG_Y\n\
             CHECKTRACE, A, J1.5, B, SIG_Z, POWER, 3.3\n\
             CHECKTRACE, A, SIG_W, B, SIG_V, GRP, notavolt\n",
        );
        let checks: Vec<&TraceRequest> = system
            .trace_checks
            .iter()
            .filter_map(|q| match q {
                Queued::Check(c) => Some(c),
                _ => None,
            })
            .collect();
        assert_eq!(checks.len(), 3);
        assert_eq!(checks[0].group, None);
        assert_eq!(checks[0].desired_volt, None);
        assert_eq!(checks[1].from.to_string(), "A.J1.5");
        assert_eq!(checks[1].group.as_deref(), Some("POWER"));
        assert_eq!(checks[1].desired_volt, Some(3.3));
        // Unparseable voltages are simply absent.
        assert_eq!(checks[2].desired_volt, None);
    }

    #[test]
    fn test_comment_attaches_to_next_check() {
        let system = load_str(
            "COMMENT, power rail checks\n\
             COMMENT, second line\n\
             CHECKVOLT, A, NET_1\n\
             CHECKVOLT, A, NET_2\n",
        );
        assert_eq!(system.volt_checks.len(), 3);
        match &system.volt_checks[0] {
            Queued::Comment(c) => {
                assert_eq!(c, " power rail checks\n second line\n");
            }
            _ => panic!("Expected leading comment"),
        }
        assert!(matches!(system.volt_checks[1], Queued::Check(_)));
        assert!(matches!(system.volt_checks[2], Queued::Check(_)));
    }

    #[test]
    fn test_import_once() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("devices.csv");
        fs::write(&sub, "DEVICELINK, BUFFER, 1, 2\n").unwrap();
        let root = dir.path().join("main.csv");
        fs::write(
            &root,
            "IMPORT, devices.csv\nIMPORT, devices.csv\nDEVICELINK, BUFFER, 3, 4\n",
        )
        .unwrap();

        let system = DriverParser::load(&root).unwrap();
        let links = &system.device("BUFFER").unwrap().straight_through;
        assert_eq!(links.len(), 2);
    }

    #[test]
    fn test_netlist_attaches_board() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.asc"),
            "*PART*\nJ1 CONN\n\n*CONNECTION*\n*SIGNAL* SIG_X\n J1.5 J1.6\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("main.csv"),
            "NETLIST, A, a.asc\nRAIL, A, SIG_X, 5.0\nIGNORE, A, SIGNAL, SIG_X\n",
        )
        .unwrap();

        let system = DriverParser::load(&dir.path().join("main.csv")).unwrap();
        assert_eq!(system.board_order, vec!["A".to_string()]);
        let board = system.board("A").unwrap();
        assert_eq!(board.rail_voltage("SIG_X"), Some(5.0));
        assert!(system.ignore.signals.contains("A.SIG_X"));
    }

    #[test]
    fn test_unknown_directive_is_skipped() {
        let system = load_str("FROBNICATE, A, B\n,blank first column\n");
        assert!(system.boards.is_empty());
        assert!(system.trace_checks.is_empty());
    }

    #[test]
    fn test_device_pin_layouts() {
        let system = load_str(
            "DEVICEPIN, CONN_2X3, RC, 2, 3, TLH\n\
             DEVICEPIN, FPGA, CATEGORY, BANK0, A1, A2\n\
             DEVICEPIN, FPGA, CATEGORY, BANK1, B1\n\
             DEVICEPIN, ODDBALL, ARB, 2, 2, K9\n",
        );
        let grid = system.device("CONN_2X3").unwrap().layout.as_ref().unwrap();
        assert_eq!(grid.rows, 2);
        assert_eq!(grid.cols, 3);
        assert_eq!(grid.map.get(&(2, 3)), Some(&"6".to_string()));

        let fpga = system.device("FPGA").unwrap().layout.as_ref().unwrap();
        assert_eq!(fpga.categories.len(), 2);

        let odd = system.device("ODDBALL").unwrap().layout.as_ref().unwrap();
        assert_eq!(odd.map.get(&(2, 2)), Some(&"K9".to_string()));
    }

    #[test]
    fn test_refsig_and_deviceparam() {
        let system = load_str(
            "REFSIG, A, U7, AA34, dad_addr_int, dad_addr[0], LVCMOS25\n\
             REFSIG, A, U7, AA35, dad_clk_int, dad_clk\n\
             DEVICEPARAM, V7_FPGA, DEVICETYPE, XILINX_FPGA, VENDOR, XILINX\n\
             DEVICEPARAM, V7_FPGA, DEVICETYPE, ALTERA_FPGA\n",
        );
        let relations = &system.ref_sigs["A.U7"];
        assert_eq!(relations.len(), 2);
        assert_eq!(relations[0].io_standard, "LVCMOS25");
        assert_eq!(relations[1].io_standard, "NA");
        assert_eq!(system.ref_sig_order, vec!["A.U7".to_string()]);

        let params = &system.device("V7_FPGA").unwrap().params;
        // First characterization wins.
        assert_eq!(params.get("DEVICETYPE"), Some(&"XILINX_FPGA".to_string()));
        assert_eq!(params.get("VENDOR"), Some(&"XILINX".to_string()));
    }
}
