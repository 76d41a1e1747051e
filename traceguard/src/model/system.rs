//! System-level graph store.
//!
//! A [`System`] holds every loaded board plus the harness, connector,
//! device, stake and ignore data that tie boards together, along with the
//! check requests queued by the driver file. It is built once during load
//! and read by the traversal engines; the only traversal-time write is the
//! pull engine widening the ignore set.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::model::board::Board;
use crate::model::device::DeviceType;

/// One endpoint of a check request: a qualified signal or a qualified pin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Endpoint {
    Signal {
        board: String,
        signal: String,
    },
    Pin {
        board: String,
        refdes: String,
        pin: String,
    },
}

impl Endpoint {
    /// Build from a board id and a `SIG` / `REF.PIN` spec; a dot in the
    /// spec makes it a pin.
    pub fn parse(board: &str, spec: &str) -> Endpoint {
        match spec.split_once('.') {
            Some((refdes, pin)) => Endpoint::Pin {
                board: board.to_string(),
                refdes: refdes.to_string(),
                pin: pin.to_string(),
            },
            None => Endpoint::Signal {
                board: board.to_string(),
                signal: spec.to_string(),
            },
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Signal { board, signal } => write!(f, "{}.{}", board, signal),
            Endpoint::Pin { board, refdes, pin } => write!(f, "{}.{}.{}", board, refdes, pin),
        }
    }
}

/// A board-qualified net name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetRef {
    pub board: String,
    pub signal: String,
}

impl NetRef {
    pub fn new(board: impl Into<String>, signal: impl Into<String>) -> Self {
        Self {
            board: board.into(),
            signal: signal.into(),
        }
    }
}

impl fmt::Display for NetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.board, self.signal)
    }
}

/// A queued trace check between two endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct TraceRequest {
    pub from: Endpoint,
    pub to: Endpoint,
    pub group: Option<String>,
    pub desired_volt: Option<f64>,
}

/// A queued voltage check on one endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct VoltRequest {
    pub endpoint: Endpoint,
    pub group: Option<String>,
    pub desired_volt: Option<f64>,
}

/// Queue entry: a request, or a comment block reproduced in the report
/// ahead of the next request.
#[derive(Debug, Clone)]
pub enum Queued<T> {
    Check(T),
    Comment(String),
}

/// Pinout-report sequence entry.
#[derive(Debug, Clone)]
pub enum MapEntry {
    /// A labelled refdes, as `Board.Ref`.
    Ref(String),
    Comment(String),
}

/// One `REFSIG` association on a device instance.
#[derive(Debug, Clone)]
pub struct SignalRelation {
    /// Physical pin location on the package.
    pub pin: String,
    /// Signal name inside the device's own schematic symbol.
    pub internal: String,
    /// Signal name used everywhere else.
    pub external: String,
    pub io_standard: String,
}

/// Signals and devices the operator has excluded from traversal.
///
/// `devices` entries are matched against a resistor's refdes in the pull
/// resistor rule and against part types everywhere else.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    /// Qualified `Board.Signal` names.
    pub signals: HashSet<String>,
    pub devices: HashSet<String>,
}

/// The assembled system: boards, inter-board wiring, device behavior, and
/// queued checks.
#[derive(Debug, Clone, Default)]
pub struct System {
    pub boards: HashMap<String, Board>,

    /// Board ids in load order.
    pub board_order: Vec<String>,

    /// Harness id -> symmetric `Ref.Pin` wire map. Harness wiring may
    /// change pin numbers end to end.
    pub harnesses: HashMap<String, HashMap<String, String>>,

    /// Symmetric `Board.Ref` -> `Board.Ref` mating map. Pin numbers are
    /// identical on both sides of a mating.
    pub connections: HashMap<String, String>,

    /// Refdeses per board id that participate in a board-to-board
    /// connection, in declaration order.
    pub connection_refs: HashMap<String, Vec<String>>,

    pub devices: HashMap<String, DeviceType>,

    /// `Board.Ref.Pin` -> externally staked voltage.
    pub ref_volts: HashMap<String, f64>,

    /// `Board.Ref` -> pinout report label.
    pub maps: HashMap<String, String>,
    pub map_seq: Vec<MapEntry>,

    /// `Board.Ref` -> signal relations, with declaration order alongside.
    pub ref_sigs: HashMap<String, Vec<SignalRelation>>,
    pub ref_sig_order: Vec<String>,

    pub ignore: IgnoreSet,

    pub trace_checks: Vec<Queued<TraceRequest>>,
    pub volt_checks: Vec<Queued<VoltRequest>>,
}

impl System {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn board(&self, id: &str) -> Option<&Board> {
        self.boards.get(id)
    }

    pub fn is_harness(&self, id: &str) -> bool {
        self.harnesses.contains_key(id)
    }

    pub fn device(&self, part_type: &str) -> Option<&DeviceType> {
        self.devices.get(part_type)
    }

    /// Registry entry for a part type, created on first use.
    pub fn device_mut(&mut self, part_type: &str) -> &mut DeviceType {
        self.devices.entry(part_type.to_string()).or_default()
    }

    /// Whether a refdes on a board has a board-to-board connection.
    pub fn has_connection_ref(&self, board: &str, refdes: &str) -> bool {
        self.connection_refs
            .get(board)
            .map_or(false, |refs| refs.iter().any(|r| r == refdes))
    }

    /// Register a symmetric board-to-board connection.
    pub fn add_connection(&mut self, from_board: &str, from_ref: &str, to_board: &str, to_ref: &str) {
        let from = format!("{}.{}", from_board, from_ref);
        let to = format!("{}.{}", to_board, to_ref);
        self.connections.insert(from, to.clone());
        self.connections
            .insert(to, format!("{}.{}", from_board, from_ref));
        for (board, refdes) in [(from_board, from_ref), (to_board, to_ref)] {
            let refs = self.connection_refs.entry(board.to_string()).or_default();
            if !refs.iter().any(|r| r == refdes) {
                refs.push(refdes.to_string());
            }
        }
    }

    /// Register a symmetric harness wire.
    pub fn add_harness_link(&mut self, harness: &str, from_ref_pin: &str, to_ref_pin: &str) {
        let wires = self.harnesses.entry(harness.to_string()).or_default();
        wires.insert(from_ref_pin.to_string(), to_ref_pin.to_string());
        wires.insert(to_ref_pin.to_string(), from_ref_pin.to_string());
    }

    /// Resolve an endpoint to the net it names; pin endpoints promote
    /// through the board's pin map.
    pub fn endpoint_net(&self, endpoint: &Endpoint) -> Option<NetRef> {
        match endpoint {
            Endpoint::Signal { board, signal } => Some(NetRef::new(board, signal)),
            Endpoint::Pin { board, refdes, pin } => {
                let b = self.boards.get(board)?;
                let signal = b.signal_of(&format!("{}.{}", refdes, pin))?;
                Some(NetRef::new(board, signal))
            }
        }
    }

    /// First member pin of a net, as a `Board.Ref.Pin` path anchor.
    pub fn net_anchor(&self, net: &NetRef) -> Option<String> {
        let board = self.boards.get(&net.board)?;
        let first = board.members_of(&net.signal)?.first()?;
        Some(format!("{}.{}", net.board, first))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_parse() {
        assert_eq!(
            Endpoint::parse("A", "SIG_X"),
            Endpoint::Signal {
                board: "A".into(),
                signal: "SIG_X".into()
            }
        );
        assert_eq!(
            Endpoint::parse("A", "J1.5"),
            Endpoint::Pin {
                board: "A".into(),
                refdes: "J1".into(),
                pin: "5".into()
            }
        );
        assert_eq!(Endpoint::parse("A", "J1.5").to_string(), "A.J1.5");
    }

    #[test]
    fn test_connection_symmetry() {
        let mut system = System::new();
        system.add_connection("A", "J1", "H", "P1");
        assert_eq!(system.connections.get("A.J1"), Some(&"H.P1".to_string()));
        assert_eq!(system.connections.get("H.P1"), Some(&"A.J1".to_string()));
        assert!(system.has_connection_ref("A", "J1"));
        assert!(system.has_connection_ref("H", "P1"));
        assert!(!system.has_connection_ref("A", "J2"));
    }

    #[test]
    fn test_harness_symmetry() {
        let mut system = System::new();
        system.add_harness_link("H", "P1.5", "P2.7");
        let wires = &system.harnesses["H"];
        assert_eq!(wires.get("P1.5"), Some(&"P2.7".to_string()));
        assert_eq!(wires.get("P2.7"), Some(&"P1.5".to_string()));
    }

    #[test]
    fn test_endpoint_net_promotion() {
        let mut system = System::new();
        let mut board = Board::new();
        board.declare_signal("SIG_X");
        board.attach_pin("SIG_X", "J1.5");
        system.boards.insert("A".into(), board);

        let pin = Endpoint::parse("A", "J1.5");
        assert_eq!(
            system.endpoint_net(&pin),
            Some(NetRef::new("A", "SIG_X"))
        );
        let missing = Endpoint::parse("A", "J1.9");
        assert_eq!(system.endpoint_net(&missing), None);

        let net = NetRef::new("A", "SIG_X");
        assert_eq!(system.net_anchor(&net), Some("A.J1.5".to_string()));
    }
}
