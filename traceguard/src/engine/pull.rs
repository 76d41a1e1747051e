//! Voltage pull resolution engine.
//!
//! Walks outward from a net collecting every supply rail it can reach:
//! through pull resistors (including series chains), explicit voltage
//! stakes, device pin tables, and board-to-board connections. Every reach
//! of a rail is tabulated, so disagreeing voltages surface as conflicts.
//!
//! Hitting an operator-ignored signal abandons the walk, clears whatever
//! was collected, and widens the ignore set to every net seen so far: a
//! net that only resolves through a don't-care net is itself don't-care.

use tracing::debug;

use crate::model::device::DeviceTable;
use crate::model::system::{Endpoint, System};

use super::cross::{cross_device, follow_connection};
use super::walk::WalkState;

/// Accumulated pull results for one query.
#[derive(Debug, Clone, Default)]
pub struct PullInfo {
    /// Human-readable pull descriptions, in discovery order.
    pub pulls: Vec<String>,

    /// Voltages paired with `pulls`. Rails reached more than once appear
    /// once per reach.
    pub voltages: Vec<f64>,

    /// Qualified signals visited by this query, in visit order.
    pub pull_signals: Vec<String>,
}

/// Resolve every pull reachable from an endpoint.
///
/// The seed is normalized to a pin anchor (signal endpoints promote to
/// their net's first member) so the report has a starting path node.
/// Returns the anchor path and the collected pulls.
pub fn resolve_pulls(system: &mut System, endpoint: &Endpoint) -> (Vec<String>, PullInfo) {
    let mut info = PullInfo::default();
    let mut path = Vec::new();

    match endpoint {
        Endpoint::Pin { .. } => path.push(endpoint.to_string()),
        Endpoint::Signal { .. } => {
            if let Some(net) = system.endpoint_net(endpoint) {
                if let Some(anchor) = system.net_anchor(&net) {
                    path.push(anchor);
                }
            }
        }
    }

    add_pulls(system, &path, &mut info);
    (path, info)
}

/// Collect pulls for every pin on a walked path.
///
/// Each `Board.Ref.Pin` node resolves to its net and the net is walked;
/// the shared visit list keeps a net from being re-walked by a later path
/// node in the same query.
pub fn add_pulls(system: &mut System, path: &[String], info: &mut PullInfo) {
    for node in path {
        let tokens: Vec<&str> = node.split('.').collect();
        if tokens.len() < 3 {
            continue;
        }
        let (id, refdes, pin) = (tokens[0], tokens[1], tokens[2]);
        let signal = match system
            .boards
            .get(id)
            .and_then(|b| b.signal_of(&format!("{}.{}", refdes, pin)))
        {
            Some(s) => s.to_string(),
            None => continue,
        };
        let id = id.to_string();
        let mut pull_path = WalkState::new();
        pull_net(system, &id, &signal, info, &mut pull_path);
    }
}

/// Walk one net, recording pulls into `info`. Returns true when the walk
/// crossed an ignored signal; collected pulls are cleared on every frame of
/// the way out.
fn pull_net(
    system: &mut System,
    board_id: &str,
    signal: &str,
    info: &mut PullInfo,
    pull_path: &mut WalkState,
) -> bool {
    let id_signal = format!("{}.{}", board_id, signal);

    if system.ignore.signals.contains(&id_signal) {
        debug!("{} is ignored, widening the ignore set", id_signal);
        for seen in &info.pull_signals {
            system.ignore.signals.insert(seen.clone());
        }
        info.pulls.clear();
        info.voltages.clear();
        return true;
    }

    let rail = system
        .boards
        .get(board_id)
        .and_then(|b| b.rail_voltage(signal));
    let visited = info.pull_signals.contains(&id_signal);
    // Rails re-enter so every reach is tabulated; NC pins never enter.
    if !((!signal.starts_with("NC") && !visited) || rail.is_some()) {
        return false;
    }

    if let Some(volts) = rail {
        let pull = match rail_entry_pin(system, pull_path) {
            Some(via) => format!("{} to {}", via, signal),
            None => format!("direct to {}", signal),
        };
        debug!("{} is a rail: {}", id_signal, pull);
        info.pulls.push(pull);
        info.voltages.push(volts);
        return false;
    }

    info.pull_signals.push(id_signal);
    let members: Vec<String> = match system
        .boards
        .get(board_id)
        .and_then(|b| b.members_of(signal))
    {
        Some(m) => m.to_vec(),
        None => return false,
    };

    let mut ignored = false;
    for ref_pin in &members {
        if ignored {
            break;
        }
        let Some((refdes, pin)) = ref_pin.split_once('.') else {
            continue;
        };
        let id_ref_pin = format!("{}.{}", board_id, ref_pin);

        // Externally staked pin voltage.
        if let Some(volts) = system.ref_volts.get(&id_ref_pin).copied() {
            debug!("{} staked at {:.2}", id_ref_pin, volts);
            info.pulls
                .push(format!("{} specified at {:.2}", id_ref_pin, volts));
            info.voltages.push(volts);
        }

        // Pull resistor: R-prefixed refdes, placed, not ignored. The far
        // side is the opposite pin of the 1/2 pair.
        if is_resistor(refdes) && !system.ignore.devices.contains(refdes) {
            let far = system.boards.get(board_id).and_then(|board| {
                let part = board.part_type(refdes)?;
                if part.to_lowercase().contains("dnp") {
                    return None;
                }
                let far_pin = if pin == "1" { "2" } else { "1" };
                let far_ref_pin = format!("{}.{}", refdes, far_pin);
                let far_signal = board.signal_of(&far_ref_pin)?;
                Some((
                    part.to_string(),
                    far_ref_pin,
                    far_signal.to_string(),
                    board.rail_voltage(far_signal),
                ))
            });
            if let Some((part, far_ref_pin, far_signal, far_rail)) = far {
                match far_rail {
                    None => {
                        // Series resistor: keep walking on its far net.
                        ignored |= pull_net(system, board_id, &far_signal, info, pull_path);
                    }
                    Some(volts) if volts != 0.0 => {
                        debug!(
                            "Resistor {}.{} pulls {} to {}",
                            board_id, far_ref_pin, signal, far_signal
                        );
                        info.pulls.push(format!(
                            "{}.{} ({}) to {}",
                            board_id, part, far_ref_pin, far_signal
                        ));
                        info.voltages.push(volts);
                    }
                    // Ground pulls stay silent; they only manufacture
                    // conflicts.
                    Some(_) => {}
                }
            }
        }

        // Device rules: staked pin voltages, then the two pin tables.
        let part_type = system
            .boards
            .get(board_id)
            .and_then(|b| b.part_type(refdes))
            .map(str::to_string);
        if let Some(part_type) = part_type {
            if !ignored && !system.ignore.devices.contains(&part_type) {
                if let Some(volts) = system
                    .devices
                    .get(&part_type)
                    .and_then(|d| d.pin_volts.get(pin))
                    .copied()
                {
                    debug!("{} ({}) holds {} at {:.2}", id_ref_pin, part_type, signal, volts);
                    info.pulls.push(format!(
                        "{}.{} ({}) to {:.2}",
                        board_id, ref_pin, part_type, volts
                    ));
                    info.voltages.push(volts);
                }

                for table in [DeviceTable::StraightThrough, DeviceTable::PullLinks] {
                    if ignored {
                        break;
                    }
                    let has_table = system
                        .devices
                        .get(&part_type)
                        .map_or(false, |d| !d.table(table).is_empty());
                    if has_table && !pull_path.contains(&id_ref_pin) {
                        pull_path.push(id_ref_pin.clone());
                        let exit = {
                            let board = system.boards.get(board_id);
                            let device = system.devices.get(&part_type);
                            match (board, device) {
                                (Some(board), Some(device)) => cross_device(
                                    board,
                                    board_id,
                                    ref_pin,
                                    device,
                                    table,
                                    Some(&mut *pull_path),
                                ),
                                _ => None,
                            }
                        };
                        if let Some(exit) = exit {
                            ignored |=
                                pull_net(system, &exit.board, &exit.signal, info, pull_path);
                        }
                    }
                }
            }
        }

        // Board-to-board connection off this net.
        if !ignored
            && system.has_connection_ref(board_id, refdes)
            && !pull_path.contains(&id_ref_pin)
        {
            pull_path.push(id_ref_pin.clone());
            let exit = follow_connection(&*system, board_id, ref_pin, pull_path);
            if let Some(exit) = exit {
                ignored |= pull_net(system, &exit.board, &exit.signal, info, pull_path);
            }
        }
    }

    if ignored {
        info.pulls.clear();
        info.voltages.clear();
    }
    ignored
}

/// The device pin that led into a rail net, two hops back on the pull
/// path, rendered as `Board.PartType (Ref.Pin)`.
fn rail_entry_pin(system: &System, pull_path: &WalkState) -> Option<String> {
    let node = pull_path.second_to_last()?;
    let tokens: Vec<&str> = node.split('.').collect();
    if tokens.len() < 3 {
        return None;
    }
    let (id, refdes, pin) = (tokens[0], tokens[1], tokens[2]);
    let part = system
        .boards
        .get(id)
        .and_then(|b| b.part_type(refdes))
        .unwrap_or("?");
    Some(format!("{}.{} ({}.{})", id, part, refdes, pin))
}

/// Pull resistors are recognized by designator shape: `R` followed by a
/// digit (`R10`), which keeps RN networks and RT thermistors out.
fn is_resistor(refdes: &str) -> bool {
    let mut chars = refdes.chars();
    chars.next() == Some('R') && chars.next().map_or(false, |c| c.is_ascii_digit())
}
