//! Depth-first trace engine.
//!
//! Answers "does a conductive path exist" between two endpoints, across PCB
//! nets, straight-through devices, board-to-board connectors and harness
//! wiring. Expansion follows each net's membership in source order, trying
//! a connector hop first and a device crossing second; the first successful
//! branch is committed. The search finds one path, not all, and makes no
//! shortest-path promise.

use tracing::debug;

use crate::model::device::DeviceTable;
use crate::model::system::{Endpoint, NetRef, System};

use super::cross::{cross_device, follow_connection};
use super::walk::WalkState;

/// Result of a trace query.
#[derive(Debug, Clone)]
pub struct TraceOutcome {
    pub found: bool,
    pub walk: WalkState,
}

/// Run a trace between two endpoints (signal- or pin-form).
///
/// Pin endpoints promote to their net before the walk; when the walk
/// succeeds without leaving the starting net, a pin endpoint is recorded as
/// the path anchor so the report still names a pin.
pub fn check_trace(system: &System, from: &Endpoint, to: &Endpoint) -> TraceOutcome {
    let from_net = system.endpoint_net(from);
    let to_net = system.endpoint_net(to);

    let mut walk = WalkState::new();
    let found = match (from_net, to_net) {
        (Some(from_net), Some(to_net)) => trace(system, &from_net, &to_net, &mut walk),
        _ => false,
    };

    if found && walk.is_empty() {
        if let Endpoint::Pin { .. } = from {
            walk.push(from.to_string());
        } else if let Endpoint::Pin { .. } = to {
            walk.push(to.to_string());
        }
    }

    TraceOutcome { found, walk }
}

/// Depth-first search from one net to another. Returns true on the first
/// path found; `walk` then holds the visited pins in path order. Every
/// exceptional condition (unknown board, unknown net, malformed member)
/// degrades to a dead edge.
pub fn trace(system: &System, from: &NetRef, to: &NetRef, walk: &mut WalkState) -> bool {
    if from == to {
        return true;
    }
    // Ground fans out to everything; never trace through it.
    if from.signal == "GND" || to.signal == "GND" {
        return false;
    }
    let Some(board) = system.boards.get(&from.board) else {
        return false;
    };
    let Some(members) = board.members_of(&from.signal) else {
        return false;
    };

    debug!("Tracing {} -> {}", from, to);
    for ref_pin in members {
        let Some((refdes, _pin)) = ref_pin.split_once('.') else {
            continue;
        };
        let path_id = format!("{}.{}", from.board, ref_pin);

        if system.has_connection_ref(&from.board, refdes) {
            // Connector hop. A connection refdes is never also crossed as
            // a device.
            if walk.contains(&path_id) {
                continue;
            }
            let mut fork = walk.clone();
            fork.push(path_id);
            if let Some(exit) = follow_connection(system, &from.board, ref_pin, &mut fork) {
                if trace(system, &exit, to, &mut fork) {
                    *walk = fork;
                    return true;
                }
            }
        } else if let Some(part_type) = board.part_type(refdes) {
            let Some(device) = system.devices.get(part_type) else {
                continue;
            };
            if !device.passes_signals()
                || system.ignore.devices.contains(part_type)
                || walk.contains(&path_id)
            {
                continue;
            }
            let mut fork = walk.clone();
            fork.push(path_id);
            if let Some(exit) = cross_device(
                board,
                &from.board,
                ref_pin,
                device,
                DeviceTable::StraightThrough,
                Some(&mut fork),
            ) {
                if trace(system, &exit, to, &mut fork) {
                    *walk = fork;
                    return true;
                }
            }
        }
    }
    false
}
