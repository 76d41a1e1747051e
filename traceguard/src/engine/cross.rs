//! Single-hop crossings: through a device, and through a board-to-board
//! connection with its harness wiring.

use tracing::debug;

use crate::model::board::Board;
use crate::model::device::{DeviceTable, DeviceType};
use crate::model::system::{NetRef, System};

use super::walk::WalkState;

/// Cross a device from one pin to its peer pin on the same refdes.
///
/// Looks up the peer in the chosen pin table and resolves the peer pin's
/// net on the same board. With a walk state, the exit pin is recorded on
/// the path; an exit pin already on the path is a dead edge, as is a peer
/// pin the netlist never wired.
pub fn cross_device(
    board: &Board,
    board_id: &str,
    ref_pin: &str,
    device: &DeviceType,
    table: DeviceTable,
    walk: Option<&mut WalkState>,
) -> Option<NetRef> {
    let (refdes, pin) = ref_pin.split_once('.')?;
    let peer = device.table(table).get(pin)?;
    let to_ref_pin = format!("{}.{}", refdes, peer);
    let signal = board.signal_of(&to_ref_pin)?.to_string();

    if let Some(walk) = walk {
        let node = format!("{}.{}", board_id, to_ref_pin);
        if walk.contains(&node) {
            return None;
        }
        walk.push(node);
    }
    debug!("{}.{} crosses {} to {}", board_id, ref_pin, refdes, signal);
    Some(NetRef::new(board_id, signal))
}

/// Follow a board-to-board connection, chaining through harness wiring
/// until a PCB net is reached.
///
/// Pin numbers are identical on both sides of a mating; harness wiring may
/// change them. Arrival pins are appended to the walk path; a harness pin
/// already on the path means the chain loops and the hop is refused.
pub fn follow_connection(
    system: &System,
    board_id: &str,
    ref_pin: &str,
    walk: &mut WalkState,
) -> Option<NetRef> {
    let (refdes, pin) = ref_pin.split_once('.')?;
    let to_id_ref = system.connections.get(&format!("{}.{}", board_id, refdes))?;
    let (to_id, to_ref) = to_id_ref.split_once('.')?;
    let to_ref_pin = format!("{}.{}", to_ref, pin);

    if let Some(wires) = system.harnesses.get(to_id) {
        let linked = wires.get(&to_ref_pin)?;
        let arrival = format!("{}.{}", to_id, to_ref_pin);
        if walk.contains(&arrival) {
            debug!("Harness chain loops at {}", arrival);
            return None;
        }
        walk.push(arrival);
        walk.push(format!("{}.{}", to_id, linked));
        follow_connection(system, to_id, linked, walk)
    } else if let Some(board) = system.boards.get(to_id) {
        let signal = board.signal_of(&to_ref_pin)?.to_string();
        walk.push(format!("{}.{}", to_id, to_ref_pin));
        debug!("{}.{} lands on {}.{}", board_id, ref_pin, to_id, signal);
        Some(NetRef::new(to_id, signal))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::device::DeviceType;

    fn buffer_device() -> DeviceType {
        let mut device = DeviceType::default();
        device.straight_through.insert("1".into(), "2".into());
        device.straight_through.insert("2".into(), "1".into());
        device.pull_links.insert("5".into(), "3".into());
        device
    }

    fn board_with_buffer() -> Board {
        let mut board = Board::new();
        board.add_part("U1", "BUFFER");
        board.declare_signal("IN");
        board.attach_pin("IN", "U1.1");
        board.declare_signal("OUT");
        board.attach_pin("OUT", "U1.2");
        board.declare_signal("+3V3");
        board.attach_pin("+3V3", "U1.3");
        board
    }

    #[test]
    fn test_cross_device_straight_through() {
        let board = board_with_buffer();
        let device = buffer_device();
        let mut walk = WalkState::new();
        let exit = cross_device(
            &board,
            "A",
            "U1.1",
            &device,
            DeviceTable::StraightThrough,
            Some(&mut walk),
        );
        assert_eq!(exit, Some(NetRef::new("A", "OUT")));
        assert_eq!(walk.nodes(), &["A.U1.2".to_string()]);
    }

    #[test]
    fn test_cross_device_pull_table() {
        let board = board_with_buffer();
        let device = buffer_device();
        // Pin 5 only conducts through the pull table.
        assert_eq!(
            cross_device(&board, "A", "U1.5", &device, DeviceTable::StraightThrough, None),
            None
        );
        assert_eq!(
            cross_device(&board, "A", "U1.5", &device, DeviceTable::PullLinks, None),
            Some(NetRef::new("A", "+3V3"))
        );
    }

    #[test]
    fn test_cross_device_visited_exit_is_dead() {
        let board = board_with_buffer();
        let device = buffer_device();
        let mut walk = WalkState::new();
        walk.push("A.U1.2".to_string());
        let exit = cross_device(
            &board,
            "A",
            "U1.1",
            &device,
            DeviceTable::StraightThrough,
            Some(&mut walk),
        );
        assert_eq!(exit, None);
        assert_eq!(walk.len(), 1);
    }

    #[test]
    fn test_cross_device_unwired_peer() {
        let mut board = Board::new();
        board.add_part("U1", "BUFFER");
        board.declare_signal("IN");
        board.attach_pin("IN", "U1.1");
        // Pin 2 exists in the device table but not in the netlist.
        let device = buffer_device();
        let mut walk = WalkState::new();
        let exit = cross_device(
            &board,
            "A",
            "U1.1",
            &device,
            DeviceTable::StraightThrough,
            Some(&mut walk),
        );
        assert_eq!(exit, None);
        assert!(walk.is_empty());
    }

    fn two_board_system() -> System {
        let mut system = System::new();

        let mut a = Board::new();
        a.add_part("J1", "CONN");
        a.declare_signal("SIG_X");
        a.attach_pin("SIG_X", "J1.5");
        system.boards.insert("A".into(), a);

        let mut b = Board::new();
        b.add_part("J3", "CONN");
        b.declare_signal("SIG_Y");
        b.attach_pin("SIG_Y", "J3.7");
        system.boards.insert("B".into(), b);

        system.add_connection("A", "J1", "H", "P1");
        system.add_harness_link("H", "P1.5", "P2.7");
        system.add_connection("H", "P2", "B", "J3");
        system
    }

    #[test]
    fn test_follow_connection_through_harness() {
        let system = two_board_system();
        let mut walk = WalkState::new();
        let exit = follow_connection(&system, "A", "J1.5", &mut walk);
        assert_eq!(exit, Some(NetRef::new("B", "SIG_Y")));
        assert_eq!(
            walk.nodes(),
            &[
                "H.P1.5".to_string(),
                "H.P2.7".to_string(),
                "B.J3.7".to_string()
            ]
        );
    }

    #[test]
    fn test_follow_connection_unmapped_pin() {
        let system = two_board_system();
        let mut walk = WalkState::new();
        // Pin 9 has no harness wire.
        assert_eq!(follow_connection(&system, "A", "J1.9", &mut walk), None);
    }

    #[test]
    fn test_follow_connection_unknown_ref() {
        let system = two_board_system();
        let mut walk = WalkState::new();
        assert_eq!(follow_connection(&system, "A", "J2.1", &mut walk), None);
        assert!(walk.is_empty());
    }

    #[test]
    fn test_follow_connection_refuses_harness_loop() {
        let mut system = System::new();
        let mut a = Board::new();
        a.declare_signal("SIG");
        a.attach_pin("SIG", "J1.1");
        system.boards.insert("A".into(), a);
        // H1 wires back out into H2, which wires back into H1.
        system.add_connection("A", "J1", "H1", "P1");
        system.add_harness_link("H1", "P1.1", "P2.1");
        system.add_connection("H1", "P2", "H2", "Q1");
        system.add_harness_link("H2", "Q1.1", "Q2.1");
        system.add_connection("H2", "Q2", "H1", "P1");

        let mut walk = WalkState::new();
        assert_eq!(follow_connection(&system, "A", "J1.1", &mut walk), None);
    }
}
