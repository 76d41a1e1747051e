//! Pinout (MAP) report writer.
//!
//! Renders each labelled connector or device with its pins and the nets
//! they land on. Pin placement comes from the part type's layout data when
//! there is any: a rectangular grid, category groups with a remaining-pins
//! tail, or a plain vertical list.

use std::collections::HashSet;
use std::io::{self, Write};

use tracing::warn;

use crate::model::board::Board;
use crate::model::device::PinLayout;
use crate::model::system::{MapEntry, System};

pub struct PinoutReportWriter;

impl PinoutReportWriter {
    /// Write the pinout report for every MAP entry, in sequence order.
    pub fn write<W: Write>(out: &mut W, system: &System) -> io::Result<()> {
        for entry in &system.map_seq {
            match entry {
                MapEntry::Comment(comment) => write!(out, "\n{}\n", comment)?,
                MapEntry::Ref(id_ref) => Self::write_ref(out, system, id_ref)?,
            }
        }
        Ok(())
    }

    fn write_ref<W: Write>(out: &mut W, system: &System, id_ref: &str) -> io::Result<()> {
        let Some((id, refdes)) = id_ref.split_once('.') else {
            warn!("MAP entry {:?} is not Board.Ref", id_ref);
            return Ok(());
        };
        let Some(board) = system.boards.get(id) else {
            warn!("MAP entry {} names unknown board {}", id_ref, id);
            return Ok(());
        };
        let name = system.maps.get(id_ref).map(String::as_str).unwrap_or("");
        let part_type = board.part_type(refdes).unwrap_or("");

        write!(
            out,
            "\n=\"{}\",=\"{}\"\n=\"{}\",=\"{}\"\n",
            id_ref, name, id_ref, part_type
        )?;

        let layout = system
            .device(part_type)
            .and_then(|device| device.layout.as_ref());
        match layout {
            Some(layout) if !layout.categories.is_empty() => {
                Self::write_categories(out, board, refdes, layout)
            }
            Some(layout) => Self::write_grid(out, board, refdes, layout),
            None => Self::write_vertical(out, board, refdes),
        }
    }

    fn write_vertical<W: Write>(out: &mut W, board: &Board, refdes: &str) -> io::Result<()> {
        for pin in board.pins_of(refdes).unwrap_or(&[]) {
            writeln!(
                out,
                ",,=\"{}\",=\"{}\"",
                pin,
                net_of(board, refdes, pin)
            )?;
        }
        Ok(())
    }

    fn write_categories<W: Write>(
        out: &mut W,
        board: &Board,
        refdes: &str,
        layout: &PinLayout,
    ) -> io::Result<()> {
        let mut grouped: HashSet<&str> = HashSet::new();
        for (category, pins) in &layout.categories {
            let mut first = true;
            for pin in pins {
                grouped.insert(pin.as_str());
                if first {
                    write!(out, ",=\"{}\",", category)?;
                    first = false;
                } else {
                    write!(out, ",,")?;
                }
                writeln!(out, "=\"{}\",=\"{}\"", pin, net_of(board, refdes, pin))?;
            }
        }

        let mut first = true;
        for pin in board.pins_of(refdes).unwrap_or(&[]) {
            if grouped.contains(pin.as_str()) {
                continue;
            }
            if first {
                write!(out, ",=\"REMAINING PINS\",")?;
                first = false;
            } else {
                write!(out, ",,")?;
            }
            writeln!(out, "=\"{}\",=\"{}\"", pin, net_of(board, refdes, pin))?;
        }
        Ok(())
    }

    fn write_grid<W: Write>(
        out: &mut W,
        board: &Board,
        refdes: &str,
        layout: &PinLayout,
    ) -> io::Result<()> {
        for row in 1..=layout.rows {
            write!(out, ",,")?;
            for col in 1..=layout.cols {
                match layout.map.get(&(row, col)) {
                    Some(pin) => {
                        write!(out, "=\"{}\",=\"{}\",", pin, net_of(board, refdes, pin))?
                    }
                    None => write!(out, "=\"\",=\"\",")?,
                }
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

fn net_of<'a>(board: &'a Board, refdes: &str, pin: &str) -> &'a str {
    board
        .signal_of(&format!("{}.{}", refdes, pin))
        .unwrap_or("")
}
