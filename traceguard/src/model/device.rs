//! Device type registry entries.
//!
//! A device type is a reusable description of how a part's pins behave,
//! accumulated from `DEVICELINK`, `DEVICEPULL`, `DEVICEVOLT`, `DEVICEPIN`
//! and `DEVICEPARAM` driver directives and shared by every instance of the
//! part across all boards.

use std::collections::HashMap;

/// Which pin table a device crossing follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceTable {
    /// Logical signal pass-through, walked by both engines.
    StraightThrough,
    /// Voltage-propagating pin pairs, walked only by the pull engine.
    PullLinks,
}

/// Pin behavior for one part type.
#[derive(Debug, Clone, Default)]
pub struct DeviceType {
    /// Pin-to-pin signal pass-through; bidirectional links hold both
    /// directions.
    pub straight_through: HashMap<String, String>,

    /// Pin pairs that conduct a voltage without being a logical
    /// pass-through (a load switch passing its rail, for example).
    pub pull_links: HashMap<String, String>,

    /// Hard voltage stakes per pin.
    pub pin_volts: HashMap<String, f64>,

    /// Free-form parameters (`DEVICETYPE`, manufacturer, ...).
    pub params: HashMap<String, String>,

    /// Physical pin placement for pinout reports.
    pub layout: Option<PinLayout>,
}

impl DeviceType {
    /// Whether the trace engine may cross instances of this type.
    pub fn passes_signals(&self) -> bool {
        !self.straight_through.is_empty()
    }

    pub fn table(&self, which: DeviceTable) -> &HashMap<String, String> {
        match which {
            DeviceTable::StraightThrough => &self.straight_through,
            DeviceTable::PullLinks => &self.pull_links,
        }
    }
}

/// Physical pin placement from `DEVICEPIN` directives.
#[derive(Debug, Clone, Default)]
pub struct PinLayout {
    pub rows: u32,
    pub cols: u32,

    /// (row, col) -> pin number.
    pub map: HashMap<(u32, u32), String>,

    /// Named pin groups in declaration order.
    pub categories: Vec<(String, Vec<String>)>,
}

impl PinLayout {
    /// Fill a rectangular `rows x cols` grid. `dir` is three letters: pin 1
    /// corner (`T`/`B` then `L`/`R`) and direction of increase (`H` or `V`),
    /// e.g. `TLH` numbers left-to-right along the top row first.
    pub fn fill_grid(&mut self, rows: u32, cols: u32, dir: &str) {
        let d: Vec<char> = dir.chars().collect();
        if d.len() < 3 {
            tracing::warn!("Pin layout direction {:?} too short, expected e.g. TLH", dir);
            return;
        }
        self.rows = rows;
        self.cols = cols;

        let (rows, cols) = (rows as i64, cols as i64);
        let mut row: i64 = if d[0] == 'T' { 1 } else { rows };
        let mut col: i64 = if d[1] == 'L' { 1 } else { cols };

        for pin in 1..=rows * cols {
            self.map
                .insert((row as u32, col as u32), pin.to_string());
            if d[2] == 'H' {
                col += if d[1] == 'L' { 1 } else { -1 };
                if col < 1 || col > cols {
                    row += if d[0] == 'T' { 1 } else { -1 };
                    if col < 1 {
                        col += cols;
                    } else {
                        col -= cols;
                    }
                }
            } else {
                row += if d[0] == 'T' { 1 } else { -1 };
                if row < 1 || row > rows {
                    col += if d[1] == 'L' { 1 } else { -1 };
                    if row < 1 {
                        row += rows;
                    } else {
                        row -= rows;
                    }
                }
            }
        }
    }

    /// Place a single pin at an arbitrary position, growing the grid bounds.
    pub fn place(&mut self, row: u32, col: u32, pin: &str) {
        self.rows = self.rows.max(row);
        self.cols = self.cols.max(col);
        self.map.insert((row, col), pin.to_string());
    }

    /// Define (or redefine) a named pin category.
    pub fn set_category(&mut self, name: &str, pins: Vec<String>) {
        if let Some(entry) = self.categories.iter_mut().find(|(n, _)| n == name) {
            entry.1 = pins;
        } else {
            self.categories.push((name.to_string(), pins));
        }
    }
}
