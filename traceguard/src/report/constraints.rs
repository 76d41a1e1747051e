//! Vendor pin-constraint file writers.
//!
//! Devices with signal relations (`REFSIG`) whose part type carries a
//! `DEVICETYPE` parameter get one constraint file per refdes, in the
//! vendor's native syntax: Xilinx UCF, Altera Tcl assignments, or Lattice
//! LPF. Unrecognized device types fall back to a generic listing.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::model::system::{SignalRelation, System};

pub struct ConstraintWriter;

impl ConstraintWriter {
    /// Write constraint files for every eligible refdes into `out_dir`.
    /// Returns the paths written; a refdes whose file cannot be created is
    /// logged and skipped.
    pub fn write_all(system: &System, out_dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for id_ref in &system.ref_sig_order {
            let Some(relations) = system.ref_sigs.get(id_ref) else {
                continue;
            };
            let Some((id, refdes)) = id_ref.split_once('.') else {
                continue;
            };
            let Some(board) = system.boards.get(id) else {
                warn!("REFSIG {} names unknown board {}", id_ref, id);
                continue;
            };
            let Some(part_type) = board.part_type(refdes) else {
                warn!("REFSIG {} names unknown refdes {}", id_ref, refdes);
                continue;
            };
            let Some(device_type) = system
                .device(part_type)
                .and_then(|d| d.params.get("DEVICETYPE"))
            else {
                continue;
            };

            let path = out_dir.join(format!("{}_{}_{}.txt", id, refdes, device_type));
            match File::create(&path) {
                Ok(file) => {
                    info!("Writing signal relations to {}", path.display());
                    let mut out = BufWriter::new(file);
                    for relation in relations {
                        write!(out, "{}\n\n", Self::render(relation, device_type))?;
                    }
                    written.push(path);
                }
                Err(e) => warn!("Cannot create {}: {}", path.display(), e),
            }
        }
        Ok(written)
    }

    /// Render one signal relation in the device type's constraint syntax.
    pub fn render(relation: &SignalRelation, device_type: &str) -> String {
        match device_type {
            "XILINX_FPGA" => format!(
                "NET \"{}\" IOSTANDARD = {};\nNET \"{}\" LOC = {};",
                relation.external, relation.io_standard, relation.external, relation.pin
            ),
            "ALTERA_FPGA" => format!(
                "set_location_assignment PIN_{} -to {}\n\
                 set_instance_assignment -name IO_STANDARD \"{}\" -to {}",
                relation.pin, relation.external, relation.io_standard, relation.external
            ),
            "LATTICE_CPLD" => format!(
                "LOCATE COMP \"{}\" SITE \"{}\" ;\nIOBUF PORT \"{}\" IO_TYPE={} ;",
                relation.external, relation.pin, relation.external, relation.io_standard
            ),
            _ => format!(
                "Location: {}, Signal: {}, IO_Standard: {}",
                relation.pin, relation.external, relation.io_standard
            ),
        }
    }
}
