//! Data model: per-board connectivity, device type registry, and the
//! system-level store the engines traverse.

pub mod board;
pub mod device;
pub mod system;

pub use board::{Board, BoardStats};
pub use device::{DeviceTable, DeviceType, PinLayout};
pub use system::{
    Endpoint, IgnoreSet, MapEntry, NetRef, Queued, SignalRelation, System, TraceRequest,
    VoltRequest,
};
