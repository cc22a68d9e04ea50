//! Static tables that translate the small indices stored in a preamble into
//! engineering values.

use crate::error::{Error, Result};

/// Horizontal divisions across the screen
pub const HORIZONTAL_DIVISIONS: f64 = 10.0;

/// Seconds per division, indexed by the preamble's time base field
pub const TIME_BASE: [f64; 39] = [
    2e-10, 5e-10, //
    1e-9, 2e-9, 5e-9, //
    1e-8, 2e-8, 5e-8, //
    1e-7, 2e-7, 5e-7, //
    1e-6, 2e-6, 5e-6, //
    1e-5, 2e-5, 5e-5, //
    1e-4, 2e-4, 5e-4, //
    1e-3, 2e-3, 5e-3, //
    1e-2, 2e-2, 5e-2, //
    1e-1, 2e-1, 5e-1, //
    1e+0, 2e+0, 5e+0, //
    1e+1, 2e+1, 5e+1, //
    1e+2, 2e+2, 5e+2, //
    1e+3,
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProbeAttenuation {
    Factor(f64),
    /// User defined probe slot (A through D)
    Custom(char),
}

pub const PROBE_ATTENUATION: [ProbeAttenuation; 20] = [
    ProbeAttenuation::Factor(1e-1),
    ProbeAttenuation::Factor(2e-1),
    ProbeAttenuation::Factor(5e-1),
    ProbeAttenuation::Factor(1e+0),
    ProbeAttenuation::Factor(2e+0),
    ProbeAttenuation::Factor(5e+0),
    ProbeAttenuation::Factor(1e+1),
    ProbeAttenuation::Factor(2e+1),
    ProbeAttenuation::Factor(5e+1),
    ProbeAttenuation::Factor(1e+2),
    ProbeAttenuation::Factor(2e+2),
    ProbeAttenuation::Factor(5e+2),
    ProbeAttenuation::Factor(1e+3),
    ProbeAttenuation::Factor(2e+3),
    ProbeAttenuation::Factor(5e+3),
    ProbeAttenuation::Factor(1e+4),
    ProbeAttenuation::Custom('A'),
    ProbeAttenuation::Custom('B'),
    ProbeAttenuation::Custom('C'),
    ProbeAttenuation::Custom('D'),
];

impl ProbeAttenuation {
    /// Position of a standard attenuation factor in [PROBE_ATTENUATION]
    pub fn index_of(factor: f64) -> Option<usize> {
        PROBE_ATTENUATION.iter().position(|p| match p {
            ProbeAttenuation::Factor(f) => (f - factor).abs() <= f * 1e-6,
            ProbeAttenuation::Custom(_) => false,
        })
    }
}

pub const WAVE_SOURCE: [&str; 4] = ["C1", "C2", "C3", "C4"];
pub const BANDWIDTH_LIMIT: [&str; 3] = ["OFF", "20M", "200M"];
pub const VERTICAL_COUPLING: [&str; 3] = ["DC", "AC", "GND"];

/// Width of one transferred sample
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommType {
    Byte,
    Word,
}

impl CommType {
    pub fn bytes(self) -> usize {
        match self {
            CommType::Byte => 1,
            CommType::Word => 2,
        }
    }

    pub fn bits(self) -> u32 {
        8 * self.bytes() as u32
    }
}

pub const COMM_TYPE: [CommType; 2] = [CommType::Byte, CommType::Word];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    Lsb,
    Msb,
}

pub const COMM_ORDER: [ByteOrder; 2] = [ByteOrder::Lsb, ByteOrder::Msb];

/// Bounds-checked table lookup. `table` names the table in the error.
pub fn lookup<T: Copy>(table: &'static str, entries: &[T], index: usize) -> Result<T> {
    entries.get(index).copied().ok_or(Error::TableIndex {
        table,
        index,
        len: entries.len(),
    })
}

pub fn time_base(index: u16) -> Result<f64> {
    lookup("time base", &TIME_BASE, index.into())
}

pub fn wave_source(index: u16) -> Result<&'static str> {
    lookup("wave source", &WAVE_SOURCE, index.into())
}

pub fn bandwidth_limit(index: u16) -> Result<&'static str> {
    lookup("bandwidth limit", &BANDWIDTH_LIMIT, index.into())
}

pub fn vertical_coupling(index: u16) -> Result<&'static str> {
    lookup("vertical coupling", &VERTICAL_COUPLING, index.into())
}

pub fn comm_type(index: u16) -> Result<CommType> {
    lookup("comm type", &COMM_TYPE, index.into())
}

pub fn comm_order(index: u16) -> Result<ByteOrder> {
    lookup("comm order", &COMM_ORDER, index.into())
}
