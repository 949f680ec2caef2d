//! Raw input-event record (`struct input_event` on 64-bit Linux)
//!
//! 24 bytes, little-endian:
//!
//! | offset | size | field |
//! |---|---|---|
//! | 0 | 8 | seconds |
//! | 8 | 8 | microseconds |
//! | 16 | 2 | type |
//! | 18 | 2 | code |
//! | 20 | 4 | value (signed) |

use zerocopy::byteorder::little_endian::{I32, U16, U64};
use zerocopy::{FromBytes, Immutable, KnownLayout, Unaligned};

/// Size of one record on the wire
pub const RECORD_SIZE: usize = 24;

#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct InputEventRecord {
    sec: U64,
    usec: U64,
    kind: U16,
    code: U16,
    value: I32,
}

const _: () = assert!(std::mem::size_of::<InputEventRecord>() == RECORD_SIZE);

impl InputEventRecord {
    /// Decode one record. Anything that is not exactly [`RECORD_SIZE`] bytes
    /// is malformed.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        Self::read_from_bytes(bytes).ok()
    }

    pub fn sec(&self) -> u64 {
        self.sec.get()
    }

    pub fn usec(&self) -> u64 {
        self.usec.get()
    }

    pub fn kind(&self) -> u16 {
        self.kind.get()
    }

    pub fn code(&self) -> u16 {
        self.code.get()
    }

    pub fn value(&self) -> i32 {
        self.value.get()
    }
}

#[cfg(test)]
pub(crate) fn encode(sec: u64, usec: u64, kind: u16, code: u16, value: i32) -> [u8; RECORD_SIZE] {
    let mut buf = [0u8; RECORD_SIZE];
    buf[0..8].copy_from_slice(&sec.to_le_bytes());
    buf[8..16].copy_from_slice(&usec.to_le_bytes());
    buf[16..18].copy_from_slice(&kind.to_le_bytes());
    buf[18..20].copy_from_slice(&code.to_le_bytes());
    buf[20..24].copy_from_slice(&value.to_le_bytes());
    buf
}
