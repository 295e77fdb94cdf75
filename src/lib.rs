//! An 8-bit virtual processor: 256 bytes of memory, a 256-byte stack,
//! four general registers, a packed status register and a single-byte
//! instruction set interpreted by a fetch-decode-execute loop.

pub mod memory;
pub mod processor;
