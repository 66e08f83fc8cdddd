pub mod address;
pub mod decoder;
pub mod disasm;
pub mod instructions;
pub mod memory;

pub mod isa {
    pub mod ecpu16; // the 26-opcode Excel CPU
}

pub use address::{Address, AddressStyle, AddrError};
pub use memory::{Bus, Cell, MemoryImage};
