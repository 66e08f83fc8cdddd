use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::memory::Bus;

/// Number of defined opcodes; anything at or above is undefined.
pub const OPCODE_COUNT: u8 = 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Width {
    W1 = 1,
    W2 = 2,
}

impl Width {
    /// Opcodes below 7 carry an operand word. Undefined opcodes are one word.
    pub fn of_opcode(opcode: u8) -> Width {
        if opcode < 7 {
            Width::W2
        } else {
            Width::W1
        }
    }

    pub fn words(self) -> u16 {
        self as u16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    Jmp,
    Jeq,
    Jlt,
    Jge,
    Load,
    LoadImm,
    Store,
    StoreReg,
    Tran,
    Add,
    Sub,
    Mult,
    Div,
    Inc,
    Dec,
    And,
    Or,
    Xor,
    Not,
    Rol,
    Ror,
    Cmp,
    Clc,
    Stc,
    Nop,
    LoadReg,
    /// Opcode 26..=255; decoded as a one-word no-op.
    Invalid,
}

/// How an instruction's operand word is used by the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum XrefKind {
    Jump,
    Read,
    Write,
}

/// Nonzero bits in fields the instruction does not use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Anomaly {
    /// reg2 nibble set on a form that ignores it
    Nibble(u8),
    /// reg1:reg2 byte set on a form that ignores both
    Byte(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoded {
    pub op: Op,
    pub opcode: u8,
    pub width: Width,
    pub reg1: u8,
    pub reg2: u8,
    /// Second word of a two-word instruction.
    pub operand: Option<u16>,
    pub anomaly: Option<Anomaly>,
}

impl Decoded {
    pub fn is_valid(&self) -> bool {
        self.op != Op::Invalid
    }

    /// Cross-reference this instruction records, with its target.
    pub fn xref(&self) -> Option<(XrefKind, Address)> {
        let kind = crate::instructions::lookup(self.opcode)?.xref?;
        self.operand.map(|w| (kind, Address(w)))
    }
}

pub trait Decoder {
    /// Decode `word`. `operand` is only consulted for two-word forms.
    fn decode(&self, word: u16, operand: u16) -> Decoded;
}

pub fn opcode(word: u16) -> u8 {
    (word >> 8) as u8
}

pub fn reg1(word: u16) -> u8 {
    ((word >> 4) & 0xF) as u8
}

pub fn reg2(word: u16) -> u8 {
    (word & 0xF) as u8
}

/// Fetch and decode the instruction at `pc`, reading the following word
/// only when the opcode needs it. Past the end of memory it reads as 0.
pub fn fetch<B: Bus, D: Decoder>(bus: &B, dec: &D, pc: Address) -> Decoded {
    let word = bus.read_word(pc);
    let operand = match Width::of_opcode(opcode(word)) {
        Width::W2 => pc.offset(1).map(|a| bus.read_word(a)).unwrap_or(0),
        Width::W1 => 0,
    };
    dec.decode(word, operand)
}
