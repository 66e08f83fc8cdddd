use std::fmt;

use crate::address::Address;
use crate::decoder::Decoded;
use crate::instructions::{lookup, mnemonic, Form};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Reg(u8),
    Shift(u8),
    Imm(u16),
    /// Memory address: jump target or load/store location
    Addr(Address),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(r) => write!(f, "R{r}"),
            Operand::Shift(n) => write!(f, "#{n}"),
            Operand::Imm(v) => write!(f, "${v:04X}"),
            Operand::Addr(a) => write!(f, "@{}", a.to_hex()),
        }
    }
}

pub fn operands(d: &Decoded) -> Vec<Operand> {
    let Some(desc) = lookup(d.opcode) else { return Vec::new() };
    let word = d.operand.unwrap_or(0);
    match desc.form {
        Form::Target => vec![Operand::Addr(Address(word))],
        Form::RegAddr => vec![Operand::Reg(d.reg1), Operand::Addr(Address(word))],
        Form::RegImm => vec![Operand::Reg(d.reg1), Operand::Imm(word)],
        Form::RegReg => vec![Operand::Reg(d.reg1), Operand::Reg(d.reg2)],
        Form::Reg => vec![Operand::Reg(d.reg1)],
        Form::RegShift => vec![Operand::Reg(d.reg1), Operand::Shift(d.reg2)],
        Form::None => Vec::new(),
    }
}

/// Tab-separated `MNEMONIC op1 op2`, with address operands rendered by `addr`.
pub fn fmt_with<F>(d: &Decoded, mut addr: F) -> String
where
    F: FnMut(Address) -> String,
{
    let mut s = mnemonic(d.opcode).to_string();
    for op in operands(d) {
        s.push('\t');
        match op {
            Operand::Addr(a) => s.push_str(&addr(a)),
            other => s.push_str(&other.to_string()),
        }
    }
    s
}

pub fn fmt_decoded(d: &Decoded) -> String {
    fmt_with(d, |a| Operand::Addr(a).to_string())
}
