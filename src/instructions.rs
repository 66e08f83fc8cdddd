use crate::decoder::{Op, XrefKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    /// absolute jump target in the operand word
    Target,
    /// register + memory address in the operand word
    RegAddr,
    /// register + 16-bit literal in the operand word
    RegImm,
    RegReg,
    /// reg1 only, reg2 must be zero
    Reg,
    /// reg1 + 4-bit shift count in the reg2 field
    RegShift,
    None,
}

#[derive(Debug, Clone, Copy)]
pub struct InstrDesc {
    pub op: Op,
    pub mnemonic: &'static str,
    pub form: Form,
    pub xref: Option<XrefKind>,
}

const fn d(op: Op, mnemonic: &'static str, form: Form, xref: Option<XrefKind>) -> InstrDesc {
    InstrDesc { op, mnemonic, form, xref }
}

/// Indexed by opcode.
pub const TABLE: &[InstrDesc] = &[
    d(Op::Jmp, "JMP", Form::Target, Some(XrefKind::Jump)),
    d(Op::Jeq, "JEQ", Form::Target, Some(XrefKind::Jump)),
    d(Op::Jlt, "JLT", Form::Target, Some(XrefKind::Jump)),
    d(Op::Jge, "JGE", Form::Target, Some(XrefKind::Jump)),
    d(Op::Load, "LOAD", Form::RegAddr, Some(XrefKind::Read)),
    d(Op::LoadImm, "LOAD", Form::RegImm, None),
    d(Op::Store, "STORE", Form::RegAddr, Some(XrefKind::Write)),
    d(Op::StoreReg, "STORE", Form::RegReg, None),
    d(Op::Tran, "TRAN", Form::RegReg, None),
    d(Op::Add, "ADD", Form::RegReg, None),
    d(Op::Sub, "SUB", Form::RegReg, None),
    d(Op::Mult, "MULT", Form::RegReg, None),
    d(Op::Div, "DIV", Form::RegReg, None),
    d(Op::Inc, "INC", Form::Reg, None),
    d(Op::Dec, "DEC", Form::Reg, None),
    d(Op::And, "AND", Form::RegReg, None),
    d(Op::Or, "OR", Form::RegReg, None),
    d(Op::Xor, "XOR", Form::RegReg, None),
    d(Op::Not, "NOT", Form::Reg, None),
    d(Op::Rol, "ROL", Form::RegShift, None),
    d(Op::Ror, "ROR", Form::RegShift, None),
    d(Op::Cmp, "CMP", Form::RegReg, None),
    d(Op::Clc, "CLC", Form::None, None),
    d(Op::Stc, "STC", Form::None, None),
    d(Op::Nop, "NOP", Form::None, None),
    d(Op::LoadReg, "LOAD", Form::RegReg, None),
];

pub fn lookup(opcode: u8) -> Option<&'static InstrDesc> {
    TABLE.get(opcode as usize)
}

/// Mnemonic for an opcode; undefined opcodes read as `NOP`.
pub fn mnemonic(opcode: u8) -> &'static str {
    lookup(opcode).map_or("NOP", |d| d.mnemonic)
}
