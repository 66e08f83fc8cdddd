use crate::decoder::{opcode, reg1, reg2, Anomaly, Decoded, Decoder, Op, Width};
use crate::instructions::{lookup, Form};

/// Decoder for the 16-bit Excel CPU.
///
/// Word layout: `opcode:15..8 reg1:7..4 reg2:3..0`. Opcodes 0..=6 take the
/// following word as operand (jump target, memory address or literal).
#[derive(Debug, Default, Clone, Copy)]
pub struct Ecpu16Decoder;

impl Ecpu16Decoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for Ecpu16Decoder {
    fn decode(&self, word: u16, operand: u16) -> Decoded {
        let opc = opcode(word);
        let (r1, r2) = (reg1(word), reg2(word));
        let width = Width::of_opcode(opc);

        let Some(desc) = lookup(opc) else {
            return Decoded {
                op: Op::Invalid,
                opcode: opc,
                width,
                reg1: r1,
                reg2: r2,
                operand: None,
                anomaly: None,
            };
        };

        let low = (word & 0xFF) as u8;
        let anomaly = match desc.form {
            Form::Target | Form::None if low != 0 => Some(Anomaly::Byte(low)),
            Form::RegAddr | Form::RegImm | Form::Reg if r2 != 0 => Some(Anomaly::Nibble(r2)),
            _ => None,
        };

        Decoded {
            op: desc.op,
            opcode: opc,
            width,
            reg1: r1,
            reg2: r2,
            operand: (width == Width::W2).then_some(operand),
            anomaly,
        }
    }
}
