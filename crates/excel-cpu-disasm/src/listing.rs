//! Text listing of a traced program.
//!
//! Layout is tab-aligned for an 8-column tab width: instructions start one
//! tab in, trailing `; at`/`; data:` comments at column 32, cross-reference
//! and warning comments five tabs in.

use bitflags::bitflags;
use std::fmt::Write as _;

use excel_cpu_rs::decoder::{fetch, opcode, Anomaly, Decoder, XrefKind, OPCODE_COUNT};
use excel_cpu_rs::disasm::fmt_with;
use excel_cpu_rs::instructions::mnemonic;
use excel_cpu_rs::address::Styled;
use excel_cpu_rs::{Address, AddressStyle};

use crate::analyze::Program;

bitflags! {
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ListingFlags: u8 {
const INCLUDE_ADDRESS = 1 << 0; // `; at <addr>` after each instruction
const INCLUDE_DATA = 1 << 1; // `; data: <raw words>` after each instruction
const DECODE_ALL = 1 << 2; // decode data and operand words as hints
const NO_WARNINGS = 1 << 3;
}
}

impl Default for ListingFlags {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListingOptions {
    pub style: AddressStyle,
    pub flags: ListingFlags,
}

impl ListingOptions {
    fn warn(&self) -> bool {
        !self.flags.contains(ListingFlags::NO_WARNINGS)
    }
}

/// Written above the listing when it goes to a named file.
#[derive(Debug, Clone)]
pub struct Header {
    pub source: String,
    pub generated: String,
}

const XREF_INDENT: &str = "\t\t\t\t\t";
const COMMENT_COLUMN: usize = 32;
const TAB_WIDTH: usize = 8;

// Always adds at least one tab.
fn pad_to_column(line: &mut String, column: usize) {
    let mut width = line
        .chars()
        .fold(0, |w, ch| if ch == '\t' { (w / TAB_WIDTH + 1) * TAB_WIDTH } else { w + 1 });
    loop {
        line.push('\t');
        width = (width / TAB_WIDTH + 1) * TAB_WIDTH;
        if width >= column {
            break;
        }
    }
}

pub struct Emitter<'a, D: Decoder> {
    program: &'a Program,
    dec: D,
    opts: ListingOptions,
    out: String,
}

impl<'a, D: Decoder> Emitter<'a, D> {
    pub fn new(program: &'a Program, dec: D, opts: ListingOptions) -> Self {
        Self { program, dec, opts, out: String::new() }
    }

    pub fn render(mut self, header: Option<&Header>) -> String {
        if let Some(h) = header {
            self.header(h);
        }
        if self.program.entry != Address::ZERO {
            self.data_section();
            self.out.push_str("\n.CODE\n");
        }
        self.code_section();
        self.out
    }

    fn a(&self, addr: Address) -> Styled {
        addr.styled(self.opts.style)
    }

    fn list(&self, addrs: &[Address]) -> String {
        let items: Vec<String> = addrs.iter().map(|&a| self.a(a).to_string()).collect();
        format!("[{}]", items.join(", "))
    }

    fn header(&mut self, h: &Header) {
        let _ = write!(
            self.out,
            "; Disassembly generated by excel-cpu-disasm\n\
             ; Accuracy is not guaranteed; review before reassembling.\n\
             ; Best viewed with a tab width of 8.\n\
             \n\
             ; File: {}\n\
             ; Time: {}\n\n",
            h.source, h.generated
        );
    }

    fn data_section(&mut self) {
        let img = &self.program.image;
        if self.opts.warn() {
            for addr in [Address(0), Address(1)] {
                let c = img.cell(addr);
                let a = self.a(addr);
                for (kind, what) in [
                    (XrefKind::Jump, "may be a jump target of"),
                    (XrefKind::Read, "may be read by"),
                    (XrefKind::Write, "may be overwritten by"),
                ] {
                    if !c.xrefs(kind).is_empty() {
                        let l = self.list(c.xrefs(kind));
                        let _ = writeln!(self.out, "; Warning: address {a} {what} {l}");
                    }
                }
            }
        }

        self.out.push_str("\n.DATA\n");
        for i in 2..self.program.entry.0 {
            let addr = Address(i);
            let c = img.cell(addr);
            let a = self.a(addr);
            if !c.jump_from().is_empty() && self.opts.warn() {
                let l = self.list(c.jump_from());
                let _ = writeln!(self.out, "\t; Warning: the data below (@{a}) may be a jump target of {l}");
            }
            let _ = write!(self.out, "\tvar_{a} = ${:04X}", c.data());
            if self.opts.flags.contains(ListingFlags::INCLUDE_ADDRESS) {
                let _ = write!(self.out, "\t; at {a}");
            }
            if self.opts.flags.contains(ListingFlags::DECODE_ALL) && opcode(c.data()) < OPCODE_COUNT {
                let _ = write!(self.out, "\t\t; {}", mnemonic(opcode(c.data())));
            }
            self.out.push('\n');
            if !c.read_from().is_empty() {
                let l = self.list(c.read_from());
                let _ = writeln!(self.out, "{XREF_INDENT}; XREF(R): {l}");
            }
            if !c.write_from().is_empty() {
                let l = self.list(c.write_from());
                let _ = writeln!(self.out, "{XREF_INDENT}; XREF(W): {l}");
            }
        }
    }

    // `.DATA` names only cells 2..entry; the vector cells stay raw addresses.
    fn operand_text(&self, is_jump: bool, target: Address) -> String {
        let cell = self.program.image.cell(target);
        if !is_jump && (2..self.program.entry.0).contains(&target.0) {
            return format!("var_{}", self.a(target));
        }
        match cell.label() {
            Some(l) => l.to_string(),
            None => format!("@{}", target.to_hex()),
        }
    }

    fn code_section(&mut self) {
        let p = self.program;
        let img = &p.image;
        let Some(last) = p.last else { return };
        let warn = self.opts.warn();

        let mut pc = p.entry.0 as u32;
        while pc <= last.0 as u32 {
            let addr = Address(pc as u16);
            let c = img.cell(addr);
            let d = fetch(img, &self.dec, addr);
            let a = self.a(addr);

            if let Some(l) = c.label() {
                let _ = write!(self.out, "\n{l}:\n");
            }
            if warn && !c.read_from().is_empty() {
                let l = self.list(c.read_from());
                let _ = writeln!(self.out, "\t; Warning: the code below (@{a}) may be read by {l}");
            }
            if warn && !c.write_from().is_empty() {
                let l = self.list(c.write_from());
                let _ = writeln!(self.out, "\t; Warning: the code below (@{a}) may be overwritten by {l}");
            }

            let is_jump = matches!(d.xref(), Some((XrefKind::Jump, _)));
            let mut line = format!("\t{}", fmt_with(&d, |t| self.operand_text(is_jump, t)));
            let mut notes = Vec::new();
            if self.opts.flags.contains(ListingFlags::INCLUDE_ADDRESS) {
                notes.push(format!("; at {a}"));
            }
            if self.opts.flags.contains(ListingFlags::INCLUDE_DATA) {
                let mut n = format!("; data: {:04X}", c.data());
                if let Some(w) = d.operand {
                    let _ = write!(n, " {w:04X}");
                }
                notes.push(n);
            }
            if !notes.is_empty() {
                pad_to_column(&mut line, COMMENT_COLUMN);
                line.push_str(&notes.join("\t"));
            }
            let _ = writeln!(self.out, "{line}");

            if !d.is_valid() {
                let _ = write!(
                    self.out,
                    "\t; Error: unknown opcode {:04X} is listed as NOP;\n\
                     \t  plain data is not allowed in the code section;\n\
                     \t  if it is never read or executed, set cell {} to 6144 (NOP).\n\n",
                    c.data(),
                    addr.to_spreadsheet()
                );
            }

            if let (Some(second), true) = (addr.offset(1), d.operand.is_some()) {
                let sc = img.cell(second);
                if warn && !sc.jump_from().is_empty() {
                    let l = self.list(sc.jump_from());
                    let _ = writeln!(
                        self.out,
                        "{XREF_INDENT}; Warning: the operand of {} (@{}) may be a jump target of {l}",
                        mnemonic(d.opcode),
                        self.a(second)
                    );
                }
            }

            if warn {
                match d.anomaly {
                    Some(Anomaly::Nibble(n)) => {
                        let _ = writeln!(self.out, "{XREF_INDENT}; Warning: instruction above has unused bits ({n:01X})");
                    }
                    Some(Anomaly::Byte(b)) => {
                        let _ = writeln!(self.out, "{XREF_INDENT}; Warning: instruction above has unused bits ({b:02X})");
                    }
                    None => {}
                }
            }

            if !c.jump_from().is_empty() {
                let l = self.list(c.jump_from());
                let _ = writeln!(self.out, "{XREF_INDENT}; XREF(X): {l}");
            } else if c.exec_from_prev().is_none() && warn {
                let _ = writeln!(self.out, "{XREF_INDENT}; Warning: the code above (@{a}) may not be executed");
            }

            if self.opts.flags.contains(ListingFlags::DECODE_ALL) {
                // Opcode 0 is skipped: every small literal would read as JMP.
                if let Some(w) = d.operand.filter(|&w| (1..OPCODE_COUNT).contains(&opcode(w))) {
                    let _ = writeln!(
                        self.out,
                        "{XREF_INDENT}; -A: operand can be decoded as {}",
                        mnemonic(opcode(w))
                    );
                }
            }

            pc += d.width.words() as u32;
        }
    }
}

pub fn render_listing<D: Decoder>(
    program: &Program,
    dec: D,
    opts: ListingOptions,
    header: Option<&Header>,
) -> String {
    Emitter::new(program, dec, opts).render(header)
}
