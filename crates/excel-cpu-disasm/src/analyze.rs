use serde::Serialize;

use excel_cpu_rs::decoder::{fetch, Decoder, XrefKind};
use excel_cpu_rs::disasm::fmt_decoded;
use excel_cpu_rs::{Address, AddressStyle, Bus, MemoryImage};

/// A traced image: every cell's metadata is final once this exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub image: MemoryImage,
    pub entry: Address,
    /// Highest nonzero word; `None` for an all-zero image.
    pub last: Option<Address>,
}

impl Program {
    /// Addresses `entry..=last`, the code region.
    pub fn code_range(&self) -> impl Iterator<Item = Address> {
        let end = self.last.map_or(0, |l| l.0 as u32 + 1);
        (self.entry.0 as u32..end).map(|a| Address(a as u16))
    }
}

/// Walks a loaded image and fills in its cross-reference metadata.
pub struct Tracer<D: Decoder> {
    image: MemoryImage,
    dec: D,
    style: AddressStyle,
}

impl<D: Decoder> Tracer<D> {
    /// `style` only decides how generated label names spell addresses.
    pub fn new(image: MemoryImage, dec: D, style: AddressStyle) -> Self {
        Self { image, dec, style }
    }

    pub fn run(mut self) -> Program {
        let entry = self.resolve_entry();
        let last = self.image.last_nonzero();
        tracing::debug!(entry = %entry.to_hex(), last = ?last.map(|l| l.to_hex()), "trace start");

        let mut steps = 0usize;
        if let Some(last) = last {
            let mut pc = entry.0 as u32;
            while pc <= last.0 as u32 {
                pc = self.step(Address(pc as u16));
                steps += 1;
            }
        }

        // Words below the entry stay data unless something already reaches them.
        let mut recovered = 0usize;
        let mut x = 0u32;
        while x < entry.0 as u32 {
            let cell = self.image.cell(Address(x as u16));
            if cell.jump_from().is_empty() && cell.exec_from_prev().is_none() {
                x += 1;
                continue;
            }
            tracing::trace!(addr = %Address(x as u16).to_hex(), "reachable before entry");
            x = self.step(Address(x as u16));
            recovered += 1;
        }
        tracing::debug!(steps, recovered, "sweeps done");

        if let Some(last) = last {
            self.assign_labels(entry, last);
        }
        Program { image: self.image, entry, last }
    }

    fn resolve_entry(&mut self) -> Address {
        if self.image.read_word(Address::ZERO) != 0 {
            return Address::ZERO;
        }
        let entry = Address(self.image.read_word(Address(1)));
        let name = format!("Entrypoint_{}", entry.render(self.style));
        let cell = self.image.cell_mut(entry);
        cell.assign_label(name);
        cell.add_xref(XrefKind::Jump, Address::ZERO);
        entry
    }

    /// Record one instruction's effects; returns the next address (may be 0x10000).
    fn step(&mut self, pc: Address) -> u32 {
        let d = fetch(&self.image, &self.dec, pc);
        tracing::trace!(at = %pc.to_hex(), insn = %fmt_decoded(&d), "step");
        if let Some((kind, target)) = d.xref() {
            self.image.cell_mut(target).add_xref(kind, pc);
        }
        if let Some(second) = pc.offset(1).filter(|_| d.operand.is_some()) {
            self.image.cell_mut(second).mark_second_word();
        }
        let next = pc.0 as u32 + d.width.words() as u32;
        // A zero word (`JMP 0`-style) ends the fallthrough chain.
        if self.image.read_word(pc) != 0 {
            if let Ok(n) = u16::try_from(next) {
                self.image.cell_mut(Address(n)).set_exec_from_prev(pc);
            }
        }
        next
    }

    fn assign_labels(&mut self, entry: Address, last: Address) {
        let mut labeled = 0usize;
        for a in entry.0..=last.0 {
            let addr = Address(a);
            let name = format!("loc_{}", addr.render(self.style));
            let cell = self.image.cell_mut(addr);
            if !cell.is_second_word() && !cell.jump_from().is_empty() && cell.assign_label(name) {
                labeled += 1;
            }
        }
        tracing::debug!(labeled, "labels assigned");
    }
}

/// Trace `image` with `dec`.
pub fn trace<D: Decoder>(image: MemoryImage, dec: D, style: AddressStyle) -> Program {
    Tracer::new(image, dec, style).run()
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelOut {
    pub addr: Address,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CellOut {
    pub addr: Address,
    pub data: u16,
    pub second_word: bool,
    pub exec_from_prev: Option<Address>,
    pub jump_from: Vec<Address>,
    pub read_from: Vec<Address>,
    pub write_from: Vec<Address>,
}

/// Machine-readable view of a traced program.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub entry: Address,
    pub last: Option<Address>,
    pub labels: Vec<LabelOut>,
    pub cells: Vec<CellOut>,
}

impl Report {
    pub fn from_program(p: &Program) -> Self {
        let mut labels = Vec::new();
        let mut cells = Vec::new();
        for (addr, c) in p.image.cells().filter(|(_, c)| c.has_trace()) {
            if let Some(name) = c.label() {
                labels.push(LabelOut { addr, name: name.to_string() });
            }
            cells.push(CellOut {
                addr,
                data: c.data(),
                second_word: c.is_second_word(),
                exec_from_prev: c.exec_from_prev(),
                jump_from: c.jump_from().to_vec(),
                read_from: c.read_from().to_vec(),
                write_from: c.write_from().to_vec(),
            });
        }
        Report { entry: p.entry, last: p.last, labels, cells }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use excel_cpu_rs::isa::ecpu16::Ecpu16Decoder;
    use pretty_assertions::assert_eq;

    fn image(words: &[(u16, u16)]) -> MemoryImage {
        MemoryImage::from_words(words.iter().map(|&(a, w)| (Address(a), w)))
    }

    fn run(words: &[(u16, u16)]) -> Program {
        trace(image(words), Ecpu16Decoder::new(), AddressStyle::Hex)
    }

    #[test]
    fn entry_vector_is_followed() {
        let p = run(&[(0, 0), (1, 2), (2, 0x0904), (3, 0x1600)]);
        assert_eq!(p.entry, Address(2));
        assert_eq!(p.last, Some(Address(3)));
        let c = p.image.cell(Address(2));
        assert_eq!(c.jump_from(), &[Address(0)]);
        assert_eq!(c.label(), Some("Entrypoint_0002"));
        assert_eq!(p.image.cell(Address(3)).exec_from_prev(), Some(Address(2)));
    }

    #[test]
    fn nonzero_first_word_means_entry_zero() {
        let p = run(&[(0, 0x1800), (1, 0x0901)]);
        assert_eq!(p.entry, Address(0));
        assert!(p.image.cell(Address(0)).label().is_none());
        assert_eq!(p.image.cell(Address(1)).exec_from_prev(), Some(Address(0)));
    }

    #[test]
    fn self_loop_marks_operand_and_labels_target() {
        // 2: JMP 2 (operand word at 3)
        let p = run(&[(0, 0), (1, 2), (2, 0x0000), (3, 2)]);
        assert!(p.image.cell(Address(3)).is_second_word());
        assert_eq!(p.image.cell(Address(2)).jump_from(), &[Address(0), Address(2)]);
        // Entrypoint label wins; loc_ is never written over it
        assert_eq!(p.image.cell(Address(2)).label(), Some("Entrypoint_0002"));
        // zero opcode word breaks fallthrough
        assert_eq!(p.image.cell(Address(4)).exec_from_prev(), None);
    }

    #[test]
    fn load_and_store_record_data_xrefs() {
        // entry 10; 10: LOAD R1,[6]; 12: STORE R1,[6]; 14: LOAD R2,[5] imm
        let p = run(&[(0, 0), (1, 10), (6, 7), (10, 0x0410), (11, 6), (12, 0x0610), (13, 6), (14, 0x0520), (15, 5)]);
        let c = p.image.cell(Address(6));
        assert_eq!(c.read_from(), &[Address(10)]);
        assert_eq!(c.write_from(), &[Address(12)]);
        assert!(p.image.cell(Address(5)).read_from().is_empty());
        assert!(p.image.cell(Address(15)).is_second_word());
    }

    #[test]
    fn every_jump_target_in_code_gets_one_label() {
        // 2: JEQ 7 ; 4: JMP 6 ; 6: NOP ; 7: NOP
        let p = run(&[(0, 0), (1, 2), (2, 0x0100), (3, 7), (4, 0x0000), (5, 6), (6, 0x1800), (7, 0x1800)]);
        for a in p.code_range() {
            let c = p.image.cell(a);
            if !c.jump_from().is_empty() && !c.is_second_word() {
                assert!(c.label().is_some(), "no label at {a:?}");
            }
        }
        assert_eq!(p.image.cell(Address(6)).label(), Some("loc_0006"));
        assert_eq!(p.image.cell(Address(7)).label(), Some("loc_0007"));
        // 6 is reached only through the jump: JMP is the zero word 0x0000
        assert_eq!(p.image.cell(Address(6)).exec_from_prev(), None);
        assert_eq!(p.image.cell(Address(4)).exec_from_prev(), Some(Address(2)));
    }

    #[test]
    fn jump_into_operand_word_gets_no_label() {
        // 2: JMP 5 ; 4: LOAD R0,$1800 (operand at 5)
        let p = run(&[(0, 0), (1, 2), (2, 0x0000), (3, 5), (4, 0x0500), (5, 0x1800)]);
        let c = p.image.cell(Address(5));
        assert!(c.is_second_word());
        assert_eq!(c.jump_from(), &[Address(2)]);
        assert!(c.label().is_none());
    }

    #[test]
    fn pre_entry_fragment_reached_by_jump_is_traced() {
        // data at 2..5; 3: INC R1 / 4: JMP 20 reached from 20: JMP 3
        let p = run(&[
            (0, 0), (1, 20),
            (2, 0x1234),
            (3, 0x0D10),
            (4, 0x0000), (5, 20),
            (20, 0x0000), (21, 3),
        ]);
        assert_eq!(p.image.cell(Address(3)).jump_from(), &[Address(20)]);
        assert_eq!(p.image.cell(Address(4)).exec_from_prev(), Some(Address(3)));
        assert!(p.image.cell(Address(5)).is_second_word());
        assert_eq!(p.image.cell(Address(20)).jump_from(), &[Address(0), Address(4)]);
        // untouched data stays clean
        assert!(!p.image.cell(Address(2)).has_trace());
        // labels are only generated for the code region
        assert!(p.image.cell(Address(3)).label().is_none());
    }

    #[test]
    fn tracing_a_fresh_copy_is_deterministic() {
        let words = [(0, 0), (1, 4), (2, 9), (4, 0x0400), (5, 2), (6, 0x0200), (7, 4), (8, 0x1800)];
        let img = image(&words);
        let a = trace(img.clone(), Ecpu16Decoder::new(), AddressStyle::Hex);
        let b = trace(img, Ecpu16Decoder::new(), AddressStyle::Hex);
        assert_eq!(a, b);
    }

    #[test]
    fn all_zero_image_has_no_code() {
        let p = run(&[]);
        assert_eq!(p.entry, Address(0));
        assert_eq!(p.last, None);
        assert_eq!(p.code_range().count(), 0);
    }

    #[test]
    fn two_word_instruction_at_top_of_memory() {
        let p = run(&[(0, 0x1800), (0xFFFF, 0x0410)]);
        // operand reads as 0 -> LOAD from address 0
        assert_eq!(p.image.cell(Address(0)).read_from(), &[Address(0xFFFF)]);
    }

    #[test]
    fn labels_follow_display_style() {
        let img = image(&[(0, 0), (1, 0x0101), (0x0101, 0x0000), (0x0102, 0x0101)]);
        let p = trace(img, Ecpu16Decoder::new(), AddressStyle::Spreadsheet);
        assert_eq!(p.image.cell(Address(0x0101)).label(), Some("Entrypoint_B2"));
    }

    #[test]
    fn report_lists_traced_cells() {
        let p = run(&[(0, 0), (1, 2), (2, 0x0904), (3, 0x1600)]);
        let r = Report::from_program(&p);
        assert_eq!(r.entry, Address(2));
        assert_eq!(r.labels.len(), 1);
        assert_eq!(r.labels[0].name, "Entrypoint_0002");
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"entry\":2"), "{json}");
    }
}
