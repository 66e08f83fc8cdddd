use serde::{Deserialize, Serialize};

use crate::address::{Address, MEM_WORDS};
use crate::decoder::XrefKind;

pub trait Bus {
    fn read_word(&self, addr: Address) -> u16;
}

/// One memory word plus the metadata the trace attaches to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    data: u16,
    label: Option<String>,
    exec_from_prev: Option<Address>,
    is_second_word: bool,
    jump_from: Vec<Address>,
    read_from: Vec<Address>,
    write_from: Vec<Address>,
}

impl Cell {
    pub fn new(data: u16) -> Self {
        Self { data, ..Self::default() }
    }

    pub fn data(&self) -> u16 {
        self.data
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Sets the label unless one is already present. Returns whether it took.
    pub fn assign_label(&mut self, name: impl Into<String>) -> bool {
        if self.label.is_some() {
            return false;
        }
        self.label = Some(name.into());
        true
    }

    pub fn exec_from_prev(&self) -> Option<Address> {
        self.exec_from_prev
    }

    pub fn set_exec_from_prev(&mut self, pc: Address) {
        self.exec_from_prev = Some(pc);
    }

    pub fn is_second_word(&self) -> bool {
        self.is_second_word
    }

    /// One-way: there is no way to clear the flag.
    pub fn mark_second_word(&mut self) {
        self.is_second_word = true;
    }

    pub fn jump_from(&self) -> &[Address] {
        &self.jump_from
    }

    pub fn read_from(&self) -> &[Address] {
        &self.read_from
    }

    pub fn write_from(&self) -> &[Address] {
        &self.write_from
    }

    pub fn xrefs(&self, kind: XrefKind) -> &[Address] {
        match kind {
            XrefKind::Jump => &self.jump_from,
            XrefKind::Read => &self.read_from,
            XrefKind::Write => &self.write_from,
        }
    }

    pub fn add_xref(&mut self, kind: XrefKind, from: Address) {
        match kind {
            XrefKind::Jump => self.jump_from.push(from),
            XrefKind::Read => self.read_from.push(from),
            XrefKind::Write => self.write_from.push(from),
        }
    }

    /// Anything beyond the raw word.
    pub fn has_trace(&self) -> bool {
        self.label.is_some()
            || self.exec_from_prev.is_some()
            || self.is_second_word
            || !self.jump_from.is_empty()
            || !self.read_from.is_empty()
            || !self.write_from.is_empty()
    }
}

/// The full 65536-word address space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryImage {
    cells: Vec<Cell>,
}

impl Default for MemoryImage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryImage {
    pub fn new() -> Self {
        Self { cells: vec![Cell::default(); MEM_WORDS] }
    }

    /// Build an image from `(address, word)` pairs; unlisted words are 0.
    /// A repeated address keeps the last word.
    pub fn from_words<I>(words: I) -> Self
    where
        I: IntoIterator<Item = (Address, u16)>,
    {
        let mut img = Self::new();
        for (addr, w) in words {
            img.cells[addr.index()] = Cell::new(w);
        }
        img
    }

    pub fn cell(&self, addr: Address) -> &Cell {
        &self.cells[addr.index()]
    }

    pub fn cell_mut(&mut self, addr: Address) -> &mut Cell {
        &mut self.cells[addr.index()]
    }

    pub fn cells(&self) -> impl Iterator<Item = (Address, &Cell)> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, c)| (Address(i as u16), c))
    }

    /// Highest address holding a nonzero word.
    pub fn last_nonzero(&self) -> Option<Address> {
        self.cells
            .iter()
            .rposition(|c| c.data != 0)
            .map(|i| Address(i as u16))
    }
}

impl Bus for MemoryImage {
    fn read_word(&self, addr: Address) -> u16 {
        self.cells[addr.index()].data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_is_write_once() {
        let mut c = Cell::new(0x1800);
        assert!(c.assign_label("Entrypoint_0002"));
        assert!(!c.assign_label("loc_0002"));
        assert_eq!(c.label(), Some("Entrypoint_0002"));
    }

    #[test]
    fn second_word_flag_is_idempotent() {
        let mut c = Cell::default();
        assert!(!c.is_second_word());
        c.mark_second_word();
        c.mark_second_word();
        assert!(c.is_second_word());
    }

    #[test]
    fn xrefs_keep_insertion_order() {
        let mut c = Cell::default();
        c.add_xref(XrefKind::Read, Address(40));
        c.add_xref(XrefKind::Read, Address(12));
        c.add_xref(XrefKind::Write, Address(7));
        assert_eq!(c.read_from(), &[Address(40), Address(12)]);
        assert_eq!(c.xrefs(XrefKind::Write), &[Address(7)]);
        assert!(c.jump_from().is_empty());
        assert!(c.has_trace());
    }

    #[test]
    fn last_nonzero_scans_from_top() {
        let img = MemoryImage::from_words([(Address(3), 1), (Address(0x200), 5)]);
        assert_eq!(img.last_nonzero(), Some(Address(0x200)));
        assert_eq!(img.read_word(Address(3)), 1);
        assert_eq!(MemoryImage::new().last_nonzero(), None);
    }
}
