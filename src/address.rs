//! Address model of the 65536-word memory grid.
//!
//! A linear address maps onto the spreadsheet grid as `row * 256 + column`
//! and can be rendered (and parsed back) in four display styles.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Cells per grid row.
pub const ROW_WIDTH: u32 = 0x100;
/// Number of addressable words.
pub const MEM_WORDS: usize = 0x1_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressStyle {
    /// Plain decimal, e.g. `258`
    #[value(name = "deci", alias = "decimal")]
    Decimal,
    /// Four hex digits, e.g. `0102`
    #[default]
    Hex,
    /// `row_col`, e.g. `1_2`
    #[value(name = "rowcol", alias = "row-col")]
    RowCol,
    /// Spreadsheet cell name, e.g. `C2`
    #[value(name = "excel", alias = "spreadsheet")]
    Spreadsheet,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddrError {
    #[error("empty address string")]
    Empty,
    #[error("malformed {style} address `{text}`")]
    Malformed { style: AddressStyle, text: String },
    #[error("address `{0}` exceeds 0xFFFF")]
    OutOfRange(String),
    #[error("row {row} / column {col} outside the 256x256 grid")]
    OutsideGrid { row: u32, col: u32 },
    #[error("column letters `{0}` do not name a grid column")]
    BadColumn(String),
    #[error("row `{0}` is not a 1-based row number")]
    BadRow(String),
}

impl Address {
    pub const ZERO: Address = Address(0);

    pub fn from_row_col(row: u32, col: u32) -> Result<Self, AddrError> {
        if row >= ROW_WIDTH || col >= ROW_WIDTH {
            return Err(AddrError::OutsideGrid { row, col });
        }
        Ok(Address((row * ROW_WIDTH + col) as u16))
    }

    pub fn row(self) -> u32 {
        self.0 as u32 / ROW_WIDTH
    }

    pub fn col(self) -> u32 {
        self.0 as u32 % ROW_WIDTH
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Address `n` words further on, or `None` past the end of memory.
    pub fn offset(self, n: u16) -> Option<Address> {
        self.0.checked_add(n).map(Address)
    }

    pub fn to_hex(self) -> String {
        format!("{:04X}", self.0)
    }

    pub fn to_row_col(self) -> String {
        format!("{}_{}", self.row(), self.col())
    }

    pub fn to_spreadsheet(self) -> String {
        format!("{}{}", column_letters(self.col()), self.row() + 1)
    }

    pub fn render(self, style: AddressStyle) -> String {
        match style {
            AddressStyle::Decimal => self.0.to_string(),
            AddressStyle::Hex => self.to_hex(),
            AddressStyle::RowCol => self.to_row_col(),
            AddressStyle::Spreadsheet => self.to_spreadsheet(),
        }
    }

    /// Display adapter for `format!` and friends.
    pub fn styled(self, style: AddressStyle) -> Styled {
        Styled { addr: self, style }
    }
}

impl From<u16> for Address {
    fn from(v: u16) -> Self {
        Address(v)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Styled {
    addr: Address,
    style: AddressStyle,
}

impl fmt::Display for Styled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.addr.render(self.style))
    }
}

impl fmt::Display for AddressStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddressStyle::Decimal => "decimal",
            AddressStyle::Hex => "hex",
            AddressStyle::RowCol => "row_col",
            AddressStyle::Spreadsheet => "spreadsheet",
        };
        f.write_str(name)
    }
}

impl AddressStyle {
    pub fn render(self, addr: Address) -> String {
        addr.render(self)
    }

    /// Parse a string produced by [`AddressStyle::render`].
    pub fn parse(self, text: &str) -> Result<Address, AddrError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AddrError::Empty);
        }
        match self {
            AddressStyle::Decimal => {
                let v = parse_digits(text).ok_or_else(|| self.malformed(text))?;
                u16::try_from(v)
                    .map(Address)
                    .map_err(|_| AddrError::OutOfRange(text.to_string()))
            }
            AddressStyle::Hex => {
                if text.len() > 4 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return Err(self.malformed(text));
                }
                u16::from_str_radix(text, 16)
                    .map(Address)
                    .map_err(|_| self.malformed(text))
            }
            AddressStyle::RowCol => {
                let (row, col) = text.split_once('_').ok_or_else(|| self.malformed(text))?;
                let row = parse_digits(row).ok_or_else(|| self.malformed(text))?;
                let col = parse_digits(col).ok_or_else(|| self.malformed(text))?;
                Address::from_row_col(row, col)
            }
            AddressStyle::Spreadsheet => parse_spreadsheet(text),
        }
    }

    fn malformed(self, text: &str) -> AddrError {
        AddrError::Malformed { style: self, text: text.to_string() }
    }
}

fn column_letters(col: u32) -> String {
    let letter = |n: u32| char::from(b'A' + n as u8);
    if col < 26 {
        letter(col).to_string()
    } else {
        format!("{}{}", letter(col / 26 - 1), letter(col % 26))
    }
}

// Digits only; rejects signs and whitespace that `str::parse` would accept.
fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || s.len() > 9 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_spreadsheet(text: &str) -> Result<Address, AddrError> {
    let split = text
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(text.len());
    let (letters, digits) = text.split_at(split);

    let vals: Vec<u32> = letters
        .bytes()
        .map(|b| (b.to_ascii_uppercase() - b'A') as u32)
        .collect();
    let col = match vals.as_slice() {
        [l] => *l,
        [h, l] => (h + 1) * 26 + l,
        _ => return Err(AddrError::BadColumn(letters.to_string())),
    };
    if col >= ROW_WIDTH {
        return Err(AddrError::BadColumn(letters.to_string()));
    }

    let row = match parse_digits(digits) {
        Some(r) if (1..=ROW_WIDTH).contains(&r) => r - 1,
        _ => return Err(AddrError::BadRow(digits.to_string())),
    };
    Address::from_row_col(row, col)
}
