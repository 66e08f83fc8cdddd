use anyhow::{anyhow, bail, ensure, Context, Result};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;

use excel_cpu_rs::address::ROW_WIDTH;
use excel_cpu_rs::{Address, MemoryImage};

/// A populated grid cell: 0-based row and column plus its integer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
    pub value: u64,
}

const WORKBOOK_EXTS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Load a ROM grid. Workbooks (`.xlsx` and friends) are read from their first
/// worksheet, `.json` files hold an array of rows of `null`/integer cells, and
/// anything else is read as tab- or comma-separated text.
pub fn load_grid(path: &Path) -> Result<MemoryImage> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let cells = if WORKBOOK_EXTS.iter().any(|w| ext.eq_ignore_ascii_case(w)) {
        read_workbook(path)?
    } else {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        if ext.eq_ignore_ascii_case("json") { parse_json(&text)? } else { parse_delimited(&text)? }
    };
    let img = image_from_grid(cells)?;
    tracing::debug!(path = %path.display(), last = ?img.last_nonzero(), "grid loaded");
    Ok(img)
}

pub fn parse_delimited(text: &str) -> Result<Vec<GridCell>> {
    let mut out = Vec::new();
    for (row, line) in text.lines().enumerate() {
        let sep = if line.contains('\t') { '\t' } else { ',' };
        for (col, field) in line.split(sep).enumerate() {
            let field = field.trim();
            if field.is_empty() {
                continue;
            }
            let value = parse_value(field).with_context(|| {
                format!("cell {} (row {}, column {})", cell_name(row, col), row + 1, col + 1)
            })?;
            out.push(GridCell { row, col, value });
        }
    }
    Ok(out)
}

// Cached cell values are used, so formulas contribute their last result.
fn read_workbook(path: &Path) -> Result<Vec<GridCell>> {
    let mut book = open_workbook_auto(path)
        .with_context(|| format!("opening workbook {}", path.display()))?;
    let range = book
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("workbook {} has no worksheets", path.display()))?
        .with_context(|| format!("reading first worksheet of {}", path.display()))?;
    grid_from_range(&range)
}

pub fn grid_from_range(range: &Range<Data>) -> Result<Vec<GridCell>> {
    let Some((row0, col0)) = range.start() else { return Ok(Vec::new()) };
    let mut out = Vec::new();
    for (r, c, v) in range.used_cells() {
        let (row, col) = (row0 as usize + r, col0 as usize + c);
        let value = match v {
            Data::Empty => continue,
            Data::Int(i) => u64::try_from(*i).ok(),
            Data::Float(f) if *f >= 0.0 && f.fract() == 0.0 && *f < 9.0e15 => Some(*f as u64),
            Data::String(s) if s.trim().is_empty() => continue,
            Data::String(s) => parse_value(s.trim()).ok(),
            _ => None,
        };
        let Some(value) = value else {
            bail!("cell {} holds `{v}` which is not a non-negative integer", cell_name(row, col));
        };
        out.push(GridCell { row, col, value });
    }
    Ok(out)
}

pub fn parse_json(text: &str) -> Result<Vec<GridCell>> {
    let rows: Vec<Vec<Option<u64>>> =
        serde_json::from_str(text).context("grid JSON must be an array of rows")?;
    Ok(rows
        .into_iter()
        .enumerate()
        .flat_map(|(row, cols)| {
            cols.into_iter()
                .enumerate()
                .filter_map(move |(col, v)| v.map(|value| GridCell { row, col, value }))
        })
        .collect())
}

pub fn image_from_grid(cells: Vec<GridCell>) -> Result<MemoryImage> {
    let mut words = Vec::with_capacity(cells.len());
    for c in cells {
        ensure!(
            c.row < ROW_WIDTH as usize && c.col < ROW_WIDTH as usize,
            "cell at row {}, column {} lies outside the 256x256 grid",
            c.row + 1,
            c.col + 1
        );
        let Ok(w) = u16::try_from(c.value) else {
            bail!("cell {} holds {} which does not fit in 16 bits", cell_name(c.row, c.col), c.value);
        };
        let addr = Address((c.row * ROW_WIDTH as usize + c.col) as u16);
        words.push((addr, w));
    }
    Ok(MemoryImage::from_words(words))
}

// Spreadsheet exports may write integral numbers as `6144.0`.
fn parse_value(field: &str) -> Result<u64> {
    let digits = field.strip_suffix(".0").unwrap_or(field);
    ensure!(
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
        "`{field}` is not a non-negative integer"
    );
    Ok(digits.parse()?)
}

fn cell_name(row: usize, col: usize) -> String {
    match Address::from_row_col(row as u32, col as u32) {
        Ok(a) => a.to_spreadsheet(),
        Err(_) => format!("R{}C{}", row + 1, col + 1),
    }
}
