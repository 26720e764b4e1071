//! Column and field resolution against loaded sheets.
//!
//! Header revisions differ between files, so every parser validates its
//! required columns up front and reads everything else as optional. Repeated
//! groups use the suffix convention `base`, `base.1`, `base.2`, ...

use crate::error::{ParseError, Result};
use crate::sheet::{Cell, Sheet};

/// Column name of repetition `index` of `base` (index 0 is unsuffixed).
pub fn suffixed(base: &str, index: usize) -> String {
    if index == 0 {
        base.to_string()
    } else {
        format!("{base}.{index}")
    }
}

/// Required columns absent from `sheet`, in the order they were asked for.
pub fn missing_columns(sheet: &Sheet, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|name| !sheet.has_column(name))
        .map(|name| name.to_string())
        .collect()
}

/// Fail with every missing column named in one error.
pub fn require_columns(sheet: &Sheet, required: &[&str]) -> Result<()> {
    let missing = missing_columns(sheet, required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ParseError::schema_mismatch(sheet.name(), missing))
    }
}

/// Read access to one row; absent columns read as empty.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'s> {
    sheet: &'s Sheet,
    row: usize,
}

impl<'s> RowView<'s> {
    pub fn new(sheet: &'s Sheet, row: usize) -> Self {
        Self { sheet, row }
    }

    pub fn sheet(&self) -> &'s Sheet {
        self.sheet
    }

    pub fn index(&self) -> usize {
        self.row
    }

    pub fn cell(&self, column: &str) -> Result<Cell> {
        if !self.sheet.has_column(column) {
            return Ok(Cell::Empty);
        }
        self.sheet.cell(column, self.row)
    }

    pub fn number(&self, column: &str) -> Result<Option<f64>> {
        Ok(self.cell(column)?.as_f64())
    }

    pub fn text(&self, column: &str) -> Result<Option<String>> {
        Ok(self.cell(column)?.as_text())
    }

    /// Entries of a repeated column group in this row
    pub fn repeated(&self, bases: &'s [&'s str]) -> RepeatedGroup<'s> {
        repeated_group(self.sheet, self.row, bases)
    }
}

/// One repetition of a column group: cells are in the order of the bases
#[derive(Debug, Clone, PartialEq)]
pub struct GroupEntry {
    pub index: usize,
    pub cells: Vec<Cell>,
}

/// Lazy walk over `bases`, `bases.1`, ... ending at the first suffix where any
/// base column is absent.
pub struct RepeatedGroup<'s> {
    sheet: &'s Sheet,
    row: usize,
    bases: &'s [&'s str],
    next_index: Option<usize>,
}

pub fn repeated_group<'s>(sheet: &'s Sheet, row: usize, bases: &'s [&'s str]) -> RepeatedGroup<'s> {
    RepeatedGroup {
        sheet,
        row,
        bases,
        next_index: if bases.is_empty() { None } else { Some(0) },
    }
}

impl Iterator for RepeatedGroup<'_> {
    type Item = Result<GroupEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next_index?;
        let names: Vec<String> = self.bases.iter().map(|base| suffixed(base, index)).collect();
        if !names.iter().all(|name| self.sheet.has_column(name)) {
            self.next_index = None;
            return None;
        }
        self.next_index = Some(index + 1);

        let cells: Result<Vec<Cell>> = names
            .iter()
            .map(|name| self.sheet.cell(name, self.row))
            .collect();
        Some(cells.map(|cells| GroupEntry { index, cells }))
    }
}
