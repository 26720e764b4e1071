//! Tabular sources loaded into memory.
//!
//! Workbooks are read with `calamine`, delimited logs with the polars CSV
//! reader. Either way the result is a [`Sheet`]: a named polars `DataFrame`
//! with normalized, de-duplicated headers and cell access by column name.

use crate::error::{ParseError, Result};
use calamine::{Data, Reader, Sheets, open_workbook_auto};
use polars::prelude::*;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Timestamp layout used when workbook date cells are flattened to text
pub const CELL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single scalar read from a sheet
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Text cell, treating whitespace-only content as empty
    pub fn text(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Numeric value, parsing numeric-looking text (including decimal commas)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            Cell::Text(text) => text
                .parse::<f64>()
                .ok()
                .or_else(|| text.replace(',', ".").parse::<f64>().ok()),
            Cell::Empty => None,
        }
    }

    /// Text value; whole numbers are rendered without a fractional part
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Text(text) => Some(text.clone()),
            Cell::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                Some(format!("{}", *value as i64))
            }
            Cell::Number(value) => Some(value.to_string()),
            Cell::Empty => None,
        }
    }

    fn from_any(value: AnyValue<'_>) -> Self {
        match value {
            AnyValue::Null => Cell::Empty,
            AnyValue::Float64(v) if v.is_nan() => Cell::Empty,
            AnyValue::Float64(v) => Cell::Number(v),
            AnyValue::Float32(v) if v.is_nan() => Cell::Empty,
            AnyValue::Float32(v) => Cell::Number(v as f64),
            AnyValue::Int64(v) => Cell::Number(v as f64),
            AnyValue::Int32(v) => Cell::Number(v as f64),
            AnyValue::UInt64(v) => Cell::Number(v as f64),
            AnyValue::UInt32(v) => Cell::Number(v as f64),
            AnyValue::Boolean(v) => Cell::Text(v.to_string()),
            AnyValue::String(v) => Cell::text(v),
            AnyValue::StringOwned(v) => Cell::text(v.as_str()),
            other => Cell::text(&other.to_string()),
        }
    }

    fn from_workbook(value: &Data) -> Self {
        match value {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::Int(v) => Cell::Number(*v as f64),
            Data::Float(v) => Cell::Number(*v),
            Data::Bool(v) => Cell::Text(v.to_string()),
            Data::String(v) => Cell::text(v),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(datetime) => Cell::Text(datetime.format(CELL_DATETIME_FORMAT).to_string()),
                None => Cell::Number(dt.as_f64()),
            },
            Data::DateTimeIso(v) | Data::DurationIso(v) => Cell::text(v),
        }
    }
}

/// Header normalization applied to every loaded sheet.
pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_string()
}

/// Rename repeated headers the way spreadsheet tooling does: `x`, `x.1`, `x.2`.
pub fn mangle_duplicates(headers: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(headers.len());
    for header in headers {
        let mut candidate = header.clone();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("{header}.{suffix}");
            suffix += 1;
        }
        seen.push(candidate);
    }
    seen
}

/// One worksheet or delimited log held in memory
#[derive(Debug, Clone)]
pub struct Sheet {
    name: String,
    frame: DataFrame,
}

impl Sheet {
    pub fn new(name: impl Into<String>, frame: DataFrame) -> Self {
        Self {
            name: name.into(),
            frame,
        }
    }

    /// Build a sheet from a header row and data rows. Short rows are padded
    /// with empty cells, headers are normalized and de-duplicated.
    pub fn from_rows(
        name: impl Into<String>,
        headers: Vec<String>,
        rows: Vec<Vec<Cell>>,
    ) -> Result<Self> {
        let headers = mangle_duplicates(headers.iter().map(|h| normalize_header(h)).collect());
        let mut columns: Vec<Vec<Cell>> = vec![Vec::with_capacity(rows.len()); headers.len()];
        for row in rows {
            let mut cells = row.into_iter();
            for column in columns.iter_mut() {
                column.push(cells.next().unwrap_or(Cell::Empty));
            }
        }
        let frame_columns = headers
            .iter()
            .zip(columns)
            .map(|(header, cells)| build_column(header, cells))
            .collect();
        Ok(Self::new(name, DataFrame::new(frame_columns)?))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|name| name.as_str().to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame
            .get_column_names()
            .into_iter()
            .any(|column| column.as_str() == name)
    }

    /// Cell at `row` of `column`; rows past the end read as empty
    pub fn cell(&self, column: &str, row: usize) -> Result<Cell> {
        let series = self.require_column(column)?;
        if row >= self.height() {
            return Ok(Cell::Empty);
        }
        Ok(Cell::from_any(series.get(row)?))
    }

    pub fn column(&self, column: &str) -> Result<Vec<Cell>> {
        let series = self.require_column(column)?;
        (0..self.height())
            .map(|row| Ok(Cell::from_any(series.get(row)?)))
            .collect()
    }

    /// Rename every column through `rename`, then re-apply duplicate mangling.
    pub fn rename_columns(&mut self, rename: impl Fn(&str) -> String) -> Result<()> {
        let current = self.column_names();
        let renamed = mangle_duplicates(current.iter().map(|name| rename(name)).collect());
        for (old, new) in current.iter().zip(renamed) {
            if *old != new {
                self.frame.rename(old, new.as_str().into())?;
            }
        }
        Ok(())
    }

    /// Drop every column whose name matches `predicate`; returns how many went.
    pub fn drop_columns(&mut self, predicate: impl Fn(&str) -> bool) -> Result<usize> {
        let doomed: Vec<String> = self
            .column_names()
            .into_iter()
            .filter(|name| predicate(name))
            .collect();
        for name in &doomed {
            self.frame = self.frame.drop(name)?;
        }
        Ok(doomed.len())
    }

    fn require_column(&self, column: &str) -> Result<&Column> {
        if !self.has_column(column) {
            return Err(ParseError::schema_mismatch(
                self.name.clone(),
                vec![column.to_string()],
            ));
        }
        Ok(self.frame.column(column)?)
    }
}

fn build_column(name: &str, cells: Vec<Cell>) -> Column {
    let numeric = cells
        .iter()
        .all(|cell| matches!(cell, Cell::Empty | Cell::Number(_)));
    if numeric {
        let values: Vec<Option<f64>> = cells.iter().map(Cell::as_f64).collect();
        Column::new(name.into(), values)
    } else {
        let values: Vec<Option<String>> = cells.iter().map(Cell::as_text).collect();
        Column::new(name.into(), values)
    }
}

/// Options applied when turning a worksheet into a [`Sheet`]
#[derive(Debug, Clone)]
pub struct SheetOptions {
    /// Rows whose first non-empty cell starts with this prefix are skipped
    pub comment_prefix: Option<String>,
}

impl Default for SheetOptions {
    fn default() -> Self {
        Self {
            comment_prefix: Some("#".to_string()),
        }
    }
}

/// An opened spreadsheet workbook
pub struct Workbook {
    path: PathBuf,
    sheets: Sheets<BufReader<File>>,
}

impl Workbook {
    pub fn open(path: &Path) -> Result<Self> {
        debug!("Opening workbook {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            sheets: open_workbook_auto(path)?,
        })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names().to_vec()
    }

    /// Read the named worksheet; the first non-comment row is the header.
    pub fn read_sheet(&mut self, name: &str, options: &SheetOptions) -> Result<Sheet> {
        let available = self.sheet_names();
        if !available.iter().any(|sheet| sheet == name) {
            return Err(ParseError::MissingSheet {
                sheet: name.to_string(),
                available,
            });
        }

        let range = self.sheets.worksheet_range(name)?;
        let mut rows = range
            .rows()
            .map(|row| row.iter().map(Cell::from_workbook).collect::<Vec<_>>())
            .filter(|row| !is_comment_row(row, options.comment_prefix.as_deref()));

        let headers = match rows.next() {
            Some(header) => header
                .iter()
                .map(|cell| cell.as_text().unwrap_or_default())
                .collect(),
            None => Vec::new(),
        };
        let data: Vec<Vec<Cell>> = rows.filter(|row| !row.iter().all(Cell::is_empty)).collect();

        debug!(
            "Read sheet '{}' from {}: {} columns, {} rows",
            name,
            self.path.display(),
            headers.len(),
            data.len()
        );
        Sheet::from_rows(name, headers, data)
    }
}

fn is_comment_row(row: &[Cell], prefix: Option<&str>) -> bool {
    let Some(prefix) = prefix else {
        return false;
    };
    match row.iter().find(|cell| !cell.is_empty()) {
        Some(Cell::Text(text)) => text.starts_with(prefix),
        _ => false,
    }
}

/// Options for delimited text logs
#[derive(Debug, Clone)]
pub struct DelimitedOptions {
    pub separator: u8,
    pub decimal_comma: bool,
    pub has_header: bool,
    /// Column names to use when the file has no header row
    pub column_names: Option<Vec<String>>,
    pub comment_prefix: Option<String>,
}

impl Default for DelimitedOptions {
    fn default() -> Self {
        Self {
            separator: b',',
            decimal_comma: false,
            has_header: true,
            column_names: None,
            comment_prefix: None,
        }
    }
}

impl DelimitedOptions {
    pub fn semicolon_decimal_comma() -> Self {
        Self {
            separator: b';',
            decimal_comma: true,
            ..Self::default()
        }
    }

    pub fn tab_separated(column_names: &[&str]) -> Self {
        Self {
            separator: b'\t',
            has_header: false,
            column_names: Some(column_names.iter().map(|name| name.to_string()).collect()),
            ..Self::default()
        }
    }
}

/// Read a delimited log into a [`Sheet`] named after the file stem.
pub fn read_delimited(path: &Path, options: &DelimitedOptions) -> Result<Sheet> {
    let separator = options.separator;
    let decimal_comma = options.decimal_comma;
    let comment_prefix = options.comment_prefix.clone();

    let frame = CsvReadOptions::default()
        .with_has_header(options.has_header)
        .with_infer_schema_length(Some(1000))
        .map_parse_options(|parse_options| {
            parse_options
                .with_separator(separator)
                .with_decimal_comma(decimal_comma)
                .with_comment_prefix(comment_prefix.as_deref())
                .with_truncate_ragged_lines(true)
        })
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("data")
        .to_string();
    let mut sheet = Sheet::new(name, frame);

    match &options.column_names {
        Some(names) => {
            let current = sheet.column_names();
            if current.len() > names.len() {
                return Err(ParseError::invalid_format(
                    path,
                    format!(
                        "expected at most {} columns, found {}",
                        names.len(),
                        current.len()
                    ),
                ));
            }
            sheet.rename_columns(|old| {
                current
                    .iter()
                    .position(|name| name == old)
                    .map(|index| names[index].clone())
                    .unwrap_or_else(|| old.to_string())
            })?;
        }
        None => sheet.rename_columns(normalize_header)?,
    }

    debug!(
        "Read delimited log {}: {} columns, {} rows",
        path.display(),
        sheet.column_names().len(),
        sheet.height()
    );
    Ok(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sample_sheet() -> Sheet {
        Sheet::from_rows(
            "Substrates",
            vec![
                "Substrate ID".to_string(),
                " Elements ".to_string(),
                "Elements".to_string(),
            ],
            vec![
                vec![
                    Cell::text("S-001"),
                    Cell::text("Sr"),
                    Cell::text("Ti"),
                ],
                vec![Cell::text("S-002"), Cell::text("Ga")],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_mangle_duplicates_follows_suffix_convention() {
        let headers = vec!["x", "y", "x", "x"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(mangle_duplicates(headers), vec!["x", "y", "x.1", "x.2"]);
    }

    #[test]
    fn test_from_rows_normalizes_and_pads() {
        let sheet = sample_sheet();
        assert_eq!(
            sheet.column_names(),
            vec!["Substrate ID", "Elements", "Elements.1"]
        );
        assert_eq!(sheet.height(), 2);
        assert_eq!(sheet.cell("Elements.1", 0).unwrap(), Cell::text("Ti"));
        assert_eq!(sheet.cell("Elements.1", 1).unwrap(), Cell::Empty);
        assert_eq!(sheet.cell("Elements", 5).unwrap(), Cell::Empty);
    }

    #[test]
    fn test_missing_column_is_schema_mismatch() {
        let sheet = sample_sheet();
        match sheet.cell("Doping species", 0) {
            Err(ParseError::SchemaMismatch { sheet, missing }) => {
                assert_eq!(sheet, "Substrates");
                assert_eq!(missing, vec!["Doping species".to_string()]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_numeric_columns_keep_numbers() {
        let sheet = Sheet::from_rows(
            "Sheet1",
            vec!["T12".to_string()],
            vec![
                vec![Cell::Number(1.5)],
                vec![Cell::Empty],
                vec![Cell::Number(3.0)],
            ],
        )
        .unwrap();
        let column = sheet.column("T12").unwrap();
        assert_eq!(column, vec![Cell::Number(1.5), Cell::Empty, Cell::Number(3.0)]);
    }

    #[test]
    fn test_cell_text_and_number_views() {
        assert_eq!(Cell::Number(42.0).as_text().unwrap(), "42");
        assert_eq!(Cell::text("12,5").as_f64(), Some(12.5));
        assert_eq!(Cell::text("   "), Cell::Empty);
        assert_eq!(Cell::text("abc").as_f64(), None);
    }

    #[test]
    fn test_rename_and_drop_columns() {
        let mut sheet = Sheet::from_rows(
            "log",
            vec!["T Ist H1 Time".into(), "T/12 ValueY".into(), "P Time".into()],
            vec![vec![Cell::text("a"), Cell::Number(1.0), Cell::text("b")]],
        )
        .unwrap();
        let dropped = sheet
            .drop_columns(|name| name.contains("Time") && name != "T Ist H1 Time")
            .unwrap();
        assert_eq!(dropped, 1);
        sheet.rename_columns(|name| name.replace('/', " ")).unwrap();
        assert_eq!(sheet.column_names(), vec!["T Ist H1 Time", "T 12 ValueY"]);
    }

    #[test]
    fn test_read_delimited_with_decimal_comma() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("protocol.csv");
        fs::write(&path, "time;T12 ValueY\n01.02.2024 10:00:00;1200,5\n01.02.2024 10:00:10;1201,25\n")
            .unwrap();

        let sheet = read_delimited(&path, &DelimitedOptions::semicolon_decimal_comma()).unwrap();
        assert_eq!(sheet.name(), "protocol");
        assert_eq!(sheet.height(), 2);
        assert_eq!(sheet.cell("T12 ValueY", 1).unwrap().as_f64(), Some(1201.25));
        assert_eq!(
            sheet.cell("time", 0).unwrap(),
            Cell::text("01.02.2024 10:00:00")
        );
    }

    #[test]
    fn test_read_tab_separated_with_names() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("run.elog");
        fs::write(&path, "00:00:00\tStart\n00:00:10\tStep:abcSTO\n").unwrap();

        let sheet =
            read_delimited(&path, &DelimitedOptions::tab_separated(&["time_h", "process"]))
                .unwrap();
        assert_eq!(sheet.column_names(), vec!["time_h", "process"]);
        assert_eq!(sheet.cell("process", 1).unwrap(), Cell::text("Step:abcSTO"));
    }
}
