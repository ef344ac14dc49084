//! Windowed, multi-sheet XLSX writer
//!
//! Rendered rows are buffered in a window of at most `window_rows` entries.
//! When the window fills up it is flushed to the current sheet's spool, an
//! anonymous temporary file. [`SpreadsheetWriter::finalize`] zips the spools
//! into a workbook and copies it into the caller's sink.

use super::columns::{CellValue, ColumnSet};
use super::xml;
use crate::config::ExportConfig;
use crate::domain::{Order, Result, SpreadsheetError};
use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Maximum sheet name length accepted by Excel
const MAX_SHEET_NAME_CHARS: usize = 31;

/// Rows between progress log lines
const PROGRESS_LOG_INTERVAL: u64 = 50_000;

/// Writer limits
#[derive(Debug, Clone)]
pub struct SheetSettings {
    /// Data rows per sheet (header not counted)
    pub max_rows_per_sheet: usize,
    /// Rendered rows held in memory before a flush
    pub window_rows: usize,
    /// Characters allowed in one text cell
    pub max_cell_length: usize,
    /// Name of the first sheet
    pub base_sheet_name: String,
}

impl From<&ExportConfig> for SheetSettings {
    fn from(config: &ExportConfig) -> Self {
        Self {
            max_rows_per_sheet: config.max_rows_per_sheet,
            window_rows: config.memory_rows_in_window,
            max_cell_length: config.max_cell_length,
            base_sheet_name: config.sheet_name.clone(),
        }
    }
}

impl Default for SheetSettings {
    fn default() -> Self {
        Self::from(&ExportConfig::default())
    }
}

/// Position of the writer inside the workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetState {
    /// 1-based index of the current sheet
    pub index: usize,
    /// Data rows written to the current sheet
    pub data_rows: usize,
}

/// What a finished workbook contains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkbookSummary {
    pub sheet_names: Vec<String>,
    pub rows_written: u64,
    pub bytes_written: u64,
}

impl WorkbookSummary {
    pub fn sheet_count(&self) -> usize {
        self.sheet_names.len()
    }
}

struct SheetSpool {
    name: String,
    file: BufWriter<File>,
}

/// Bounded-memory XLSX writer
pub struct SpreadsheetWriter {
    settings: SheetSettings,
    columns: ColumnSet,
    headers: Vec<&'static str>,
    sheets: Vec<SheetSpool>,
    window: Vec<String>,
    state: Option<SheetState>,
    rows_written: u64,
}

impl SpreadsheetWriter {
    pub fn new(settings: SheetSettings, columns: ColumnSet) -> Self {
        let headers = columns.headers();
        let window = Vec::with_capacity(settings.window_rows.max(1));
        Self {
            settings,
            columns,
            headers,
            sheets: Vec::new(),
            window,
            state: None,
            rows_written: 0,
        }
    }

    /// Current sheet position, `None` before the first sheet
    pub fn state(&self) -> Option<SheetState> {
        self.state
    }

    /// Data rows written across all sheets
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Rendered rows currently held in memory
    pub fn buffered_rows(&self) -> usize {
        self.window.len()
    }

    /// Opens a new sheet and writes its header row
    ///
    /// # Errors
    ///
    /// Fails for names Excel rejects or that are already used, and when the
    /// spool cannot be created.
    pub fn create_sheet(&mut self, name: &str) -> Result<()> {
        validate_sheet_name(name)?;
        if self.sheets.iter().any(|s| s.name.eq_ignore_ascii_case(name)) {
            return Err(SpreadsheetError::InvalidSheetName(format!("{name} (duplicate)")).into());
        }

        self.flush_window()?;

        let file = tempfile::tempfile().map_err(SpreadsheetError::from)?;
        let mut spool = SheetSpool {
            name: name.to_string(),
            file: BufWriter::new(file),
        };
        spool
            .file
            .write_all(xml::header_row(1, &self.headers).as_bytes())
            .map_err(SpreadsheetError::from)?;
        self.sheets.push(spool);

        let index = self.sheets.len();
        self.state = Some(SheetState {
            index,
            data_rows: 0,
        });

        tracing::debug!(sheet = name, index, "Created sheet");
        Ok(())
    }

    /// Appends one order as a data row, opening a new sheet when needed
    pub fn write_row(&mut self, order: &Order) -> Result<()> {
        let current = self.state;
        let state = match current {
            None => {
                let base = self.settings.base_sheet_name.clone();
                self.create_sheet(&base)?;
                self.current_state()?
            }
            Some(state) if state.data_rows >= self.settings.max_rows_per_sheet => {
                let name = format!("{}_{}", self.settings.base_sheet_name, state.index + 1);
                self.create_sheet(&name)?;
                self.current_state()?
            }
            Some(state) => state,
        };

        let cells: Vec<(_, CellValue)> = self
            .columns
            .iter()
            .map(|column| (column.format, column.value(order)))
            .collect();

        // Row 1 is the header.
        let row = xml::data_row(state.data_rows + 2, &cells, self.settings.max_cell_length);
        self.window.push(row);
        if self.window.len() >= self.settings.window_rows {
            self.flush_window()?;
        }

        self.state = Some(SheetState {
            index: state.index,
            data_rows: state.data_rows + 1,
        });
        self.rows_written += 1;

        if self.rows_written % PROGRESS_LOG_INTERVAL == 0 {
            tracing::info!(
                rows = self.rows_written,
                sheet = state.index,
                "Spreadsheet write progress"
            );
        }
        Ok(())
    }

    /// Writes a batch of orders in order
    pub fn write_rows<'a>(&mut self, orders: impl IntoIterator<Item = &'a Order>) -> Result<()> {
        for order in orders {
            self.write_row(order)?;
        }
        Ok(())
    }

    /// Packages the workbook and copies it into `sink`
    ///
    /// Consumes the writer; spool files are released when it drops, whether
    /// packaging succeeds or not. A workbook with no rows still gets one
    /// sheet carrying the header.
    pub fn finalize<W: Write + ?Sized>(mut self, sink: &mut W) -> Result<WorkbookSummary> {
        if self.sheets.is_empty() {
            let base = self.settings.base_sheet_name.clone();
            self.create_sheet(&base)?;
        }
        self.flush_window()?;

        let sheet_names: Vec<String> = self.sheets.iter().map(|s| s.name.clone()).collect();
        let package = tempfile::tempfile().map_err(SpreadsheetError::from)?;
        let mut zip = ZipWriter::new(package);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let parts = [
            ("[Content_Types].xml", xml::content_types(sheet_names.len())),
            ("_rels/.rels", xml::ROOT_RELS.to_string()),
            ("xl/workbook.xml", xml::workbook(&sheet_names)),
            ("xl/_rels/workbook.xml.rels", xml::workbook_rels(sheet_names.len())),
            ("xl/styles.xml", xml::styles()),
        ];
        for (path, body) in parts {
            zip.start_file(path, options)
                .map_err(SpreadsheetError::from)?;
            zip.write_all(body.as_bytes())
                .map_err(SpreadsheetError::from)?;
        }

        for (i, spool) in self.sheets.drain(..).enumerate() {
            let mut file = spool
                .file
                .into_inner()
                .map_err(|e| SpreadsheetError::WriteFailed(e.error().to_string()))?;
            file.seek(SeekFrom::Start(0))
                .map_err(SpreadsheetError::from)?;

            zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)
                .map_err(SpreadsheetError::from)?;
            zip.write_all(xml::WORKSHEET_START.as_bytes())
                .map_err(SpreadsheetError::from)?;
            io::copy(&mut file, &mut zip).map_err(SpreadsheetError::from)?;
            zip.write_all(xml::WORKSHEET_END.as_bytes())
                .map_err(SpreadsheetError::from)?;
        }

        let mut package = zip.finish().map_err(SpreadsheetError::from)?;
        package
            .seek(SeekFrom::Start(0))
            .map_err(SpreadsheetError::from)?;
        let bytes_written = io::copy(&mut package, sink).map_err(SpreadsheetError::from)?;
        sink.flush().map_err(SpreadsheetError::from)?;

        tracing::debug!(
            sheets = sheet_names.len(),
            rows = self.rows_written,
            bytes = bytes_written,
            "Workbook finalized"
        );

        Ok(WorkbookSummary {
            sheet_names,
            rows_written: self.rows_written,
            bytes_written,
        })
    }

    fn current_state(&self) -> Result<SheetState> {
        self.state.ok_or_else(|| SpreadsheetError::NoActiveSheet.into())
    }

    fn flush_window(&mut self) -> Result<()> {
        if self.window.is_empty() {
            return Ok(());
        }
        let spool = self
            .sheets
            .last_mut()
            .ok_or(SpreadsheetError::NoActiveSheet)?;
        for row in self.window.drain(..) {
            spool
                .file
                .write_all(row.as_bytes())
                .map_err(SpreadsheetError::from)?;
        }
        Ok(())
    }
}

fn validate_sheet_name(name: &str) -> Result<()> {
    let forbidden = ['[', ']', ':', '*', '?', '/', '\\'];
    let invalid = name.trim().is_empty()
        || name.chars().count() > MAX_SHEET_NAME_CHARS
        || name.chars().any(|c| forbidden.contains(&c))
        || name.starts_with('\'')
        || name.ends_with('\'');
    if invalid {
        return Err(SpreadsheetError::InvalidSheetName(name.to_string()).into());
    }
    Ok(())
}
