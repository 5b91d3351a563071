//! CSV ingest for trial files.
//!
//! This module turns one per-trial CSV into a `Trial`: time, internal temperature
//! and the per-row surface temperature selected by the `HOT/COLD/OUT` flag.
//!
//! Design goals:
//! - **Strict schema**: every required column must exist (exit code 2)
//! - **Fail fast** on cells that do not parse as numbers, with the line number
//! - **Explicit flag policy**: unknown flags keep the legacy zero default and are
//!   reported as warnings, or rejected when `strict_flags` is set
//! - **Separation of concerns**: no fitting logic here

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{SurfaceFlag, Trial};
use crate::error::AppError;

pub const COL_TIME: &str = "TIME (s  +-0.05s)";
pub const COL_INTERNAL: &str = "T_I (C   +-1 C)";
pub const COL_HOT: &str = "T_H (C   +-1 C)";
pub const COL_COLD: &str = "T_C (C   +-1 C)";
pub const COL_FLAG: &str = "HOT/COLD/OUT";

/// Columns in file order, as written by `synth` and expected by the loader.
pub const REQUIRED_COLUMNS: [&str; 5] = [COL_TIME, COL_INTERNAL, COL_HOT, COL_COLD, COL_FLAG];

/// Loader options.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Reject rows whose surface flag is not `H`, `C` or `O`.
    pub strict_flags: bool,
}

/// A row-level issue that did not stop the load.
#[derive(Debug, Clone)]
pub struct RowWarning {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the trial plus anything worth reporting about the rows.
#[derive(Debug, Clone)]
pub struct IngestedTrial {
    pub trial: Trial,
    pub warnings: Vec<RowWarning>,
    pub rows_read: usize,
}

#[derive(Debug, Clone)]
struct RawRow {
    line: usize,
    t: f64,
    t_internal: f64,
    t_hot: f64,
    t_cold: f64,
    flag: Option<SurfaceFlag>,
    raw_flag: String,
}

/// Load a trial CSV from disk.
pub fn load_trial(path: &Path, label: &str, opts: IngestOptions) -> Result<IngestedTrial, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open CSV '{}': {e}", path.display())))?;
    parse_trial(file, label, opts)
        .map_err(|e| AppError::new(e.exit_code(), format!("{}: {}", path.display(), e.message())))
}

/// Parse a trial CSV from any reader.
pub fn parse_trial<R: Read>(reader: R, label: &str, opts: IngestOptions) -> Result<IngestedTrial, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    ensure_required_columns_exist(&header_map)?;

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: header is line 1 and lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| AppError::input(format!("CSV parse error on line {line}: {e}")))?;
        rows.push(parse_row(&record, &header_map, line)?);
    }
    let rows_read = rows.len();

    let first_internal = rows.first().map(|r| r.t_internal).unwrap_or(f64::NAN);
    let mut warnings = Vec::new();
    let mut t_surface = Vec::with_capacity(rows.len());

    for row in &rows {
        let value = match row.flag {
            Some(SurfaceFlag::Hot) => row.t_hot,
            Some(SurfaceFlag::Cold) => row.t_cold,
            Some(SurfaceFlag::Out) => first_internal,
            None if opts.strict_flags => {
                return Err(AppError::input(format!(
                    "Line {}: unrecognized `{COL_FLAG}` value '{}' (expected H, C or O).",
                    row.line, row.raw_flag
                )));
            }
            None => {
                let message = format!(
                    "unrecognized `{COL_FLAG}` value '{}'; surface temperature left at 0",
                    row.raw_flag
                );
                log::warn!("{label}: line {}: {message}", row.line);
                warnings.push(RowWarning {
                    line: row.line,
                    message,
                });
                0.0
            }
        };
        t_surface.push(value);
    }

    let t = rows.iter().map(|r| r.t).collect();
    let t_internal = rows.iter().map(|r| r.t_internal).collect();
    let trial = Trial::new(label, t, t_internal, t_surface)?;

    log::info!("{label}: loaded {rows_read} rows ({} warnings)", warnings.len());

    Ok(IngestedTrial {
        trial,
        warnings,
        rows_read,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    name.trim_start_matches('\u{feff}').trim().to_string()
}

fn ensure_required_columns_exist(header_map: &HashMap<String, usize>) -> Result<(), AppError> {
    for name in REQUIRED_COLUMNS {
        if !header_map.contains_key(name) {
            return Err(AppError::input(format!("Missing required column: `{name}`")));
        }
    }
    Ok(())
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>, line: usize) -> Result<RawRow, AppError> {
    let raw_flag = get_required(record, header_map, COL_FLAG, line)?.to_string();
    Ok(RawRow {
        line,
        t: parse_f64(record, header_map, COL_TIME, line)?,
        t_internal: parse_f64(record, header_map, COL_INTERNAL, line)?,
        t_hot: parse_f64(record, header_map, COL_HOT, line)?,
        t_cold: parse_f64(record, header_map, COL_COLD, line)?,
        flag: SurfaceFlag::parse(&raw_flag),
        raw_flag,
    })
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
    line: usize,
) -> Result<&'a str, AppError> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| AppError::input(format!("Missing required column: `{name}`")))?;
    record
        .get(*idx)
        .ok_or_else(|| AppError::input(format!("Line {line}: missing value for `{name}`")))
}

fn parse_f64(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
    line: usize,
) -> Result<f64, AppError> {
    let s = get_required(record, header_map, name, line)?;
    s.parse::<f64>()
        .map_err(|_| AppError::input(format!("Line {line}: `{name}` value '{s}' is not a number")))
}
