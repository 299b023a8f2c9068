//! Bag CSV ingest and validation.
//!
//! The bag file lists the user's holdings, one ISIN per row. Validation is
//! fail-fast: the first problem found rejects the whole file, because a bag
//! with a silently dropped row would produce a misleading schedule.
//!
//! Accepted headers (case-insensitive, BOM stripped):
//!
//! | column        | aliases                            |
//! |---------------|------------------------------------|
//! | `isin`        |                                    |
//! | `quantity`    | `Кілть в портфелі`                 |
//! | `expenditure` | `Загальна сума придбання`          |
//! | `tax`         | `Податок на прибуток ЮО (ПнПр)`    |

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, info};

use crate::domain::BagRow;
use crate::error::{AppError, EngineError};

const COL_ISIN: &str = "isin";
const COL_QUANTITY: &str = "quantity";
const COL_EXPENDITURE: &str = "expenditure";
const COL_TAX: &str = "tax";

/// Canonical column name and the header spellings that map to it.
const COLUMNS: [(&str, &[&str]); 4] = [
    (COL_ISIN, &["isin"]),
    (COL_QUANTITY, &["quantity", "кілть в портфелі"]),
    (COL_EXPENDITURE, &["expenditure", "загальна сума придбання"]),
    (COL_TAX, &["tax", "податок на прибуток юо (пнпр)"]),
];

/// Load and validate a bag CSV file.
pub fn load_bag(path: &Path) -> Result<Vec<BagRow>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open bag CSV '{}': {e}", path.display())))?;
    let bag = parse_bag_reader(file)?;
    info!(path = %path.display(), positions = bag.len(), "loaded bag");
    Ok(bag)
}

/// Validate bag CSV content from any reader.
pub fn parse_bag_reader<R: Read>(reader: R) -> Result<Vec<BagRow>, EngineError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| EngineError::MalformedRow {
            line: 1,
            message: e.to_string(),
        })?
        .clone();
    let columns = resolve_columns(&headers)?;

    let mut rows = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    // Blank records are only tolerated at the end of the file.
    let mut pending_blank: Option<usize> = None;

    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| EngineError::MalformedRow {
            line: idx + 2,
            message: e.to_string(),
        })?;
        // Line 1 is the header.
        let line = record.position().map_or(idx + 2, |pos| pos.line() as usize);
        if record.iter().all(|cell| cell.is_empty()) {
            pending_blank.get_or_insert(line);
            continue;
        }
        if let Some(blank) = pending_blank {
            return Err(EngineError::EmptyCell {
                column: header_label(&headers, 0),
                line: blank,
            });
        }

        reject_empty_cells(&record, &headers, line)?;
        let row = parse_row(&record, &columns, line)?;
        validate_row(&row)?;
        if !seen.insert(row.isin.clone()) {
            return Err(EngineError::InvalidPosition {
                isin: row.isin,
                reason: format!("listed more than once (line {line})"),
            });
        }
        rows.push(row);
    }

    if let Some(blank) = pending_blank {
        debug!(line = blank, "ignoring trailing blank bag rows");
    }
    Ok(rows)
}

/// Every header column must be filled, including ones the planner ignores.
fn reject_empty_cells(record: &StringRecord, headers: &StringRecord, line: usize) -> Result<(), EngineError> {
    match (0..headers.len()).find(|&idx| record.get(idx).is_none_or(|cell| cell.trim().is_empty())) {
        Some(idx) => Err(EngineError::EmptyCell {
            column: header_label(headers, idx),
            line,
        }),
        None => Ok(()),
    }
}

fn header_label(headers: &StringRecord, idx: usize) -> String {
    headers
        .get(idx)
        .map(|name| name.trim().trim_start_matches('\u{feff}').to_string())
        .unwrap_or_default()
}

/// Map canonical column names to record indices, reporting every missing one.
fn resolve_columns(headers: &StringRecord) -> Result<HashMap<&'static str, usize>, EngineError> {
    let header_map = build_header_map(headers);

    let mut columns = HashMap::new();
    let mut missing = Vec::new();
    for (name, aliases) in COLUMNS {
        match aliases.iter().find_map(|alias| header_map.get(*alias)) {
            Some(idx) => {
                columns.insert(name, *idx);
            }
            None => missing.push(name.to_string()),
        }
    }

    if missing.is_empty() {
        Ok(columns)
    } else {
        Err(EngineError::MissingColumns(missing))
    }
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn parse_row(record: &StringRecord, columns: &HashMap<&'static str, usize>, line: usize) -> Result<BagRow, EngineError> {
    let isin = get_required(record, columns, COL_ISIN, line)?.to_ascii_uppercase();

    let raw_quantity = get_required(record, columns, COL_QUANTITY, line)?;
    let quantity = raw_quantity
        .parse::<i64>()
        .map_err(|_| invalid_type(COL_QUANTITY, line, raw_quantity, "integer"))?;
    if quantity <= 0 {
        return Err(EngineError::InvalidPosition {
            isin,
            reason: format!("quantity must be positive, got {quantity}"),
        });
    }

    let raw_expenditure = get_required(record, columns, COL_EXPENDITURE, line)?;
    let expenditure =
        parse_number(raw_expenditure).ok_or_else(|| invalid_type(COL_EXPENDITURE, line, raw_expenditure, "number"))?;

    let raw_tax = get_required(record, columns, COL_TAX, line)?;
    let tax = parse_number(raw_tax).ok_or_else(|| invalid_type(COL_TAX, line, raw_tax, "number"))?;

    Ok(BagRow {
        isin,
        quantity: quantity as u64,
        expenditure,
        tax,
    })
}

fn validate_row(row: &BagRow) -> Result<(), EngineError> {
    if row.expenditure <= 0.0 {
        return Err(EngineError::InvalidPosition {
            isin: row.isin.clone(),
            reason: format!("expenditure must be positive, got {}", row.expenditure),
        });
    }
    if !(0.0..=1.0).contains(&row.tax) {
        return Err(EngineError::InvalidPosition {
            isin: row.isin.clone(),
            reason: format!("tax must be a fraction between 0 and 1, got {}", row.tax),
        });
    }
    Ok(())
}

fn get_required<'a>(
    record: &'a StringRecord,
    columns: &HashMap<&'static str, usize>,
    column: &'static str,
    line: usize,
) -> Result<&'a str, EngineError> {
    columns
        .get(column)
        .and_then(|idx| record.get(*idx))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EngineError::EmptyCell {
            column: column.to_string(),
            line,
        })
}

/// Numbers as typed into spreadsheets: `1 234,50` and `1234.50` are both fine.
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    let v = cleaned.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

fn invalid_type(column: &'static str, line: usize, value: &str, expected: &'static str) -> EngineError {
    EngineError::InvalidType {
        column,
        line,
        value: value.to_string(),
        expected,
    }
}
