//! Report loader: `;`-delimited Latin-1 CSV into a [`ReportTable`].
//!
//! The exchange publishes numbers in the Brazilian locale (`1.234,56`), ends
//! the file with two summary lines, and leads each row with a column that
//! carries no constituent data. The report date only appears in the file
//! name, as `DD-MM-YY`.

use std::path::Path;
use std::sync::OnceLock;

use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use regex::Regex;

use crate::types::{
    CarteiraError, CarteiraResult, Cell, Column, ReportDate, ReportRow, ReportTable,
};

/// Theoretical quantity column, coerced to a number.
pub const QUANTITY_COLUMN: &str = "Qtde. Teórica";

/// Percentage weight column, coerced to a number.
pub const WEIGHT_COLUMN: &str = "Part. (%)";

/// Column appended to every row with the `YYYYMMDD` report date.
pub const REPORT_DATE_COLUMN: &str = "data";

/// Summary lines at the end of every report.
pub const FOOTER_LINES: usize = 2;

const DELIMITER: u8 = b';';

fn date_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{2}-\d{2}-\d{2}").expect("date token regex is valid"))
}

/// First `DD-MM-YY` token in a file name.
pub fn extract_date_token(file_name: &str) -> Option<&str> {
    date_token_regex().find(file_name).map(|m| m.as_str())
}

/// Parse a `DD-MM-YY` token into a calendar date.
pub fn parse_date_token(token: &str) -> CarteiraResult<ReportDate> {
    NaiveDate::parse_from_str(token, "%d-%m-%y")
        .map(ReportDate::new)
        .map_err(|_| CarteiraError::InvalidDate(token.to_string()))
}

/// Report date encoded in the name of `path`.
///
/// Fails with [`CarteiraError::NoDateFound`] when the name has no
/// `DD-MM-YY` token at all, and with [`CarteiraError::InvalidDate`] when the
/// token is not a real date.
pub fn report_date_from_path(path: &Path) -> CarteiraResult<ReportDate> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let token = extract_date_token(&file_name)
        .ok_or_else(|| CarteiraError::NoDateFound(file_name.clone()))?;
    parse_date_token(token)
}

/// Coerce a Brazilian-locale decimal (`.` thousands, `,` decimal) to `f64`.
///
/// Returns `None` for anything that is not a number after normalization,
/// including the empty string.
pub fn coerce_decimal(raw: &str) -> Option<f64> {
    let normalized = raw.trim().replace('.', "").replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    normalized.parse::<f64>().ok()
}

/// Decode ISO-8859-1 report bytes.
///
/// WINDOWS-1252 is the WHATWG decoder for the `latin1` label and a superset
/// of it for printable characters.
pub fn decode_latin1(bytes: &[u8]) -> String {
    let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
    text.into_owned()
}

/// Remove the trailing footer lines. Trailing blank lines are not counted.
fn strip_footer(text: &str) -> String {
    let mut lines: Vec<&str> = text.lines().collect();
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let keep = lines.len().saturating_sub(FOOTER_LINES);
    lines.truncate(keep);
    lines.join("\n")
}

/// Load the report at `path`.
///
/// The date is checked before the file is read, so an undated file fails
/// with [`CarteiraError::NoDateFound`] without any parsing.
pub fn load_report(path: &Path) -> CarteiraResult<ReportTable> {
    let report_date = report_date_from_path(path)?;
    tracing::info!(
        "report date {} extracted from {}",
        report_date,
        path.display()
    );

    let bytes = std::fs::read(path)?;
    let table = parse_report(&decode_latin1(&bytes), report_date)?;

    tracing::info!("loaded {} rows from {}", table.len(), path.display());
    Ok(table)
}

/// Parse decoded report text and stamp every row with `report_date`.
pub fn parse_report(text: &str, report_date: ReportDate) -> CarteiraResult<ReportTable> {
    let body = strip_footer(text);

    let mut reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(CarteiraError::MissingHeader);
    }

    // Skip the leading non-data column and any unnamed column left behind
    // by a trailing delimiter.
    let kept: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, name)| !name.is_empty())
        .map(|(i, name)| (i, name.to_string()))
        .collect();

    for required in [QUANTITY_COLUMN, WEIGHT_COLUMN] {
        if !kept.iter().any(|(_, name)| name == required) {
            return Err(CarteiraError::MissingColumn(required.to_string()));
        }
    }

    let mut columns: Vec<Column> = kept
        .iter()
        .map(|(_, name)| {
            if is_numeric_column(name) {
                Column::number(name.clone())
            } else {
                Column::text(name.clone())
            }
        })
        .collect();

    let stamp = report_date.compact();
    let mut rows = Vec::new();

    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        let mut cells = Vec::with_capacity(columns.len() + 1);

        for (src_idx, name) in &kept {
            let raw = record.get(*src_idx).unwrap_or("");
            if is_numeric_column(name) {
                let value = coerce_decimal(raw).ok_or_else(|| CarteiraError::InvalidNumber {
                    column: name.clone(),
                    row: row_idx + 1,
                    value: raw.to_string(),
                })?;
                cells.push(Cell::Number(value));
            } else {
                cells.push(Cell::Text(raw.to_string()));
            }
        }

        cells.push(Cell::Text(stamp.clone()));
        rows.push(ReportRow { cells });
    }

    columns.push(Column::text(REPORT_DATE_COLUMN));

    Ok(ReportTable {
        columns,
        rows,
        report_date,
    })
}

fn is_numeric_column(name: &str) -> bool {
    name == QUANTITY_COLUMN || name == WEIGHT_COLUMN
}
