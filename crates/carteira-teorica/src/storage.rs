//! Parquet artifact writer for a loaded report.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use arrow_array::{ArrayRef, Float64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::types::{CarteiraError, CarteiraResult, Cell, ColumnKind, ReportTable};

/// File extension of the published artifact.
pub const ARTIFACT_EXTENSION: &str = "parquet";

/// Writer for Parquet artifacts.
pub struct ParquetWriter;

impl ParquetWriter {
    /// Write a report table to a Parquet file, creating parent directories.
    pub fn write_to_file(table: &ReportTable, path: &Path) -> CarteiraResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = std::fs::File::create(path)?;
        Self::write_to(table, file)?;
        tracing::info!("wrote {} rows to {}", table.len(), path.display());
        Ok(())
    }

    /// Write a report table to any writer.
    pub fn write_to<W: Write + Send>(table: &ReportTable, writer: W) -> CarteiraResult<()> {
        let batch = to_record_batch(table)?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        let mut writer = ArrowWriter::try_new(writer, batch.schema(), Some(props))
            .map_err(|e| CarteiraError::Parquet(format!("opening writer failed: {e}")))?;
        writer
            .write(&batch)
            .map_err(|e| CarteiraError::Parquet(format!("writing batch failed: {e}")))?;
        writer
            .close()
            .map_err(|e| CarteiraError::Parquet(format!("closing writer failed: {e}")))?;
        Ok(())
    }
}

/// Convert a report table into a single Arrow record batch.
///
/// Number columns become nullable `Float64`, everything else `Utf8`. A cell
/// whose type disagrees with its column is written as null.
pub fn to_record_batch(table: &ReportTable) -> CarteiraResult<RecordBatch> {
    let fields: Vec<Field> = table
        .columns
        .iter()
        .map(|c| match c.kind {
            ColumnKind::Number => Field::new(&c.name, DataType::Float64, true),
            ColumnKind::Text => Field::new(&c.name, DataType::Utf8, true),
        })
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let arrays: Vec<ArrayRef> = table
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| -> ArrayRef {
            let cells = table.rows.iter().map(|row| row.get(idx));
            match column.kind {
                ColumnKind::Number => Arc::new(Float64Array::from(
                    cells.map(|c| c.and_then(Cell::as_number)).collect::<Vec<_>>(),
                )),
                ColumnKind::Text => Arc::new(StringArray::from(
                    cells.map(|c| c.and_then(Cell::as_text)).collect::<Vec<_>>(),
                )),
            }
        })
        .collect();

    RecordBatch::try_new(schema, arrays)
        .map_err(|e| CarteiraError::Parquet(format!("building record batch failed: {e}")))
}
