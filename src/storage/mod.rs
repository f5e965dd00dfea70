//! Table I/O (CSV/Parquet)
//!
//! Every reader returns a single [`RecordBatch`]: experiment tables are small
//! enough that the engines work on one in-memory batch.

use std::fs::File;
use std::io::Seek;
use std::path::Path;
use std::sync::Arc;

use arrow::compute::concat_batches;
use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

use crate::{Error, Result};

/// Records scanned when inferring a CSV schema
pub const CSV_SCHEMA_INFERENCE_RECORDS: usize = 1000;

fn open(path: &Path, kind: &str) -> Result<File> {
    File::open(path).map_err(|e| {
        Error::StorageError(format!("Failed to open {kind} file {}: {e}", path.display()))
    })
}

fn concat(schema: &SchemaRef, batches: &[RecordBatch]) -> Result<RecordBatch> {
    concat_batches(schema, batches)
        .map_err(|e| Error::StorageError(format!("Failed to concatenate record batches: {e}")))
}

/// Load a CSV file with a header row.
///
/// Column types are inferred from the first
/// [`CSV_SCHEMA_INFERENCE_RECORDS`] records; empty cells read as null.
///
/// # Errors
/// Returns [`Error::StorageError`] if the file cannot be opened or parsed.
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<RecordBatch> {
    let path = path.as_ref();
    let mut file = open(path, "CSV")?;

    let format = Format::default().with_header(true);
    let (schema, _) = format
        .infer_schema(&mut file, Some(CSV_SCHEMA_INFERENCE_RECORDS))
        .map_err(|e| Error::StorageError(format!("Failed to infer CSV schema: {e}")))?;
    file.rewind()?;

    let schema = Arc::new(schema);
    let reader = ReaderBuilder::new(Arc::clone(&schema))
        .with_format(format)
        .build(file)
        .map_err(|e| Error::StorageError(format!("Failed to create CSV reader: {e}")))?;

    let batches = reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::StorageError(format!("Failed to read record batch: {e}")))?;

    let batch = concat(&schema, &batches)?;
    tracing::debug!(path = %path.display(), rows = batch.num_rows(), "loaded CSV");
    Ok(batch)
}

/// Load a Parquet file into one batch.
///
/// # Errors
/// Returns [`Error::StorageError`] if the file cannot be read or parsed.
pub fn load_parquet<P: AsRef<Path>>(path: P) -> Result<RecordBatch> {
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    let path = path.as_ref();
    let file = open(path, "Parquet")?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| Error::StorageError(format!("Failed to parse Parquet file: {e}")))?;
    let schema = Arc::clone(builder.schema());

    let reader = builder
        .build()
        .map_err(|e| Error::StorageError(format!("Failed to create Parquet reader: {e}")))?;

    let mut batches = Vec::new();
    for batch in reader {
        let batch =
            batch.map_err(|e| Error::StorageError(format!("Failed to read record batch: {e}")))?;
        batches.push(batch);
    }

    let batch = concat(&schema, &batches)?;
    tracing::debug!(path = %path.display(), rows = batch.num_rows(), "loaded Parquet");
    Ok(batch)
}

/// Write `batch` as CSV with a header row, creating parent directories.
///
/// # Errors
/// Returns [`Error::StorageError`] if the file cannot be written.
pub fn write_csv<P: AsRef<Path>>(batch: &RecordBatch, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path).map_err(|e| {
        Error::StorageError(format!("Failed to create CSV file {}: {e}", path.display()))
    })?;

    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer
        .write(batch)
        .map_err(|e| Error::StorageError(format!("Failed to write CSV: {e}")))?;
    tracing::debug!(path = %path.display(), rows = batch.num_rows(), "wrote CSV");
    Ok(())
}
