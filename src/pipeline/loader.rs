//! Dataset loading and artifact I/O for CSV and Parquet files
//!
//! Every artifact is written whole: data goes to a temporary file in the
//! destination directory which is then renamed over the target, so a reader
//! never observes a partially written file. A stage with several outputs
//! stages them all in an [`ArtifactBatch`] before renaming any of them.

use std::borrow::Cow;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tempfile::NamedTempFile;
use tracing::warn;

use super::records::{CleanRecord, Label, RawRecord};
use crate::error::{PipelineError, Result};

/// Canonical column names of record files
pub const TEXT_COLUMN: &str = "text";
pub const TARGET_COLUMN: &str = "target";

/// Whether a dataset source refers to a remote HTTP(S) location
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Fetch raw source bytes from a local path or URL
pub fn fetch_source(source: &str, root: &Path) -> Result<Vec<u8>> {
    if is_remote(source) {
        let response = reqwest::blocking::get(source)
            .and_then(|r| r.error_for_status())
            .map_err(|e| PipelineError::data_load(format!("Failed to fetch {}: {}", source, e)))?;
        let bytes = response
            .bytes()
            .map_err(|e| PipelineError::data_load(format!("Failed to read {}: {}", source, e)))?;
        return Ok(bytes.to_vec());
    }

    let path = root.join(source);
    std::fs::read(&path).map_err(|e| {
        PipelineError::data_load(format!("Failed to read {}: {}", path.display(), e))
    })
}

/// Decode source bytes as UTF-8, falling back to Windows-1252 (a superset of
/// Latin-1 for printable characters)
pub fn decode_source(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded
        }
    }
}

/// Parse CSV text with every column read as a string
pub fn parse_csv_text(text: &str) -> Result<DataFrame> {
    let cursor = Cursor::new(text.as_bytes().to_vec());
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| opts.with_truncate_ragged_lines(true))
        .into_reader_with_file_handle(cursor)
        .finish()
        .map_err(|e| PipelineError::data_load(format!("Malformed CSV source: {}", e)))?;
    Ok(df)
}

/// Load the raw source dataset and validate it into typed records.
///
/// Columns other than `text_column` and `label_column` are dropped. Rows with
/// a missing text or label fail the load.
pub fn load_raw_records(
    source: &str,
    root: &Path,
    text_column: &str,
    label_column: &str,
) -> Result<Vec<RawRecord>> {
    let df = if !is_remote(source) && source.to_lowercase().ends_with(".parquet") {
        let path = root.join(source);
        let file = std::fs::File::open(&path).map_err(|e| {
            PipelineError::data_load(format!("Failed to read {}: {}", path.display(), e))
        })?;
        ParquetReader::new(file)
            .finish()
            .map_err(|e| PipelineError::data_load(format!("Malformed Parquet source: {}", e)))?
    } else {
        let bytes = fetch_source(source, root)?;
        parse_csv_text(&decode_source(&bytes))?
    };

    let column_names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    for required in [text_column, label_column] {
        if !column_names.iter().any(|c| c == required) {
            return Err(PipelineError::data_load(format!(
                "Column '{}' not found in source. Available columns: {:?}",
                required, column_names
            )));
        }
    }

    let texts = column_to_string_vec(df.column(text_column)?)?;
    let labels = column_to_string_vec(df.column(label_column)?)?;

    let mut records = Vec::with_capacity(texts.len());
    for (row, (text, label)) in texts.into_iter().zip(labels).enumerate() {
        match (text, label) {
            (Some(text), Some(label)) => records.push(RawRecord::new(text, label)),
            (None, _) => {
                return Err(PipelineError::data_load(format!(
                    "Row {} has no value in text column '{}'",
                    row + 1,
                    text_column
                )))
            }
            (_, None) => {
                return Err(PipelineError::data_load(format!(
                    "Row {} has no value in label column '{}'",
                    row + 1,
                    label_column
                )))
            }
        }
    }

    if records.is_empty() {
        return Err(PipelineError::data_load("Source dataset contains no records"));
    }

    Ok(records)
}

/// Convert a column to a Vec of Option<String>
fn column_to_string_vec(col: &Column) -> Result<Vec<Option<String>>> {
    let values: Vec<Option<String>> = match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect(),
        _ => {
            let cast = col.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.map(|s| s.to_string()))
                .collect()
        }
    };
    Ok(values)
}

/// Read a CSV artifact, every column as string
fn read_string_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|e| {
            PipelineError::data_load(format!("Failed to read {}: {}", path.display(), e))
        })?;
    Ok(df)
}

/// Text and target columns of a record file; a null text reads as empty
fn read_text_and_target(path: &Path) -> Result<Vec<(String, Option<String>)>> {
    let df = read_string_csv(path)?;
    let missing = |name: &str| {
        PipelineError::data_load(format!(
            "Column '{}' not found in {}",
            name,
            path.display()
        ))
    };
    let texts = column_to_string_vec(df.column(TEXT_COLUMN).map_err(|_| missing(TEXT_COLUMN))?)?;
    let targets =
        column_to_string_vec(df.column(TARGET_COLUMN).map_err(|_| missing(TARGET_COLUMN))?)?;

    Ok(texts
        .into_iter()
        .zip(targets)
        .map(|(text, target)| (text.unwrap_or_default(), target))
        .collect())
}

/// Read a record file written by ingestion. A missing label reads as an
/// empty string and is left to the preprocessing policy.
pub fn read_raw_records(path: &Path) -> Result<Vec<RawRecord>> {
    Ok(read_text_and_target(path)?
        .into_iter()
        .map(|(text, label)| RawRecord::new(text, label.unwrap_or_default()))
        .collect())
}

/// Read a cleaned record file; every target must already be 0 or 1
pub fn read_clean_records(path: &Path) -> Result<Vec<CleanRecord>> {
    read_text_and_target(path)?
        .into_iter()
        .enumerate()
        .map(|(row, (text, target))| {
            let label = target.as_deref().and_then(Label::from_encoded).ok_or_else(|| {
                PipelineError::data_load(format!(
                    "Row {} of {} has a target outside {{0, 1}}: {:?}",
                    row + 1,
                    path.display(),
                    target
                ))
            })?;
            Ok(CleanRecord::new(text, label))
        })
        .collect()
}

pub fn raw_records_to_frame(records: &[RawRecord]) -> Result<DataFrame> {
    let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
    let labels: Vec<&str> = records.iter().map(|r| r.label.as_str()).collect();
    Ok(DataFrame::new(vec![
        Column::new(TEXT_COLUMN.into(), texts),
        Column::new(TARGET_COLUMN.into(), labels),
    ])?)
}

pub fn clean_records_to_frame(records: &[CleanRecord]) -> Result<DataFrame> {
    let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
    let labels: Vec<i32> = records.iter().map(|r| r.label.as_i32()).collect();
    Ok(DataFrame::new(vec![
        Column::new(TEXT_COLUMN.into(), texts),
        Column::new(TARGET_COLUMN.into(), labels),
    ])?)
}

/// Write bytes produced by `write` to a temporary file next to `path`
fn stage_file<F>(path: &Path, write: F) -> Result<NamedTempFile>
where
    F: FnOnce(&mut NamedTempFile) -> Result<()>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    write(&mut tmp)?;
    tmp.as_file_mut().flush()?;
    Ok(tmp)
}

/// Write bytes produced by `write` to `path` in one step
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut NamedTempFile) -> Result<()>,
{
    stage_file(path, write)?.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Save a DataFrame as CSV, replacing any previous file
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut batch = ArtifactBatch::new();
    batch.stage_csv(df, path)?;
    batch.commit()
}

/// Serialize a value as pretty JSON, replacing any previous file
pub fn write_json<T: serde::Serialize>(value: &T, path: &Path) -> Result<()> {
    let mut batch = ArtifactBatch::new();
    batch.stage_json(value, path)?;
    batch.commit()
}

/// The outputs of one stage, written to temporary files and renamed into
/// place together.
///
/// Dropping a batch without committing removes its temporary files and
/// leaves every target untouched.
#[derive(Debug, Default)]
pub struct ArtifactBatch {
    staged: Vec<(NamedTempFile, PathBuf)>,
}

impl ArtifactBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    pub fn stage<F>(&mut self, path: &Path, write: F) -> Result<()>
    where
        F: FnOnce(&mut NamedTempFile) -> Result<()>,
    {
        let tmp = stage_file(path, write)?;
        self.staged.push((tmp, path.to_path_buf()));
        Ok(())
    }

    pub fn stage_csv(&mut self, df: &mut DataFrame, path: &Path) -> Result<()> {
        self.stage(path, |file| {
            CsvWriter::new(file.as_file_mut()).finish(df)?;
            Ok(())
        })
    }

    pub fn stage_json<T: serde::Serialize>(&mut self, value: &T, path: &Path) -> Result<()> {
        self.stage(path, |file| {
            serde_json::to_writer_pretty(file.as_file_mut(), value)?;
            Ok(())
        })
    }

    /// Rename every staged file over its target.
    ///
    /// If a rename fails, the targets already renamed by this batch are
    /// removed so the stage leaves none of its outputs behind.
    pub fn commit(self) -> Result<()> {
        let mut persisted: Vec<PathBuf> = Vec::with_capacity(self.staged.len());
        for (tmp, path) in self.staged {
            if let Err(e) = tmp.persist(&path) {
                for done in &persisted {
                    if let Err(remove_err) = std::fs::remove_file(done) {
                        warn!(
                            path = %done.display(),
                            error = %remove_err,
                            "could not roll back artifact"
                        );
                    }
                }
                return Err(e.error.into());
            }
            persisted.push(path);
        }
        Ok(())
    }
}

pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = std::fs::File::open(path).map_err(|e| {
        PipelineError::data_load(format!("Failed to open {}: {}", path.display(), e))
    })?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_decode_latin1_fallback() {
        // "caf\xe9" is Latin-1 for "café"
        let bytes = b"caf\xe9";
        assert_eq!(decode_source(bytes), "café");
        assert_eq!(decode_source("plain".as_bytes()), "plain");
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://example.com/spam.csv"));
        assert!(is_remote("http://example.com/spam.csv"));
        assert!(!is_remote("data/spam.csv"));
    }

    #[test]
    fn test_clean_records_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("clean.csv");
        let records = vec![
            CleanRecord::new("free entri", Label::Spam),
            CleanRecord::new("see later", Label::Ham),
        ];

        let mut df = clean_records_to_frame(&records).unwrap();
        write_csv(&mut df, &path).unwrap();

        let loaded = read_clean_records(&path).unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn test_write_atomic_replaces_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");

        write_json(&vec![1, 2, 3], &path).unwrap();
        write_json(&vec![4], &path).unwrap();

        let loaded: Vec<i32> = read_json(&path).unwrap();
        assert_eq!(loaded, vec![4]);
        // Only the target file remains in the directory
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_batch_failure_leaves_no_outputs() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first.json");
        // A directory in the way makes the second rename fail
        let second = dir.path().join("second.json");
        std::fs::create_dir(&second).unwrap();

        let mut batch = ArtifactBatch::new();
        batch.stage_json(&vec![1], &first).unwrap();
        batch.stage_json(&vec![2], &second).unwrap();
        assert_eq!(batch.len(), 2);
        assert!(batch.commit().is_err());

        assert!(!first.exists());
        assert!(second.is_dir());
        // Temporary files are gone too
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_dropped_batch_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");

        let mut batch = ArtifactBatch::new();
        batch.stage_json(&"staged", &path).unwrap();
        drop(batch);

        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
