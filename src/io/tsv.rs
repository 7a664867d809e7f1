/*!
# Tab-separated sample store

Each row of the table is one parameter vector; the optional first row holds the
parameter labels. Values are written with their default `Display`
representation.

```text
beta	gamma	mu	log10_s0
0.31	0.1	0.01	4
0.3104	0.0991	0.0103	4.02
```

Rows are flushed one at a time, so an interrupted run leaves a readable prefix.
*/

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Writer, WriterBuilder};
use log::{debug, warn};
use ndarray::Array2;

use crate::error::{Error, Result};
use crate::io::SampleSink;

const DELIMITER: u8 = b'\t';

/// Append-only writer for a sample table.
pub struct TsvSampleWriter {
    writer: Writer<File>,
    path: PathBuf,
    n_columns: usize,
    rows_written: usize,
}

impl TsvSampleWriter {
    /**
    Opens the table at `path` for writing.

    With `overwrite` the file is truncated and a header row with `labels` is
    written. Otherwise rows are appended to whatever the file already holds and
    no header is written; keeping the columns compatible with the existing rows
    is up to the caller.

    # Example

    ```rust
    use epi_mcmc::io::{SampleSink, TsvSampleWriter};

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("mcmc.csv");
    let labels = vec!["a".to_string(), "b".to_string()];

    let mut writer = TsvSampleWriter::create(&path, &labels, true)?;
    writer.write_sample(&[1.5, 2.0])?;
    writer.finish()?;

    assert_eq!(std::fs::read_to_string(&path)?, "a\tb\n1.5\t2\n");
    # Ok::<(), Box<dyn std::error::Error>>(())
    ```
    */
    pub fn create<P: AsRef<Path>>(path: P, labels: &[String], overwrite: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = if overwrite {
            File::create(&path)?
        } else {
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            if file.metadata()?.len() == 0 {
                warn!(
                    "appending to empty sample table {} without a header row",
                    path.display()
                );
            }
            file
        };

        let mut writer = WriterBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(false)
            .from_writer(file);

        if overwrite {
            writer.write_record(labels)?;
            writer.flush()?;
        }
        debug!(
            "opened sample table {} ({} columns, overwrite={})",
            path.display(),
            labels.len(),
            overwrite
        );

        Ok(Self {
            writer,
            path,
            n_columns: labels.len(),
            rows_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of data rows written through this writer.
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Flushes and closes the file.
    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl SampleSink for TsvSampleWriter {
    fn write_sample(&mut self, sample: &[f64]) -> Result<()> {
        if sample.len() != self.n_columns {
            return Err(Error::DimensionMismatch {
                what: "sample row",
                expected: self.n_columns,
                got: sample.len(),
            });
        }
        self.writer
            .write_record(sample.iter().map(|v| v.to_string()))?;
        self.writer.flush()?;
        self.rows_written += 1;
        Ok(())
    }
}

/// A sample table read back into memory.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTable {
    pub labels: Vec<String>,
    /// One row per stored step, one column per label.
    pub values: Array2<f64>,
}

/// Reads a sample table written by [`TsvSampleWriter`]. The first line must be
/// the header.
pub fn read_samples<P: AsRef<Path>>(path: P) -> Result<SampleTable> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .from_path(path)?;

    let labels: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if labels.is_empty() || labels.iter().all(|l| l.is_empty()) {
        return Err(Error::MissingHeader(path.to_path_buf()));
    }
    let n_columns = labels.len();

    let mut flat = Vec::new();
    let mut n_rows = 0;
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        for (column, field) in record.iter().enumerate() {
            let value = field.trim().parse::<f64>().map_err(|_| Error::ParseValue {
                line,
                column,
                value: field.to_string(),
            })?;
            flat.push(value);
        }
        n_rows += 1;
    }

    let values = Array2::from_shape_vec((n_rows, n_columns), flat)?;
    debug!(
        "read {} rows x {} columns from {}",
        n_rows,
        n_columns,
        path.display()
    );
    Ok(SampleTable { labels, values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::NamedTempFile;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn overwrite_writes_header_then_rows() {
        let file = NamedTempFile::new().expect("Could not create temp file");
        fs::write(file.path(), "stale\ncontent\n").unwrap();

        let mut writer = TsvSampleWriter::create(file.path(), &labels(&["p1", "p2"]), true).unwrap();
        writer.write_sample(&[1.0, -0.25]).unwrap();
        writer.write_sample(&[3.5, 1e-7]).unwrap();
        assert_eq!(writer.rows_written(), 2);
        writer.finish().unwrap();

        let contents = fs::read_to_string(file.path()).unwrap();
        assert_eq!(contents, "p1\tp2\n1\t-0.25\n3.5\t0.0000001\n");
    }

    #[test]
    fn append_keeps_existing_rows_and_skips_header() {
        let file = NamedTempFile::new().expect("Could not create temp file");
        let names = labels(&["x"]);

        let mut writer = TsvSampleWriter::create(file.path(), &names, true).unwrap();
        writer.write_sample(&[1.0]).unwrap();
        writer.finish().unwrap();

        let mut writer = TsvSampleWriter::create(file.path(), &names, false).unwrap();
        writer.write_sample(&[2.0]).unwrap();
        writer.finish().unwrap();

        let contents = fs::read_to_string(file.path()).unwrap();
        assert_eq!(contents, "x\n1\n2\n");
    }

    #[test]
    fn rejects_rows_of_wrong_width() {
        let file = NamedTempFile::new().expect("Could not create temp file");
        let mut writer = TsvSampleWriter::create(file.path(), &labels(&["a", "b"]), true).unwrap();
        let err = writer.write_sample(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 2,
                got: 1,
                ..
            }
        ));
        assert_eq!(writer.rows_written(), 0);
    }

    #[test]
    fn reads_back_what_was_written() {
        let file = NamedTempFile::new().expect("Could not create temp file");
        let mut writer =
            TsvSampleWriter::create(file.path(), &labels(&["beta", "gamma"]), true).unwrap();
        writer.write_sample(&[0.1, 0.2]).unwrap();
        writer.write_sample(&[0.3, 0.4]).unwrap();
        writer.write_sample(&[0.5, 0.6]).unwrap();
        writer.finish().unwrap();

        let table = read_samples(file.path()).unwrap();
        assert_eq!(table.labels, labels(&["beta", "gamma"]));
        assert_eq!(table.values.shape(), &[3, 2]);
        assert_eq!(table.values[[2, 1]], 0.6);
    }

    #[test]
    fn header_only_table_has_no_rows() {
        let file = NamedTempFile::new().expect("Could not create temp file");
        fs::write(file.path(), "a\tb\tc\n").unwrap();
        let table = read_samples(file.path()).unwrap();
        assert_eq!(table.values.shape(), &[0, 3]);
    }

    #[test]
    fn reports_unparseable_field() {
        let file = NamedTempFile::new().expect("Could not create temp file");
        fs::write(file.path(), "a\tb\n1\t2\n3\tfoo\n").unwrap();
        match read_samples(file.path()).unwrap_err() {
            Error::ParseValue {
                line,
                column,
                value,
            } => {
                assert_eq!(line, 3);
                assert_eq!(column, 1);
                assert_eq!(value, "foo");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let file = NamedTempFile::new().expect("Could not create temp file");
        fs::write(file.path(), "a\tb\n1\t2\n3\n").unwrap();
        assert!(matches!(read_samples(file.path()), Err(Error::Csv(_))));
    }

    #[test]
    fn empty_file_has_no_header() {
        let file = NamedTempFile::new().expect("Could not create temp file");
        assert!(matches!(
            read_samples(file.path()),
            Err(Error::MissingHeader(_))
        ));
    }
}
