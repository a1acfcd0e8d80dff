//! Append-only CSV row writer, one file per repository per session.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

pub const SEPARATOR: char = ',';

#[cfg(windows)]
pub const LINE_TERMINATOR: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_TERMINATOR: &str = "\n";

/// Collects fields of the current row and writes whole rows to disk.
///
/// Any I/O failure is logged once and turns the sink into a null sink; the
/// owning repository keeps recording in memory.
#[derive(Debug)]
pub struct CsvSink {
    path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
    row: String,
    rows_written: u64,
}

impl CsvSink {
    /// Opens `<root>/<session_dir>/<file_stem>.csv`, appending `-1`, `-2`, ...
    /// to the stem while a file of that name already exists.
    pub fn create(root: &Path, session_dir: &str, file_stem: &str) -> Self {
        let dir = root.join(session_dir);
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!("Unable to access csv output directory '{}': {}", dir.display(), e);
            return Self::null();
        }

        let path = unique_path(&dir, file_stem);
        match File::create(&path) {
            Ok(file) => {
                debug!("Opened csv stream '{}'", path.display());
                Self {
                    path: Some(path),
                    writer: Some(BufWriter::new(file)),
                    row: String::new(),
                    rows_written: 0,
                }
            }
            Err(e) => {
                warn!("Failed to open csv file '{}': {}", path.display(), e);
                Self::null()
            }
        }
    }

    /// A sink that accepts and drops everything.
    pub fn null() -> Self {
        Self {
            path: None,
            writer: None,
            row: String::new(),
            rows_written: 0,
        }
    }

    pub fn push_field(&mut self, value: &str) {
        self.row.push_str(value);
        self.row.push(SEPARATOR);
    }

    pub fn push_empty(&mut self) {
        self.row.push(SEPARATOR);
    }

    /// Terminates the current row and hands it to the file.
    pub fn end_row(&mut self) {
        if self.row.ends_with(SEPARATOR) {
            self.row.pop();
        }
        self.row.push_str(LINE_TERMINATOR);

        let result = match self.writer.as_mut() {
            Some(writer) => writer.write_all(self.row.as_bytes()),
            None => {
                self.row.clear();
                return;
            }
        };
        match result {
            Ok(()) => self.rows_written += 1,
            Err(e) => {
                warn!("Failed to write csv row to '{}': {}", self.display_path(), e);
                self.writer = None;
            }
        }
        self.row.clear();
    }

    pub fn flush(&mut self) {
        let result = match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => return,
        };
        if let Err(e) = result {
            warn!("Failed to flush csv file '{}': {}", self.display_path(), e);
            self.writer = None;
        }
    }

    /// Flushes and releases the file. Further rows are dropped.
    pub fn close(&mut self) {
        self.flush();
        self.writer = None;
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    fn display_path(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }
}

impl Drop for CsvSink {
    fn drop(&mut self) {
        self.close();
    }
}

fn unique_path(dir: &Path, file_stem: &str) -> PathBuf {
    let mut path = dir.join(format!("{}.csv", file_stem));
    let mut suffix = 1;
    while path.exists() {
        path = dir.join(format!("{}-{}.csv", file_stem, suffix));
        suffix += 1;
    }
    path
}
