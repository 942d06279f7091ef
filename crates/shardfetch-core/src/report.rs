//! JSON Lines failure report.
//!
//! The log stream is advisory only; this writer gives callers a structured,
//! one-record-per-line list of the items that failed.

use serde::Serialize;
use std::io::{self, Write};

use crate::error::ItemError;
use crate::types::WorkItem;

/// One failed work item.
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub identifier: String,
    pub url: String,
    pub stage: String,
    pub error: String,
}

impl FailureRecord {
    pub fn new(item: &WorkItem, error: &ItemError) -> Self {
        Self {
            identifier: item.identifier.clone(),
            url: item.source_url.clone(),
            stage: error.stage().to_string(),
            error: error.to_string(),
        }
    }
}

/// A writer that serializes records as JSON Lines.
pub struct ReportWriter<W: Write> {
    writer: W,
    records_written: usize,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            records_written: 0,
        }
    }

    /// Write one record on its own line.
    pub fn write<T: Serialize>(&mut self, record: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record).map_err(io::Error::other)?;
        writeln!(self.writer)?;
        self.records_written += 1;
        Ok(())
    }

    /// Get the number of records written.
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Consume the writer and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
