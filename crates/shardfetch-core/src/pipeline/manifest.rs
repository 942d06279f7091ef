//! CSV manifest reading and the producer that feeds the work queue.
//!
//! The manifest is a comma-delimited UTF-8 table with a header row. Only the
//! `ImageID` and `OriginalURL` columns are read; any other columns are ignored.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::channel::QueueSender;
use crate::error::ManifestError;
use crate::types::WorkItem;

/// Header of the identifier column.
pub const ID_COLUMN: &str = "ImageID";
/// Header of the source URL column.
pub const URL_COLUMN: &str = "OriginalURL";

/// A streaming reader over manifest rows.
pub struct Manifest<R: Read> {
    reader: csv::Reader<R>,
    id_index: usize,
    url_index: usize,
}

impl Manifest<File> {
    /// Open a manifest file and validate its header row.
    pub fn open(path: &Path) -> Result<Self, ManifestError> {
        let file = File::open(path).map_err(|source| ManifestError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }
}

impl<R: Read> Manifest<R> {
    /// Wrap any reader, reading and validating the header row immediately.
    pub fn from_reader(reader: R) -> Result<Self, ManifestError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader.headers().map_err(|e| format_error(&e))?;
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| ManifestError::Format {
                    line: 1,
                    message: format!("missing required column {name:?}"),
                })
        };
        let id_index = find(ID_COLUMN)?;
        let url_index = find(URL_COLUMN)?;

        Ok(Self {
            reader,
            id_index,
            url_index,
        })
    }

    /// Iterate work items in file order.
    ///
    /// A row that lacks either required field, or that the CSV parser rejects,
    /// yields `ManifestError::Format`. Callers should stop at the first error.
    pub fn into_items(self) -> impl Iterator<Item = Result<WorkItem, ManifestError>> {
        let Self {
            reader,
            id_index,
            url_index,
        } = self;

        reader.into_records().map(move |record| {
            let record = record.map_err(|e| format_error(&e))?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            match (record.get(id_index), record.get(url_index)) {
                (Some(identifier), Some(url)) => Ok(WorkItem::new(identifier, url)),
                _ => Err(ManifestError::Format {
                    line,
                    message: format!(
                        "row has {} fields, missing {ID_COLUMN} or {URL_COLUMN}",
                        record.len()
                    ),
                }),
            }
        })
    }
}

fn format_error(e: &csv::Error) -> ManifestError {
    ManifestError::Format {
        line: e.position().map(|p| p.line()).unwrap_or(0),
        message: e.to_string(),
    }
}

/// Streams manifest rows into the work queue.
pub struct ManifestProducer<R: Read> {
    manifest: Manifest<R>,
}

impl<R: Read> ManifestProducer<R> {
    pub fn new(manifest: Manifest<R>) -> Self {
        Self { manifest }
    }

    /// Push every row onto `queue`, blocking while it is full.
    ///
    /// Runs on a blocking thread. Consumes the sender, so the queue closes as
    /// soon as this returns, whether the manifest was read to the end or a
    /// malformed row stopped it. Returns the number of items enqueued.
    pub fn produce(self, queue: QueueSender) -> Result<u64, ManifestError> {
        let mut enqueued = 0u64;
        for item in self.manifest.into_items() {
            let item = item?;
            if let Err(item) = queue.push_blocking(item) {
                tracing::warn!(
                    "All workers exited; dropping {} and the rest of the manifest",
                    item.identifier
                );
                break;
            }
            enqueued += 1;
            tracing::debug!("queue_size = {}", queue.depth());
        }
        tracing::debug!("Manifest exhausted after {} items, closing queue", enqueued);
        Ok(enqueued)
    }
}
