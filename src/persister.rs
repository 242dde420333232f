use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use log::info;

use crate::enricher::EnrichedRecord;
use crate::error::Result;

pub const HEADER: [&str; 9] = [
    "title",
    "description",
    "technologies",
    "winner_label",
    "image_url",
    "source_url",
    "primary_category",
    "secondary_category",
    "summary",
];

/// Append-only CSV sink. Opens, appends, and closes the file once per record.
///
/// The header check is not atomic with the write, so only one writer may
/// target a given path at a time.
pub struct CsvPersister {
    path: PathBuf,
}

impl CsvPersister {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        CsvPersister { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &EnrichedRecord) -> Result<()> {
        // An empty file counts as new so a touched-but-unwritten target still gets a header.
        let needs_header = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            csv_writer.write_record(HEADER)?;
        }
        csv_writer.write_record(row(record))?;
        csv_writer.flush()?;

        info!("Saved project: {} to {}", record.project.title, self.path.display());
        Ok(())
    }
}

fn row(record: &EnrichedRecord) -> [String; 9] {
    let p = &record.project;
    [
        p.title.clone(),
        p.description.clone(),
        p.technologies_joined(),
        p.winner_label.clone(),
        p.image_url.clone(),
        p.source_url.clone(),
        record.primary_category.clone(),
        record.secondary_category.clone(),
        record.summary.clone(),
    ]
}
