//! Output-directory implementation of the record sink
//!
//! Layout under the output directory:
//!
//! | file | content |
//! |------|---------|
//! | `data.csv` | one row per record, header row first |
//! | `skippedpages.txt` | space separated page numbers |
//! | `skippedlinks.txt` | one item link per line |
//! | `last.txt` | page number of the last fatal failure |

use crate::checkpoint::traits::{CheckpointError, CheckpointResult, RecordSink};
use crate::state::Record;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

pub const DATASET_FILE: &str = "data.csv";
pub const SKIPPED_PAGES_FILE: &str = "skippedpages.txt";
pub const SKIPPED_ITEMS_FILE: &str = "skippedlinks.txt";
pub const RESUME_MARKER_FILE: &str = "last.txt";

/// Record sink writing plain files into one directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Creates a sink for `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_of(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    fn ensure_dir(&self) -> CheckpointResult<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    fn write_file(&self, file: &str, content: &str) -> CheckpointResult<()> {
        self.ensure_dir()?;
        fs::write(self.path_of(file), content)?;
        Ok(())
    }

    /// Removes a file, succeeding when it is already gone
    fn remove_file(&self, file: &str) -> CheckpointResult<()> {
        match fs::remove_file(self.path_of(file)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Reads a file, `None` when it does not exist
    fn read_file(&self, file: &str) -> CheckpointResult<Option<String>> {
        match fs::read_to_string(self.path_of(file)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl RecordSink for DirectorySink {
    fn write_dataset(&mut self, records: &[Record]) -> CheckpointResult<()> {
        self.ensure_dir()?;
        let mut writer = csv::Writer::from_path(self.path_of(DATASET_FILE))?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_skipped_pages(&mut self, pages: &[u32]) -> CheckpointResult<()> {
        let content = pages
            .iter()
            .map(|page| page.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        self.write_file(SKIPPED_PAGES_FILE, &content)
    }

    fn write_skipped_items(&mut self, links: &[String]) -> CheckpointResult<()> {
        let mut content = String::new();
        for link in links {
            content.push_str(link);
            content.push('\n');
        }
        self.write_file(SKIPPED_ITEMS_FILE, &content)
    }

    fn clear_skipped_pages(&mut self) -> CheckpointResult<()> {
        self.remove_file(SKIPPED_PAGES_FILE)
    }

    fn clear_skipped_items(&mut self) -> CheckpointResult<()> {
        self.remove_file(SKIPPED_ITEMS_FILE)
    }

    fn write_resume_marker(&mut self, page: u32) -> CheckpointResult<()> {
        self.write_file(RESUME_MARKER_FILE, &page.to_string())
    }

    fn clear_resume_marker(&mut self) -> CheckpointResult<()> {
        self.remove_file(RESUME_MARKER_FILE)
    }

    fn load_dataset(&self) -> CheckpointResult<Vec<Record>> {
        let path = self.path_of(DATASET_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(path)?;
        let mut records = Vec::new();
        for row in reader.deserialize() {
            records.push(row?);
        }
        Ok(records)
    }

    fn load_skipped_pages(&self) -> CheckpointResult<Vec<u32>> {
        let content = match self.read_file(SKIPPED_PAGES_FILE)? {
            Some(content) => content,
            None => return Ok(Vec::new()),
        };

        content
            .split_whitespace()
            .map(|token| {
                token.parse().map_err(|_| CheckpointError::Malformed {
                    file: SKIPPED_PAGES_FILE.to_string(),
                    message: format!("'{}' is not a page number", token),
                })
            })
            .collect()
    }

    fn load_skipped_items(&self) -> CheckpointResult<Vec<String>> {
        Ok(self
            .read_file(SKIPPED_ITEMS_FILE)?
            .map(|content| {
                content
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default())
    }

    fn load_resume_marker(&self) -> CheckpointResult<Option<u32>> {
        let content = match self.read_file(RESUME_MARKER_FILE)? {
            Some(content) => content,
            None => return Ok(None),
        };

        content
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CheckpointError::Malformed {
                file: RESUME_MARKER_FILE.to_string(),
                message: format!("'{}' is not a page number", content.trim()),
            })
    }
}
