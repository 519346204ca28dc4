//! Dated CSV log storage.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::sanitize::PageViewRow;

pub const CSV_HEADER: &str = "clickTime,pageUrl,h1Text,pageTitle\n";

const FILE_SUFFIX: &str = "_clicked_data.csv";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One CSV file per server-local day, each starting with [`CSV_HEADER`].
/// Appends are serialized so concurrent requests never interleave lines.
#[derive(Debug)]
pub struct DailyCsvLog {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl DailyCsvLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<YYYY-MM-DD>_clicked_data.csv`
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}{FILE_SUFFIX}", date.format("%Y-%m-%d")))
    }

    pub fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// Make sure today's file exists with its header.
    pub async fn ensure_header(&self) -> Result<PathBuf, StoreError> {
        let _guard = self.write_lock.lock().await;
        self.ensure_header_for(Self::today()).await
    }

    /// Append `row` to today's file, creating it (with header) if needed.
    pub async fn append(&self, row: &PageViewRow) -> Result<PathBuf, StoreError> {
        self.append_on(Self::today(), row).await
    }

    pub async fn append_on(&self, date: NaiveDate, row: &PageViewRow) -> Result<PathBuf, StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.ensure_header_for(date).await?;

        let write_err = |source| StoreError::Write {
            path: path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .append(true)
            .open(&path)
            .await
            .map_err(write_err)?;
        file.write_all(row.to_csv_line().as_bytes())
            .await
            .map_err(write_err)?;
        file.flush().await.map_err(write_err)?;
        Ok(path)
    }

    async fn ensure_header_for(&self, date: NaiveDate) -> Result<PathBuf, StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::CreateDir {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.path_for(date);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(mut file) => {
                info!(path = %path.display(), "Creating new CSV log");
                file.write_all(CSV_HEADER.as_bytes())
                    .await
                    .map_err(|source| StoreError::Write {
                        path: path.clone(),
                        source,
                    })?;
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "CSV log already present");
            }
            Err(source) => return Err(StoreError::Write { path, source }),
        }
        Ok(path)
    }
}
