//! JSON storage for the task document
//!
//! The whole collection lives in one pretty-printed JSON file. A sidecar
//! `<file>.lock` is locked with `fs2`: shared while reading, exclusive for
//! writes and for the full load, edit and save cycle of [`TaskStore::modify`].

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use fs2::FileExt;

use crate::domain::TaskCollection;

/// Store for the task document
#[derive(Debug, Clone)]
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    /// Creates a store for the document at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of the sidecar lock file
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "tasks.json".into());
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "tasks.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Opens the lock file, creating it and its directory if needed
    fn open_lock(&self) -> Result<File> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory: {}", parent.display())
                })?;
            }
        }

        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))
    }

    /// Reads the document; a missing or blank file is an empty collection
    pub fn read(&self) -> Result<TaskCollection> {
        if !self.path.exists() {
            return Ok(TaskCollection::default());
        }

        let lock = self.open_lock()?;
        lock.lock_shared()
            .context("Failed to acquire read lock on tasks file")?;

        // Lock is released when `lock` is dropped
        self.read_unlocked()
    }

    /// Writes the document, stamping `metadata.updatedAt`
    pub fn write(&self, collection: &mut TaskCollection) -> Result<()> {
        let lock = self.open_lock()?;
        lock.lock_exclusive()
            .context("Failed to acquire write lock on tasks file")?;

        self.write_unlocked(collection)
    }

    /// Loads, edits and saves the document under one exclusive lock
    ///
    /// Nothing is written when `edit` fails or leaves the collection as it
    /// was.
    pub fn modify<T, F>(&self, edit: F) -> Result<T>
    where
        F: FnOnce(&mut TaskCollection) -> Result<T>,
    {
        let lock = self.open_lock()?;
        lock.lock_exclusive()
            .context("Failed to acquire write lock on tasks file")?;

        let mut collection = self.read_unlocked()?;
        let before = collection.clone();

        let value = edit(&mut collection)?;

        if collection != before {
            self.write_unlocked(&mut collection)?;
        }
        Ok(value)
    }

    fn read_unlocked(&self) -> Result<TaskCollection> {
        if !self.path.exists() {
            return Ok(TaskCollection::default());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read tasks file: {}", self.path.display()))?;

        if content.trim().is_empty() {
            return Ok(TaskCollection::default());
        }

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse tasks file: {}", self.path.display()))
    }

    fn write_unlocked(&self, collection: &mut TaskCollection) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory: {}", parent.display())
                })?;
            }
        }

        collection.metadata.updated_at = Some(Utc::now());

        // Write to temp file first
        let temp_path = self.temp_path();
        {
            let file = File::create(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, collection)
                .context("Failed to serialize tasks")?;
            writeln!(writer).context("Failed to write tasks file")?;
            writer.flush().context("Failed to flush tasks file")?;
        }

        // Atomic rename
        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }
}
