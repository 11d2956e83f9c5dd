use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use fs2::FileExt;

use super::models::{AddOutcome, PhoneNumber};
use crate::errors::StoreError;

/// Async-friendly handle around the numbers file.
///
/// Every operation runs on a blocking thread while holding one process-wide
/// mutex, so read-modify-write cycles from the web handlers, the dialer and
/// the CLI never interleave inside a process. Rewrites additionally hold an
/// exclusive advisory lock on the file itself for cross-process safety.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<Mutex<NumberFile>>,
}

impl StoreHandle {
    pub fn new(file: NumberFile) -> Self {
        Self {
            inner: Arc::new(Mutex::new(file)),
        }
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(NumberFile::new(path))
    }

    /// Run a closure with access to the file on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&NumberFile) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let file = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = file.lock().map_err(|_| StoreError::LockPoisoned)?;
            f(&guard)
        })
        .await
        .map_err(|_| StoreError::TaskPanicked)?
    }

    pub async fn list(&self) -> Result<Vec<PhoneNumber>, StoreError> {
        self.call(|f| f.list()).await
    }

    pub async fn add(&self, raw: &str) -> Result<(PhoneNumber, AddOutcome), StoreError> {
        let number = PhoneNumber::parse(raw)?;
        let outcome = {
            let number = number.clone();
            self.call(move |f| f.add(&number)).await?
        };
        Ok((number, outcome))
    }

    pub async fn remove(&self, number: &str) -> Result<bool, StoreError> {
        let number = number.to_string();
        self.call(move |f| f.remove(&number)).await
    }

}

/// The newline-delimited numbers file. One record per line, insertion order.
pub struct NumberFile {
    path: PathBuf,
}

impl NumberFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All valid records in file order. Blank lines are ignored and malformed
    /// lines are logged and skipped. A missing file is an empty list.
    pub fn list(&self) -> Result<Vec<PhoneNumber>, StoreError> {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.read_err(e)),
        };
        FileExt::lock_shared(&file).map_err(|e| self.read_err(e))?;
        let mut content = Vec::new();
        file.read_to_end(&mut content)
            .map_err(|e| self.read_err(e))?;
        Ok(self.parse_lines(&content))
    }

    /// Append `number` unless it is already present.
    pub fn add(&self, number: &PhoneNumber) -> Result<AddOutcome, StoreError> {
        let outcome = self.mutate(|numbers| {
            if numbers.contains(number) {
                false
            } else {
                numbers.push(number.clone());
                true
            }
        })?;
        if outcome {
            tracing::info!(%number, "number added");
            Ok(AddOutcome::Added)
        } else {
            tracing::warn!(%number, "number already present, not added");
            Ok(AddOutcome::AlreadyPresent)
        }
    }

    /// Drop `number` from the list. Returns false, leaving the file untouched,
    /// when it was not there.
    pub fn remove(&self, number: &str) -> Result<bool, StoreError> {
        if !self.path.exists() {
            return Ok(false);
        }
        let removed = self.mutate(|numbers| {
            match numbers.iter().position(|n| n.as_str() == number) {
                Some(idx) => {
                    numbers.remove(idx);
                    true
                }
                None => false,
            }
        })?;
        if removed {
            tracing::info!(number, "number removed");
        } else {
            tracing::debug!(number, "remove requested for absent number");
        }
        Ok(removed)
    }

    /// Read, modify and rewrite the file under one exclusive lock. `f` returns
    /// whether it changed anything; unchanged lists are not written back.
    fn mutate<F>(&self, f: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut Vec<PhoneNumber>) -> bool,
    {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| self.write_err(e))?;
        FileExt::lock_exclusive(&file).map_err(|e| self.write_err(e))?;

        let mut content = Vec::new();
        file.read_to_end(&mut content)
            .map_err(|e| self.read_err(e))?;
        let mut numbers = self.parse_lines(&content);

        if !f(&mut numbers) {
            return Ok(false);
        }

        let mut out = String::with_capacity(numbers.len() * 16);
        for n in &numbers {
            out.push_str(n.as_str());
            out.push('\n');
        }
        file.seek(SeekFrom::Start(0))
            .and_then(|_| file.set_len(0))
            .and_then(|_| file.write_all(out.as_bytes()))
            .and_then(|_| file.flush())
            .map_err(|e| self.write_err(e))?;
        Ok(true)
    }

    /// Lines are decoded one at a time so a single non-UTF-8 line is skipped
    /// like any other malformed record.
    fn parse_lines(&self, content: &[u8]) -> Vec<PhoneNumber> {
        let mut numbers = Vec::new();
        for (idx, raw) in content.split(|b| *b == b'\n').enumerate() {
            let line = match std::str::from_utf8(raw) {
                Ok(line) => line.trim(),
                Err(_) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = idx + 1,
                        value = %String::from_utf8_lossy(raw),
                        "skipping line that is not valid UTF-8"
                    );
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }
            match PhoneNumber::parse(line) {
                Ok(n) => numbers.push(n),
                Err(_) => tracing::warn!(
                    path = %self.path.display(),
                    line = idx + 1,
                    value = line,
                    "skipping invalid phone number"
                ),
            }
        }
        numbers
    }

    fn read_err(&self, source: std::io::Error) -> StoreError {
        StoreError::ReadFailed {
            path: self.path.clone(),
            source,
        }
    }

    fn write_err(&self, source: std::io::Error) -> StoreError {
        StoreError::WriteFailed {
            path: self.path.clone(),
            source,
        }
    }
}
