// Copyright 2024 Felix Engl
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::io::{ErrorWithPath, ToErrorWithPath};
use crate::uniq::{UniqFilterError, UriUniqFilter};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};

/// Prefix of a line that records a forgotten key.
pub const FORGET_PREFIX: &str = "-\t";

/// An append-only log of every key handed to a filter, one per line.
/// A forgotten key is recorded as [FORGET_PREFIX] followed by the key.
/// Can be replayed into a fresh filter with [ProcessedKeyLog::replay].
///
/// Only keys accepted by [ProcessedKeyLog::check_key] can be logged, so that
/// every line reads back as exactly the key that was written.
#[derive(Debug)]
pub struct ProcessedKeyLog {
    path: Utf8PathBuf,
    writer: BufWriter<File>,
}

impl ProcessedKeyLog {
    /// Opens [path] for appending, creating it and its parent folders if necessary.
    pub fn open(path: impl AsRef<Utf8Path>) -> Result<Self, ErrorWithPath> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).to_error_with_path(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .to_error_with_path(path)?;
        log::debug!("Logging processed keys to {path}.");
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Fails for empty keys, keys with control characters and keys with
    /// leading or trailing whitespace.
    pub fn check_key(key: &str) -> Result<(), UniqFilterError> {
        if key.is_empty() || key.trim() != key || key.chars().any(char::is_control) {
            return Err(UniqFilterError::UnloggableKey(key.to_string()));
        }
        Ok(())
    }

    /// Records that [key] was processed.
    pub fn append(&mut self, key: &str) -> Result<(), UniqFilterError> {
        self.write_line("", key)
    }

    /// Records that [key] was forgotten.
    pub fn append_forget(&mut self, key: &str) -> Result<(), UniqFilterError> {
        self.write_line(FORGET_PREFIX, key)
    }

    fn write_line(&mut self, prefix: &str, key: &str) -> Result<(), UniqFilterError> {
        Self::check_key(key)?;
        self.writer
            .write_all(prefix.as_bytes())
            .and_then(|_| self.writer.write_all(key.as_bytes()))
            .and_then(|_| self.writer.write_all(b"\n"))
            .to_error_with_path(&self.path)
            .map_err(UniqFilterError::ProcessedKeyLog)
    }

    pub fn flush(&mut self) -> Result<(), ErrorWithPath> {
        self.writer.flush().to_error_with_path(&self.path)
    }

    /// Notes every key in the log at [path] in [filter] and forgets the
    /// forgotten ones, in log order. Blank lines are skipped.
    /// Returns the number of records read.
    pub fn replay<U: UriUniqFilter + ?Sized>(
        path: impl AsRef<Utf8Path>,
        filter: &mut U,
    ) -> Result<u64, UniqFilterError> {
        let path = path.as_ref();
        let file = File::open(path)
            .to_error_with_path(path)
            .map_err(UniqFilterError::ProcessedKeyLog)?;
        let mut replayed = 0u64;
        for line in BufReader::new(file).lines() {
            let line = line
                .to_error_with_path(path)
                .map_err(UniqFilterError::ProcessedKeyLog)?;
            if line.trim().is_empty() {
                continue;
            }
            match line.strip_prefix(FORGET_PREFIX) {
                Some(key) => {
                    filter.forget(key)?;
                }
                None => filter.note(&line)?,
            }
            replayed += 1;
        }
        log::info!("Replayed {replayed} records from {path}.");
        Ok(replayed)
    }
}

impl Drop for ProcessedKeyLog {
    fn drop(&mut self) {
        if let Err(err) = self.writer.flush() {
            log::warn!("Failed to flush the processed key log {}: {err}", self.path);
        }
    }
}
