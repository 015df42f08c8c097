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

use crate::fpset::table::{validate_table_parameters, ProbingTable};
use crate::fpset::{FingerprintSet, FpSetError};
use crate::io::{ErrorWithPath, ToErrorWithPath};
use byteorder::{BigEndian, ByteOrder};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::time::Instant;

/// The default capacity exponent of a [DiskFpSet]
pub const DEFAULT_DISK_CAPACITY_POWER_OF_TWO: u32 = 4;
/// The default load factor of a [DiskFpSet]
pub const DEFAULT_DISK_LOAD_FACTOR: f32 = 0.75;

/// One status byte followed by the big endian fingerprint.
pub const RECORD_LEN: u64 = 9;

/// The largest capacity exponent of a [DiskFpSet] whose file length still fits in a u64.
pub const MAX_DISK_CAPACITY_POWER_OF_TWO: u32 = 60;

const STATUS_EMPTY: u8 = 0;
const STATUS_OCCUPIED: u8 = 1;

/// An open addressing fingerprint set in a file of fixed 9-byte records.
///
/// The file has no header, the capacity is implied by its length. A zeroed
/// file is an empty table. Opening a path always truncates it.
#[derive(Debug)]
pub struct DiskFpSet {
    path: Utf8PathBuf,
    file: File,
    capacity_power_of_two: u32,
    load_factor: f32,
    entries: u64,
}

impl DiskFpSet {
    /// Creates a fresh table at [path], discarding anything that was there.
    pub fn create(
        path: impl AsRef<Utf8Path>,
        capacity_power_of_two: u32,
        load_factor: f32,
    ) -> Result<Self, FpSetError> {
        validate_table_parameters(capacity_power_of_two, load_factor)?;
        Self::allocate(path.as_ref(), capacity_power_of_two, load_factor)
    }

    fn allocate(
        path: &Utf8Path,
        capacity_power_of_two: u32,
        load_factor: f32,
    ) -> Result<Self, FpSetError> {
        let len = file_len(capacity_power_of_two).ok_or(FpSetError::InvalidCapacity(
            capacity_power_of_two,
            MAX_DISK_CAPACITY_POWER_OF_TWO,
        ))?;
        if let Some(parent) = path.parent() {
            if !parent.as_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).to_error_with_path(parent)?;
            }
        }
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .to_error_with_path(path)?;
        file.set_len(len).to_error_with_path(path)?;
        log::debug!("Created {path} with 2^{capacity_power_of_two} slots.");
        Ok(Self {
            path: path.to_path_buf(),
            file,
            capacity_power_of_two,
            load_factor,
            entries: 0,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// The number of slots.
    pub fn capacity(&self) -> u64 {
        ProbingTable::capacity(self)
    }

    fn growth_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("{}.grow", self.path))
    }

    /// Builds the doubled table at [target] by scanning the current file once.
    fn rehash_into(&self, target: &Utf8Path) -> Result<Self, FpSetError> {
        let mut grown = Self::allocate(target, self.capacity_power_of_two + 1, self.load_factor)?;
        let mut source = &self.file;
        source
            .seek(SeekFrom::Start(0))
            .to_error_with_path(&self.path)?;
        let mut reader = BufReader::new(source);
        let mut record = [0u8; RECORD_LEN as usize];
        for _ in 0..self.capacity() {
            reader
                .read_exact(&mut record)
                .to_error_with_path(&self.path)?;
            if record[0] == STATUS_OCCUPIED {
                grown.place(BigEndian::read_u64(&record[1..]))?;
            }
        }
        grown.file.sync_all().to_error_with_path(target)?;
        Ok(grown)
    }

    fn read_record(&self, index: u64) -> Result<[u8; RECORD_LEN as usize], ErrorWithPath> {
        let mut file = &self.file;
        let mut record = [0u8; RECORD_LEN as usize];
        file.seek(SeekFrom::Start(index * RECORD_LEN))
            .to_error_with_path(&self.path)?;
        file.read_exact(&mut record)
            .to_error_with_path(&self.path)?;
        Ok(record)
    }

    fn write_record(&self, index: u64, record: &[u8]) -> Result<(), ErrorWithPath> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(index * RECORD_LEN))
            .to_error_with_path(&self.path)?;
        file.write_all(record).to_error_with_path(&self.path)
    }
}

/// The length of a table file with 2^[capacity_power_of_two] records,
/// [None] above [MAX_DISK_CAPACITY_POWER_OF_TWO].
fn file_len(capacity_power_of_two: u32) -> Option<u64> {
    if capacity_power_of_two > MAX_DISK_CAPACITY_POWER_OF_TWO {
        return None;
    }
    1u64.checked_shl(capacity_power_of_two)?.checked_mul(RECORD_LEN)
}

impl ProbingTable for DiskFpSet {
    fn capacity_power_of_two(&self) -> u32 {
        self.capacity_power_of_two
    }

    fn load_factor(&self) -> f32 {
        self.load_factor
    }

    fn entries(&self) -> u64 {
        self.entries
    }

    fn set_entries(&mut self, entries: u64) {
        self.entries = entries;
    }

    fn slot(&self, index: u64) -> Result<Option<u64>, FpSetError> {
        let record = self.read_record(index)?;
        Ok((record[0] == STATUS_OCCUPIED).then(|| BigEndian::read_u64(&record[1..])))
    }

    fn set_at(&mut self, index: u64, fp: u64) -> Result<(), FpSetError> {
        let mut record = [STATUS_OCCUPIED; RECORD_LEN as usize];
        BigEndian::write_u64(&mut record[1..], fp);
        Ok(self.write_record(index, &record)?)
    }

    fn clear_at(&mut self, index: u64) -> Result<(), FpSetError> {
        Ok(self.write_record(index, &[STATUS_EMPTY])?)
    }

    /// Doubles the file. On failure the old file and state stay untouched.
    fn make_space(&mut self) -> Result<(), FpSetError> {
        let next = self.capacity_power_of_two + 1;
        if file_len(next).is_none() {
            return Err(FpSetError::CapacityExhausted(self.capacity_power_of_two));
        }
        log::info!(
            "Grow {} from 2^{} to 2^{next} slots with {} entries.",
            self.path,
            self.capacity_power_of_two,
            self.entries
        );
        let started = Instant::now();
        let target = self.growth_path();
        let mut grown = match self.rehash_into(&target) {
            Ok(grown) => grown,
            Err(err) => {
                log::error!("Growing {} failed, keeping the old table: {err}", self.path);
                let _ = std::fs::remove_file(&target);
                return Err(err);
            }
        };
        if let Err(err) = std::fs::rename(&target, &self.path) {
            log::error!("Replacing {} failed, keeping the old table: {err}", self.path);
            let _ = std::fs::remove_file(&target);
            return Err(ErrorWithPath::new(self.path.clone(), err).into());
        }
        grown.path = self.path.clone();
        *self = grown;
        log::debug!("Grew {} in {:?}.", self.path, started.elapsed());
        Ok(())
    }
}

impl FingerprintSet for DiskFpSet {
    fn contains(&mut self, fp: u64) -> Result<bool, FpSetError> {
        self.table_contains(fp)
    }

    fn add(&mut self, fp: u64) -> Result<bool, FpSetError> {
        self.table_add(fp)
    }

    fn remove(&mut self, fp: u64) -> Result<bool, FpSetError> {
        self.table_remove(fp)
    }

    fn count(&self) -> u64 {
        self.entries
    }

    fn flush(&mut self) -> Result<(), FpSetError> {
        Ok(self.file.sync_data().to_error_with_path(&self.path)?)
    }
}
