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

//! The open addressing shared by the memory, disk and cache tables.
//!
//! The capacity is always a power of two. Fingerprints are assumed to be well
//! distributed, so the start slot of a value is just its high-order bits.
//! Collisions are resolved by linear probing with wrap-around, removals by
//! backward-shift compaction, so no tombstones exist.

use crate::fpset::FpSetError;

/// The largest supported capacity exponent.
pub const MAX_CAPACITY_POWER_OF_TWO: u32 = 62;

/// The result of probing for a fingerprint.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Probe {
    /// The fingerprint lives at this index.
    Found(u64),
    /// The fingerprint is missing, this is the first free slot on its probe path.
    Vacant(u64),
}

/// Fails if the parameters can not describe a usable table.
pub(crate) fn validate_table_parameters(
    capacity_power_of_two: u32,
    load_factor: f32,
) -> Result<(), FpSetError> {
    if capacity_power_of_two == 0 || capacity_power_of_two > MAX_CAPACITY_POWER_OF_TWO {
        return Err(FpSetError::InvalidCapacity(
            capacity_power_of_two,
            MAX_CAPACITY_POWER_OF_TWO,
        ));
    }
    // written this way to reject NaN as well
    if !(load_factor > 0.0 && load_factor < 1.0) {
        return Err(FpSetError::InvalidLoadFactor(load_factor));
    }
    if (load_factor as f64) * ((1u64 << capacity_power_of_two) as f64) < 1.0 {
        return Err(FpSetError::NoUsableSlots {
            capacity_power_of_two,
            load_factor,
        });
    }
    Ok(())
}

/// Allocates [len] copies of [value], failing instead of aborting if the memory is not available.
pub(crate) fn try_filled_vec<T: Clone>(len: u64, value: T) -> Result<Vec<T>, FpSetError> {
    // lengths beyond usize can never be reserved
    let wanted = usize::try_from(len).unwrap_or(usize::MAX);
    let mut slots = Vec::new();
    slots
        .try_reserve_exact(wanted)
        .map_err(|source| FpSetError::AllocationFailed { slots: len, source })?;
    slots.resize(wanted, value);
    Ok(slots)
}

/// Slot level access to a power-of-two table plus the probing algorithm on top of it.
///
/// Implementors provide the storage primitives and [ProbingTable::make_space],
/// everything else is shared.
pub(crate) trait ProbingTable {
    /// The capacity as exponent of two.
    fn capacity_power_of_two(&self) -> u32;

    fn load_factor(&self) -> f32;

    /// Number of occupied slots.
    fn entries(&self) -> u64;

    fn set_entries(&mut self, entries: u64);

    /// Reads the slot at [index], `None` if it is empty.
    fn slot(&self, index: u64) -> Result<Option<u64>, FpSetError>;

    /// Stores [fp] at [index].
    fn set_at(&mut self, index: u64, fp: u64) -> Result<(), FpSetError>;

    /// Marks the slot at [index] as empty.
    fn clear_at(&mut self, index: u64) -> Result<(), FpSetError>;

    /// Frees room for at least one more entry, either by growing or by discarding.
    fn make_space(&mut self) -> Result<(), FpSetError>;

    /// Called for every hit and every insert.
    fn note_access(&mut self, _index: u64) {}

    /// Moves [fp] from [from] to the empty slot [to].
    fn relocate(&mut self, fp: u64, from: u64, to: u64) -> Result<(), FpSetError> {
        self.set_at(to, fp)?;
        self.clear_at(from)
    }

    #[inline]
    fn capacity(&self) -> u64 {
        1u64 << self.capacity_power_of_two()
    }

    #[inline]
    fn start_index_for(&self, fp: u64) -> u64 {
        fp >> (64 - self.capacity_power_of_two())
    }

    /// Walks from the start slot of [fp] until it finds [fp] or a free slot.
    fn probe(&self, fp: u64) -> Result<Probe, FpSetError> {
        let capacity = self.capacity();
        let mask = capacity - 1;
        let mut index = self.start_index_for(fp);
        for _ in 0..capacity {
            match self.slot(index)? {
                None => return Ok(Probe::Vacant(index)),
                Some(found) if found == fp => return Ok(Probe::Found(index)),
                Some(_) => index = (index + 1) & mask,
            }
        }
        Err(FpSetError::TableFull(capacity))
    }

    /// True if one more entry keeps the table at or below its load factor.
    fn has_room_for_one_more(&self) -> bool {
        ((self.entries() + 1) as f64) <= (self.load_factor() as f64) * (self.capacity() as f64)
    }

    fn table_contains(&mut self, fp: u64) -> Result<bool, FpSetError> {
        match self.probe(fp)? {
            Probe::Found(index) => {
                self.note_access(index);
                Ok(true)
            }
            Probe::Vacant(_) => Ok(false),
        }
    }

    fn table_add(&mut self, fp: u64) -> Result<bool, FpSetError> {
        let mut index = match self.probe(fp)? {
            Probe::Found(_) => return Ok(false),
            Probe::Vacant(index) => index,
        };
        if !self.has_room_for_one_more() {
            self.make_space()?;
            index = match self.probe(fp)? {
                Probe::Found(_) => return Ok(false),
                Probe::Vacant(index) => index,
            };
        }
        self.set_at(index, fp)?;
        self.set_entries(self.entries() + 1);
        self.note_access(index);
        Ok(true)
    }

    fn table_remove(&mut self, fp: u64) -> Result<bool, FpSetError> {
        match self.probe(fp)? {
            Probe::Found(index) => {
                self.remove_at(index)?;
                Ok(true)
            }
            Probe::Vacant(_) => Ok(false),
        }
    }

    /// Clears [index] and shifts the following run back, so every entry stays
    /// reachable from its start slot.
    fn remove_at(&mut self, index: u64) -> Result<(), FpSetError> {
        self.clear_at(index)?;
        self.set_entries(self.entries() - 1);
        let mask = self.capacity() - 1;
        let mut probe_index = (index + 1) & mask;
        while let Some(fp) = self.slot(probe_index)? {
            if let Probe::Vacant(to) = self.probe(fp)? {
                self.relocate(fp, probe_index, to)?;
            }
            probe_index = (probe_index + 1) & mask;
        }
        Ok(())
    }

    /// Inserts [fp] without any load check. Used while rehashing into a fresh table.
    fn place(&mut self, fp: u64) -> Result<(), FpSetError> {
        if let Probe::Vacant(index) = self.probe(fp)? {
            self.set_at(index, fp)?;
            self.set_entries(self.entries() + 1);
        }
        Ok(())
    }
}
