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

use crate::fpset::table::{
    try_filled_vec, validate_table_parameters, ProbingTable, MAX_CAPACITY_POWER_OF_TWO,
};
use crate::fpset::{FingerprintSet, FpSetError};
use ubyte::ByteUnit;

/// The default capacity exponent of a [MemFpSet]
pub const DEFAULT_MEM_CAPACITY_POWER_OF_TWO: u32 = 10;
/// The default load factor of a [MemFpSet]
pub const DEFAULT_MEM_LOAD_FACTOR: f32 = 0.5;

/// Above this load factor the probe chains of linear probing get long.
const RECOMMENDED_MAX_LOAD_FACTOR: f32 = 0.5;

/// Marks an empty slot. A real fingerprint 0 is kept in [MemFpSet::has_zero].
const EMPTY: u64 = 0;

/// An open addressing fingerprint set in a flat array.
/// Doubles its capacity whenever the load factor is exceeded.
#[derive(Debug, Clone)]
pub struct MemFpSet {
    slots: Vec<u64>,
    has_zero: bool,
    capacity_power_of_two: u32,
    load_factor: f32,
    entries: u64,
}

impl MemFpSet {
    pub fn new(capacity_power_of_two: u32, load_factor: f32) -> Result<Self, FpSetError> {
        validate_table_parameters(capacity_power_of_two, load_factor)?;
        if load_factor > RECOMMENDED_MAX_LOAD_FACTOR {
            log::warn!(
                "A load factor of {load_factor} for an in-memory fingerprint set results in long probe chains."
            );
        }
        Self::allocate(capacity_power_of_two, load_factor)
    }

    fn allocate(capacity_power_of_two: u32, load_factor: f32) -> Result<Self, FpSetError> {
        let capacity = 1u64 << capacity_power_of_two;
        log::debug!(
            "Allocate {} for 2^{capacity_power_of_two} in-memory slots.",
            ByteUnit::Byte(capacity.saturating_mul(std::mem::size_of::<u64>() as u64))
        );
        Ok(Self {
            slots: try_filled_vec(capacity, EMPTY)?,
            has_zero: false,
            capacity_power_of_two,
            load_factor,
            entries: 0,
        })
    }

    /// The number of slots.
    pub fn capacity(&self) -> u64 {
        ProbingTable::capacity(self)
    }
}

impl Default for MemFpSet {
    fn default() -> Self {
        Self {
            slots: vec![EMPTY; 1 << DEFAULT_MEM_CAPACITY_POWER_OF_TWO],
            has_zero: false,
            capacity_power_of_two: DEFAULT_MEM_CAPACITY_POWER_OF_TWO,
            load_factor: DEFAULT_MEM_LOAD_FACTOR,
            entries: 0,
        }
    }
}

impl ProbingTable for MemFpSet {
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

    #[inline]
    fn slot(&self, index: u64) -> Result<Option<u64>, FpSetError> {
        let value = self.slots[index as usize];
        Ok((value != EMPTY).then_some(value))
    }

    #[inline]
    fn set_at(&mut self, index: u64, fp: u64) -> Result<(), FpSetError> {
        self.slots[index as usize] = fp;
        Ok(())
    }

    #[inline]
    fn clear_at(&mut self, index: u64) -> Result<(), FpSetError> {
        self.slots[index as usize] = EMPTY;
        Ok(())
    }

    fn make_space(&mut self) -> Result<(), FpSetError> {
        let next = self.capacity_power_of_two + 1;
        if next > MAX_CAPACITY_POWER_OF_TWO {
            return Err(FpSetError::CapacityExhausted(self.capacity_power_of_two));
        }
        log::debug!(
            "Grow in-memory fingerprint set from 2^{} to 2^{next} slots with {} entries.",
            self.capacity_power_of_two,
            self.entries
        );
        let mut grown = Self::allocate(next, self.load_factor)?;
        grown.has_zero = self.has_zero;
        for &fp in self.slots.iter().filter(|&&value| value != EMPTY) {
            grown.place(fp)?;
        }
        *self = grown;
        Ok(())
    }
}

impl FingerprintSet for MemFpSet {
    fn contains(&mut self, fp: u64) -> Result<bool, FpSetError> {
        if fp == EMPTY {
            return Ok(self.has_zero);
        }
        self.table_contains(fp)
    }

    fn add(&mut self, fp: u64) -> Result<bool, FpSetError> {
        if fp == EMPTY {
            let added = !self.has_zero;
            self.has_zero = true;
            return Ok(added);
        }
        self.table_add(fp)
    }

    fn remove(&mut self, fp: u64) -> Result<bool, FpSetError> {
        if fp == EMPTY {
            let removed = self.has_zero;
            self.has_zero = false;
            return Ok(removed);
        }
        self.table_remove(fp)
    }

    fn count(&self) -> u64 {
        self.entries + self.has_zero as u64
    }

    fn quick_contains(&mut self, fp: u64) -> bool {
        self.contains(fp).unwrap_or(false)
    }
}
