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

use crate::fpset::table::{try_filled_vec, validate_table_parameters, ProbingTable};
use crate::fpset::{FingerprintSet, FpSetError};
use ubyte::ByteUnit;

/// The default capacity exponent of a [ClockCache]
pub const DEFAULT_CACHE_CAPACITY_POWER_OF_TWO: u32 = 20;
/// The default load factor of a [ClockCache]
pub const DEFAULT_CACHE_LOAD_FACTOR: f32 = 0.75;

/// Saturation point of the reference counter.
pub const MAX_REFERENCES: u8 = 127;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct CacheSlot {
    fp: u64,
    references: u8,
}

/// A fixed size fingerprint table that evicts with the CLOCK policy.
///
/// Every hit bumps a saturating counter of the slot. When the table is at its
/// load factor, a hand sweeps the slots, evicting the first one with a zero
/// count and decrementing all others on its way.
#[derive(Debug, Clone)]
pub struct ClockCache {
    slots: Vec<Option<CacheSlot>>,
    capacity_power_of_two: u32,
    load_factor: f32,
    entries: u64,
    hand: u64,
    evictions: u64,
}

impl ClockCache {
    pub fn new(capacity_power_of_two: u32, load_factor: f32) -> Result<Self, FpSetError> {
        validate_table_parameters(capacity_power_of_two, load_factor)?;
        let capacity = 1u64 << capacity_power_of_two;
        log::debug!(
            "Allocate {} for a fingerprint cache with 2^{capacity_power_of_two} slots.",
            ByteUnit::Byte(
                capacity.saturating_mul(std::mem::size_of::<Option<CacheSlot>>() as u64)
            )
        );
        Ok(Self {
            slots: try_filled_vec(capacity, None)?,
            capacity_power_of_two,
            load_factor,
            entries: 0,
            hand: 0,
            evictions: 0,
        })
    }

    /// The number of slots.
    pub fn capacity(&self) -> u64 {
        ProbingTable::capacity(self)
    }

    /// How many entries were dropped to make room.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// The reference counter of [fp], if cached. Does not count as an access.
    pub fn references(&self, fp: u64) -> Option<u8> {
        let mask = self.capacity() - 1;
        let mut index = self.start_index_for(fp);
        loop {
            match self.slots[index as usize] {
                None => return None,
                Some(slot) if slot.fp == fp => return Some(slot.references),
                Some(_) => index = (index + 1) & mask,
            }
        }
    }
}

impl ProbingTable for ClockCache {
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
        Ok(self.slots[index as usize].map(|slot| slot.fp))
    }

    #[inline]
    fn set_at(&mut self, index: u64, fp: u64) -> Result<(), FpSetError> {
        self.slots[index as usize] = Some(CacheSlot { fp, references: 0 });
        Ok(())
    }

    #[inline]
    fn clear_at(&mut self, index: u64) -> Result<(), FpSetError> {
        self.slots[index as usize] = None;
        Ok(())
    }

    fn note_access(&mut self, index: u64) {
        if let Some(slot) = &mut self.slots[index as usize] {
            if slot.references < MAX_REFERENCES {
                slot.references += 1;
            }
        }
    }

    /// The counter travels with the fingerprint.
    fn relocate(&mut self, _fp: u64, from: u64, to: u64) -> Result<(), FpSetError> {
        self.slots[to as usize] = self.slots[from as usize].take();
        Ok(())
    }

    /// Evicts exactly one entry.
    fn make_space(&mut self) -> Result<(), FpSetError> {
        let mask = self.capacity() - 1;
        loop {
            let current = self.hand;
            self.hand = (current + 1) & mask;
            match &mut self.slots[current as usize] {
                None => {}
                Some(slot) if slot.references > 0 => slot.references -= 1,
                Some(slot) => {
                    log::trace!("Evict {:#018x} from the fingerprint cache.", slot.fp);
                    self.evictions += 1;
                    return self.remove_at(current);
                }
            }
        }
    }
}

impl FingerprintSet for ClockCache {
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

    /// Does not count as an access.
    fn quick_contains(&mut self, fp: u64) -> bool {
        self.references(fp).is_some()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn fp(start: u64, low: u64) -> u64 {
        (start << 60) | low
    }

    #[test]
    fn never_exceeds_its_load() {
        let mut cache = ClockCache::new(4, 0.5).unwrap();
        for value in 1..=100u64 {
            cache.add(value << 56).unwrap();
            assert!(cache.count() <= 8);
        }
        assert_eq!(cache.count(), 8);
        assert_eq!(cache.evictions(), 92);
    }

    #[test]
    fn counters_saturate() {
        let mut cache = ClockCache::new(4, 0.5).unwrap();
        cache.add(fp(1, 1)).unwrap();
        assert_eq!(cache.references(fp(1, 1)), Some(1));
        for _ in 0..500 {
            assert!(cache.contains(fp(1, 1)).unwrap());
        }
        assert_eq!(cache.references(fp(1, 1)), Some(MAX_REFERENCES));
        assert_eq!(cache.references(fp(1, 2)), None);
    }

    #[test]
    fn quick_contains_leaves_the_counters_alone() {
        let mut cache = ClockCache::new(4, 0.5).unwrap();
        cache.add(fp(3, 1)).unwrap();
        for _ in 0..10 {
            assert!(cache.quick_contains(fp(3, 1)));
        }
        assert!(!cache.quick_contains(fp(3, 2)));
        assert_eq!(cache.references(fp(3, 1)), Some(1));
    }

    #[test]
    fn oversized_caches_fail_without_aborting() {
        assert!(matches!(
            ClockCache::new(crate::fpset::MAX_CAPACITY_POWER_OF_TWO, 0.5),
            Err(FpSetError::AllocationFailed { .. })
        ));
    }

    #[test]
    fn referenced_entries_survive_a_sweep() {
        // 16 slots at 0.25 hold four entries
        let mut cache = ClockCache::new(4, 0.25).unwrap();
        let hot = fp(0, 1);
        let cold = [fp(1, 1), fp(2, 1), fp(3, 1)];
        cache.add(hot).unwrap();
        for value in cold {
            cache.add(value).unwrap();
        }
        for _ in 0..10 {
            cache.contains(hot).unwrap();
        }
        // every insert starts with one reference, hot has eleven
        cache.add(fp(4, 1)).unwrap();
        cache.add(fp(5, 1)).unwrap();
        assert_eq!(cache.evictions(), 2);
        assert!(cache.contains(hot).unwrap());
        assert_eq!(cache.count(), 4);
    }

    #[test]
    fn eviction_keeps_collision_runs_reachable() {
        let mut cache = ClockCache::new(3, 0.5).unwrap();
        let run = [fp(2, 1), fp(2, 2), fp(2, 3), fp(2, 4)];
        for value in run {
            cache.add(value).unwrap();
        }
        cache.add(fp(7, 9)).unwrap();
        assert_eq!(cache.evictions(), 1);
        let cached: Vec<u64> = run
            .iter()
            .copied()
            .chain([fp(7, 9)])
            .filter(|&value| cache.references(value).is_some())
            .collect();
        assert_eq!(cached.len(), 4);
        for value in cached {
            assert!(cache.contains(value).unwrap());
        }
    }
}
