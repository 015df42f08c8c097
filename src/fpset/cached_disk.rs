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

use crate::fpset::{ClockCache, DiskFpSet, FingerprintSet, FpSetError};
use camino::Utf8Path;

/// A [DiskFpSet] fronted by a [ClockCache].
///
/// The disk is authoritative, the cache only ever holds fingerprints that are
/// on the disk as well. A cache miss therefore always falls through to the disk.
#[derive(Debug)]
pub struct CachedDiskFpSet {
    disk: DiskFpSet,
    cache: ClockCache,
    cache_hits: u64,
    disk_hits: u64,
}

impl CachedDiskFpSet {
    pub fn new(disk: DiskFpSet, cache: ClockCache) -> Self {
        Self {
            disk,
            cache,
            cache_hits: 0,
            disk_hits: 0,
        }
    }

    /// Creates a fresh disk table at [path] and a cache with its own dimensions.
    pub fn create(
        path: impl AsRef<Utf8Path>,
        capacity_power_of_two: u32,
        load_factor: f32,
        cache_capacity_power_of_two: u32,
        cache_load_factor: f32,
    ) -> Result<Self, FpSetError> {
        let cache = ClockCache::new(cache_capacity_power_of_two, cache_load_factor)?;
        let disk = DiskFpSet::create(path, capacity_power_of_two, load_factor)?;
        Ok(Self::new(disk, cache))
    }

    pub fn disk(&self) -> &DiskFpSet {
        &self.disk
    }

    pub fn cache(&self) -> &ClockCache {
        &self.cache
    }

    /// Lookups answered by the cache.
    pub fn cache_hits(&self) -> u64 {
        self.cache_hits
    }

    /// Lookups that missed the cache but found the fingerprint on disk.
    pub fn disk_hits(&self) -> u64 {
        self.disk_hits
    }
}

impl FingerprintSet for CachedDiskFpSet {
    fn contains(&mut self, fp: u64) -> Result<bool, FpSetError> {
        if self.cache.contains(fp)? {
            self.cache_hits += 1;
            return Ok(true);
        }
        if self.disk.contains(fp)? {
            self.disk_hits += 1;
            self.cache.add(fp)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn add(&mut self, fp: u64) -> Result<bool, FpSetError> {
        if self.cache.contains(fp)? {
            self.cache_hits += 1;
            return Ok(false);
        }
        let added = self.disk.add(fp)?;
        self.cache.add(fp)?;
        Ok(added)
    }

    fn remove(&mut self, fp: u64) -> Result<bool, FpSetError> {
        let removed = self.disk.remove(fp)?;
        self.cache.remove(fp)?;
        Ok(removed)
    }

    fn count(&self) -> u64 {
        self.disk.count()
    }

    fn quick_contains(&mut self, fp: u64) -> bool {
        self.cache.quick_contains(fp)
    }

    fn flush(&mut self) -> Result<(), FpSetError> {
        self.disk.flush()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;

    #[test]
    fn finds_evicted_entries_on_disk() {
        let dir = Utf8TempDir::new().unwrap();
        let mut set =
            CachedDiskFpSet::create(dir.path().join("cached.fps"), 4, 0.75, 3, 0.5).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let values: Vec<u64> = (0..200).map(|_| rng.gen()).collect();
        for &value in &values {
            assert!(set.add(value).unwrap());
        }
        assert_eq!(set.count(), 200);
        assert!(set.cache().count() <= 4);
        assert!(set.cache().evictions() > 0);
        for &value in &values {
            assert!(set.contains(value).unwrap());
        }
        assert!(set.disk_hits() > 0);
    }

    #[test]
    fn promotes_disk_hits_into_the_cache() {
        let dir = Utf8TempDir::new().unwrap();
        let mut set =
            CachedDiskFpSet::create(dir.path().join("promote.fps"), 4, 0.75, 3, 0.5).unwrap();
        for value in 1..=6u64 {
            set.add(value << 58).unwrap();
        }
        let evicted = (1..=6u64)
            .map(|value| value << 58)
            .find(|&value| !set.quick_contains(value))
            .unwrap();
        assert!(set.contains(evicted).unwrap());
        assert!(set.quick_contains(evicted));
    }

    #[test]
    fn never_invents_or_loses_entries() {
        let dir = Utf8TempDir::new().unwrap();
        let mut set =
            CachedDiskFpSet::create(dir.path().join("sound.fps"), 3, 0.5, 3, 0.5).unwrap();
        let mut reference = HashSet::new();
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..4000 {
            let value: u64 = (rng.gen_range(0u64..16) << 60) | rng.gen_range(0u64..32);
            match rng.gen_range(0..4) {
                0 => assert_eq!(set.remove(value).unwrap(), reference.remove(&value)),
                1 => assert_eq!(set.contains(value).unwrap(), reference.contains(&value)),
                _ => assert_eq!(set.add(value).unwrap(), reference.insert(value)),
            }
            assert_eq!(set.count(), reference.len() as u64);
        }
        for value in 0..16u64 {
            for low in 0..32u64 {
                let probe = (value << 60) | low;
                assert_eq!(set.contains(probe).unwrap(), reference.contains(&probe));
            }
        }
    }

    #[test]
    fn quick_contains_does_not_heat_the_cache() {
        let dir = Utf8TempDir::new().unwrap();
        let mut set =
            CachedDiskFpSet::create(dir.path().join("quick.fps"), 4, 0.75, 4, 0.5).unwrap();
        set.add(5 << 60).unwrap();
        for _ in 0..20 {
            assert!(set.quick_contains(5 << 60));
        }
        assert_eq!(set.cache().references(5 << 60), Some(1));
        assert_eq!(set.cache_hits(), 0);
    }

    #[test]
    fn removes_from_both() {
        let dir = Utf8TempDir::new().unwrap();
        let mut set =
            CachedDiskFpSet::create(dir.path().join("both.fps"), 4, 0.75, 4, 0.5).unwrap();
        set.add(77).unwrap();
        assert!(set.quick_contains(77));
        assert!(set.remove(77).unwrap());
        assert!(!set.quick_contains(77));
        assert!(!set.contains(77).unwrap());
        assert_eq!(set.disk().count(), 0);
    }
}
