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

use crate::fpset::table::try_filled_vec;
use crate::fpset::{FingerprintSet, FpSetError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hash::Hasher;
use twox_hash::XxHash64;
use ubyte::ByteUnit;

/// The default number of expected elements of a [BloomFpSet]
pub const DEFAULT_BLOOM_EXPECTED_ELEMENTS: u64 = 125_000_000;
/// The default number of hash functions of a [BloomFpSet], about one false positive in 2^22.
pub const DEFAULT_BLOOM_HASH_FUNCTIONS: u32 = 22;

/// Seeds the probe seeds, so two filters with the same dimensions probe the same bits.
const SEED_OF_SEEDS: u64 = 0x0bad_5eed_b100_f11e;

/// A bloom filter over fingerprints.
///
/// Sized with `m = n * d / ln 2` bits, which makes `d` the optimal number of
/// probes for `n` elements and the false positive rate about `2^-d`.
/// Never forgets anything, hence [FingerprintSet::remove] is not supported.
#[derive(Debug, Clone)]
pub struct BloomFpSet {
    bits: Vec<u64>,
    bit_count: u64,
    seeds: Vec<u64>,
    expected_elements: u64,
    count: u64,
    warned_about_capacity: bool,
}

impl BloomFpSet {
    pub fn new(expected_elements: u64, hash_functions: u32) -> Result<Self, FpSetError> {
        if expected_elements == 0 || !(1..=64).contains(&hash_functions) {
            return Err(FpSetError::InvalidBloomParameters {
                expected_elements,
                hash_functions,
            });
        }
        let wanted_bits =
            (expected_elements as f64 * hash_functions as f64 / std::f64::consts::LN_2).ceil();
        // saturates for absurd dimensions, which then fail to allocate
        let words = (wanted_bits / 64.0).ceil() as u64;
        log::debug!(
            "Allocate {} for a bloom filter with n={expected_elements} and d={hash_functions}.",
            ByteUnit::Byte(words.saturating_mul(std::mem::size_of::<u64>() as u64))
        );
        let bits = try_filled_vec(words, 0u64)?;
        let mut rng = StdRng::seed_from_u64(SEED_OF_SEEDS);
        Ok(Self {
            bits,
            bit_count: words * 64,
            seeds: (0..hash_functions).map(|_| rng.gen()).collect(),
            expected_elements,
            count: 0,
            warned_about_capacity: false,
        })
    }

    /// Number of bits in the filter.
    pub fn bit_count(&self) -> u64 {
        self.bit_count
    }

    pub fn hash_functions(&self) -> u32 {
        self.seeds.len() as u32
    }

    pub fn expected_elements(&self) -> u64 {
        self.expected_elements
    }

    /// The false positive rate the filter was dimensioned for.
    pub fn target_false_positive_rate(&self) -> f64 {
        0.5f64.powi(self.seeds.len() as i32)
    }

    /// The false positive rate expected for the current [FingerprintSet::count].
    pub fn expected_false_positive_rate(&self) -> f64 {
        let k = self.seeds.len() as f64;
        let exponent = -k * self.count as f64 / self.bit_count as f64;
        (1.0 - exponent.exp()).powf(k)
    }

    fn bit_indices(&self, fp: u64) -> impl Iterator<Item = u64> + '_ {
        self.seeds.iter().map(move |&seed| {
            let mut hasher = XxHash64::with_seed(seed);
            hasher.write_u64(fp);
            hasher.finish() % self.bit_count
        })
    }

    fn is_set(&self, index: u64) -> bool {
        self.bits[(index / 64) as usize] & (1u64 << (index % 64)) != 0
    }
}

impl FingerprintSet for BloomFpSet {
    fn contains(&mut self, fp: u64) -> Result<bool, FpSetError> {
        Ok(self.bit_indices(fp).all(|index| self.is_set(index)))
    }

    fn add(&mut self, fp: u64) -> Result<bool, FpSetError> {
        let indices: Vec<u64> = self.bit_indices(fp).collect();
        let mut added = false;
        for index in indices {
            let word = &mut self.bits[(index / 64) as usize];
            let mask = 1u64 << (index % 64);
            if *word & mask == 0 {
                *word |= mask;
                added = true;
            }
        }
        if added {
            self.count += 1;
            if self.count > self.expected_elements && !self.warned_about_capacity {
                self.warned_about_capacity = true;
                log::warn!(
                    "The bloom filter holds more than the {} elements it was dimensioned for, the false positive rate rises above {:e}.",
                    self.expected_elements,
                    self.target_false_positive_rate()
                );
            }
        }
        Ok(added)
    }

    fn remove(&mut self, _fp: u64) -> Result<bool, FpSetError> {
        Err(FpSetError::Unsupported {
            operation: "remove",
            backend: "bloom filter",
        })
    }

    fn count(&self) -> u64 {
        self.count
    }

    fn quick_contains(&mut self, fp: u64) -> bool {
        self.contains(fp).unwrap_or(false)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn dimensions_follow_n_and_d() {
        let bloom = BloomFpSet::new(1000, 10).unwrap();
        // 1000 * 10 / ln 2 = 14427, rounded up to words
        assert_eq!(bloom.bit_count(), 14464);
        assert_eq!(bloom.hash_functions(), 10);
        assert_eq!(bloom.target_false_positive_rate(), 1.0 / 1024.0);
    }

    #[test]
    fn never_forgets() {
        let mut bloom = BloomFpSet::new(1000, 8).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let values: Vec<u64> = (0..1000).map(|_| rng.gen()).collect();
        for &value in &values {
            bloom.add(value).unwrap();
        }
        for &value in &values {
            assert!(bloom.contains(value).unwrap());
            assert!(!bloom.add(value).unwrap());
        }
    }

    #[test]
    fn false_positive_rate_is_near_the_target() {
        let n = 20_000u64;
        let mut bloom = BloomFpSet::new(n, 8).unwrap();
        let mut rng = StdRng::seed_from_u64(2024);
        let mut added = HashSet::new();
        while (added.len() as u64) < n {
            let value: u64 = rng.gen();
            if added.insert(value) {
                bloom.add(value).unwrap();
            }
        }
        let mut probes = 0u64;
        let mut false_positives = 0u64;
        while probes < 200_000 {
            let value: u64 = rng.gen();
            if added.contains(&value) {
                continue;
            }
            probes += 1;
            if bloom.contains(value).unwrap() {
                false_positives += 1;
            }
        }
        let rate = false_positives as f64 / probes as f64;
        let target = bloom.target_false_positive_rate();
        assert!(rate < target * 1.5, "rate {rate} vs target {target}");
        assert!(rate > target / 1.5, "rate {rate} vs target {target}");
        // a few adds may have collided on every bit
        assert!(bloom.count() <= n && bloom.count() > n - 100);
    }

    #[test]
    fn remove_is_unsupported() {
        let mut bloom = BloomFpSet::new(10, 4).unwrap();
        bloom.add(5).unwrap();
        assert!(matches!(
            bloom.remove(5),
            Err(FpSetError::Unsupported {
                operation: "remove",
                ..
            })
        ));
        assert!(bloom.contains(5).unwrap());
    }

    #[test]
    fn overfilling_only_warns() {
        let mut bloom = BloomFpSet::new(10, 4).unwrap();
        for value in 0..100u64 {
            bloom.add(value.wrapping_mul(0x9e37_79b9_7f4a_7c15)).unwrap();
        }
        assert!(bloom.warned_about_capacity);
        assert!(bloom.count() > 10);
        assert!(bloom.expected_false_positive_rate() > bloom.target_false_positive_rate());
    }

    #[test]
    fn oversized_filters_fail_without_aborting() {
        assert!(matches!(
            BloomFpSet::new(u64::MAX / 2, 64),
            Err(FpSetError::AllocationFailed { .. })
        ));
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(matches!(
            BloomFpSet::new(0, 4),
            Err(FpSetError::InvalidBloomParameters { .. })
        ));
        assert!(matches!(
            BloomFpSet::new(10, 0),
            Err(FpSetError::InvalidBloomParameters { .. })
        ));
        assert!(matches!(
            BloomFpSet::new(10, 65),
            Err(FpSetError::InvalidBloomParameters { .. })
        ));
    }
}
