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


use crate::fpset::{
    DEFAULT_BLOOM_EXPECTED_ELEMENTS, DEFAULT_BLOOM_HASH_FUNCTIONS,
    DEFAULT_CACHE_CAPACITY_POWER_OF_TWO, DEFAULT_CACHE_LOAD_FACTOR,
    DEFAULT_DISK_CAPACITY_POWER_OF_TWO, DEFAULT_DISK_LOAD_FACTOR,
    DEFAULT_MEM_CAPACITY_POWER_OF_TWO, DEFAULT_MEM_LOAD_FACTOR,
};
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// The default backing file of the disk backends.
pub const DEFAULT_DISK_PATH: &str = "uri_uniq/seen.fps";

/// The store behind a filter.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    Deserialize,
    Serialize,
    EnumString,
    Display,
    AsRefStr,
    Eq,
    PartialEq,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum BackendKind {
    /// Fingerprints in an in-memory table
    #[default]
    Memory,
    /// Fingerprints in a table file
    Disk,
    /// Fingerprints in a table file, fronted by an in-memory CLOCK cache
    CachedDisk,
    /// Fingerprints in a bloom filter. May report unseen uris as seen and can not forget.
    Bloom,
    /// The full uris in a hash set
    Literal,
}

/// Config of the uri uniq filter.
///
/// Unset table sizes fall back to the defaults of the selected backend.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename(serialize = "Filter"))]
pub struct UniqFilterConfig {
    #[serde(default)]
    pub backend: BackendKind,

    /// The initial table has 2^capacity_power_of_two slots.
    #[serde(default)]
    pub capacity_power_of_two: Option<u32>,

    /// The table grows when more than load_factor * capacity slots are used.
    #[serde(default)]
    pub load_factor: Option<f32>,

    /// Size of the cache of the cached-disk backend.
    #[serde(default = "_default_cache_capacity_power_of_two")]
    pub cache_capacity_power_of_two: u32,

    #[serde(default = "_default_cache_load_factor")]
    pub cache_load_factor: f32,

    /// Number of uris the bloom backend is dimensioned for.
    #[serde(default = "_default_expected_elements")]
    pub expected_elements: u64,

    /// Number of hash functions of the bloom backend. The false positive rate is about 2^-hash_functions.
    #[serde(default = "_default_hash_functions")]
    pub hash_functions: u32,

    /// The table file of the disk backends. (default: uri_uniq/seen.fps)
    #[serde(default = "_default_disk_path")]
    pub disk_path: Utf8PathBuf,

    /// If set every processed key is appended to this file.
    #[serde(default)]
    pub processed_key_log: Option<Utf8PathBuf>,
}

const fn _default_cache_capacity_power_of_two() -> u32 {
    DEFAULT_CACHE_CAPACITY_POWER_OF_TWO
}
const fn _default_cache_load_factor() -> f32 {
    DEFAULT_CACHE_LOAD_FACTOR
}
const fn _default_expected_elements() -> u64 {
    DEFAULT_BLOOM_EXPECTED_ELEMENTS
}
const fn _default_hash_functions() -> u32 {
    DEFAULT_BLOOM_HASH_FUNCTIONS
}
fn _default_disk_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_DISK_PATH)
}

impl UniqFilterConfig {
    /// The configured capacity power of two or the default of the backend.
    pub fn capacity_power_of_two(&self) -> u32 {
        self.capacity_power_of_two.unwrap_or(match self.backend {
            BackendKind::Disk | BackendKind::CachedDisk => DEFAULT_DISK_CAPACITY_POWER_OF_TWO,
            _ => DEFAULT_MEM_CAPACITY_POWER_OF_TWO,
        })
    }

    /// The configured load factor or the default of the backend.
    pub fn load_factor(&self) -> f32 {
        self.load_factor.unwrap_or(match self.backend {
            BackendKind::Disk | BackendKind::CachedDisk => DEFAULT_DISK_LOAD_FACTOR,
            _ => DEFAULT_MEM_LOAD_FACTOR,
        })
    }
}

impl Default for UniqFilterConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            capacity_power_of_two: None,
            load_factor: None,
            cache_capacity_power_of_two: _default_cache_capacity_power_of_two(),
            cache_load_factor: _default_cache_load_factor(),
            expected_elements: _default_expected_elements(),
            hash_functions: _default_hash_functions(),
            disk_path: _default_disk_path(),
            processed_key_log: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn backend_names_are_kebab_case() {
        assert_eq!(BackendKind::CachedDisk.to_string(), "cached-disk");
        assert_eq!(BackendKind::from_str("Cached-Disk").unwrap(), BackendKind::CachedDisk);
        assert_eq!(BackendKind::Bloom.as_ref(), "bloom");
        assert_eq!(
            serde_json::to_string(&BackendKind::CachedDisk).unwrap(),
            "\"cached-disk\""
        );
        assert!(BackendKind::from_str("redis").is_err());
    }

    #[test]
    fn sizes_default_per_backend() {
        let mut config = UniqFilterConfig::default();
        assert_eq!(config.capacity_power_of_two(), DEFAULT_MEM_CAPACITY_POWER_OF_TWO);
        assert_eq!(config.load_factor(), DEFAULT_MEM_LOAD_FACTOR);
        config.backend = BackendKind::Disk;
        assert_eq!(config.capacity_power_of_two(), DEFAULT_DISK_CAPACITY_POWER_OF_TWO);
        assert_eq!(config.load_factor(), DEFAULT_DISK_LOAD_FACTOR);
        config.capacity_power_of_two = Some(8);
        assert_eq!(config.capacity_power_of_two(), 8);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config: UniqFilterConfig = serde_json::from_str(r#"{"backend": "bloom"}"#).unwrap();
        assert_eq!(config.backend, BackendKind::Bloom);
        assert_eq!(config.hash_functions, DEFAULT_BLOOM_HASH_FUNCTIONS);
        assert_eq!(config.disk_path.as_str(), DEFAULT_DISK_PATH);
        assert!(config.processed_key_log.is_none());
    }
}
