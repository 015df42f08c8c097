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


use crate::config::{BackendKind, UniqFilterConfig};
use crate::fpset::{BloomFpSet, CachedDiskFpSet, DiskFpSet, MemFpSet};
use crate::uniq::{
    FingerprintKeys, KeyStore, LiteralKeys, ProcessedKeyLog, SetBasedUriUniqFilter,
    UniqFilterError, UriReceiver,
};

/// A filter over whatever store the config selected.
pub type ConfiguredUriUniqFilter<R> = SetBasedUriUniqFilter<Box<dyn KeyStore>, R>;

/// Creates the key store selected by [config].
pub fn open_key_store(config: &UniqFilterConfig) -> Result<Box<dyn KeyStore>, UniqFilterError> {
    let capacity_power_of_two = config.capacity_power_of_two();
    let load_factor = config.load_factor();
    let keys: Box<dyn KeyStore> = match config.backend {
        BackendKind::Memory => Box::new(FingerprintKeys::new(MemFpSet::new(
            capacity_power_of_two,
            load_factor,
        )?)),
        BackendKind::Disk => Box::new(FingerprintKeys::new(DiskFpSet::create(
            &config.disk_path,
            capacity_power_of_two,
            load_factor,
        )?)),
        BackendKind::CachedDisk => Box::new(FingerprintKeys::new(CachedDiskFpSet::create(
            &config.disk_path,
            capacity_power_of_two,
            load_factor,
            config.cache_capacity_power_of_two,
            config.cache_load_factor,
        )?)),
        BackendKind::Bloom => Box::new(FingerprintKeys::new(BloomFpSet::new(
            config.expected_elements,
            config.hash_functions,
        )?)),
        BackendKind::Literal => Box::new(LiteralKeys::new()),
    };
    log::info!("Opened a {} key store.", config.backend);
    Ok(keys)
}

/// Creates a filter handing new uris to [receiver], as configured by [config].
pub fn open_filter<R: UriReceiver>(
    config: &UniqFilterConfig,
    receiver: R,
) -> Result<ConfiguredUriUniqFilter<R>, UniqFilterError> {
    let filter = SetBasedUriUniqFilter::new(open_key_store(config)?, receiver);
    match config.processed_key_log {
        Some(ref path) => Ok(filter.with_processed_key_log(
            ProcessedKeyLog::open(path).map_err(UniqFilterError::ProcessedKeyLog)?,
        )),
        None => Ok(filter),
    }
}
