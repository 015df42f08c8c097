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

use crate::io::ErrorWithPath;
use std::collections::TryReserveError;
use thiserror::Error;

/// The errors of a [super::FingerprintSet]
#[derive(Debug, Error)]
pub enum FpSetError {
    #[error(transparent)]
    Io(#[from] ErrorWithPath),
    #[error("The operation {operation} is not supported by the {backend}.")]
    Unsupported {
        operation: &'static str,
        backend: &'static str,
    },
    #[error("The capacity exponent {0} is outside of 1..={1}.")]
    InvalidCapacity(u32, u32),
    #[error("The load factor {0} is outside of (0, 1).")]
    InvalidLoadFactor(f32),
    #[error("A load factor of {load_factor} leaves no usable slot in a table with 2^{capacity_power_of_two} slots.")]
    NoUsableSlots {
        capacity_power_of_two: u32,
        load_factor: f32,
    },
    #[error("A bloom filter needs at least one expected element and 1..=64 hash functions, got n={expected_elements} and d={hash_functions}.")]
    InvalidBloomParameters {
        expected_elements: u64,
        hash_functions: u32,
    },
    #[error("Can not grow a table with 2^{0} slots any further.")]
    CapacityExhausted(u32),
    #[error("Probed all {0} slots without finding a free one.")]
    TableFull(u64),
    #[error("Failed to allocate {slots} slots in memory: {source}")]
    AllocationFailed {
        slots: u64,
        #[source]
        source: TryReserveError,
    },
}

impl FpSetError {
    /// Returns true if the error was caused by the backing storage and not by a misuse.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
