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

use crate::fpset::FpSetError;

/// A set of 64-bit fingerprints.
///
/// None of the implementations are synchronized. Every mutating call takes
/// `&mut self`, lookups too, because caches and disk cursors change on reads.
pub trait FingerprintSet {
    /// Returns true if [fp] is in the set.
    fn contains(&mut self, fp: u64) -> Result<bool, FpSetError>;

    /// Adds [fp]. Returns true iff it was not present before.
    fn add(&mut self, fp: u64) -> Result<bool, FpSetError>;

    /// Removes [fp]. Returns true iff it was present.
    fn remove(&mut self, fp: u64) -> Result<bool, FpSetError>;

    /// The number of fingerprints in the set.
    fn count(&self) -> u64;

    /// A cheap check without touching slow storage.
    /// `true` is definitive, `false` only means "unknown".
    fn quick_contains(&mut self, _fp: u64) -> bool {
        false
    }

    /// Writes everything buffered to the backing storage.
    fn flush(&mut self) -> Result<(), FpSetError> {
        Ok(())
    }
}

impl<T: FingerprintSet + ?Sized> FingerprintSet for Box<T> {
    fn contains(&mut self, fp: u64) -> Result<bool, FpSetError> {
        (**self).contains(fp)
    }

    fn add(&mut self, fp: u64) -> Result<bool, FpSetError> {
        (**self).add(fp)
    }

    fn remove(&mut self, fp: u64) -> Result<bool, FpSetError> {
        (**self).remove(fp)
    }

    fn count(&self) -> u64 {
        (**self).count()
    }

    fn quick_contains(&mut self, fp: u64) -> bool {
        (**self).quick_contains(fp)
    }

    fn flush(&mut self) -> Result<(), FpSetError> {
        (**self).flush()
    }
}
