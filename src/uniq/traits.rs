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

use crate::uniq::UniqFilterError;

/// Receives every uri an [UriUniqFilter] sees for the first time.
/// Usually enqueues it for fetching.
#[cfg_attr(test, mockall::automock)]
pub trait UriReceiver {
    fn receive(&mut self, uri: &str);
}

impl<F> UriReceiver for F
where
    F: FnMut(&str),
{
    #[inline]
    fn receive(&mut self, uri: &str) {
        self(uri)
    }
}

/// Stores the keys derived from uris.
pub trait KeyStore {
    /// Records the key of [uri]. Returns true iff it was not recorded before.
    fn add_key(&mut self, uri: &str) -> Result<bool, UniqFilterError>;

    /// Forgets the key of [uri]. Returns true iff it was recorded.
    fn remove_key(&mut self, uri: &str) -> Result<bool, UniqFilterError>;

    /// Returns true if the key of [uri] is recorded.
    fn contains_key(&mut self, uri: &str) -> Result<bool, UniqFilterError>;

    /// The number of recorded keys.
    fn key_count(&self) -> u64;

    fn flush(&mut self) -> Result<(), UniqFilterError> {
        Ok(())
    }
}

impl<T: KeyStore + ?Sized> KeyStore for Box<T> {
    fn add_key(&mut self, uri: &str) -> Result<bool, UniqFilterError> {
        (**self).add_key(uri)
    }

    fn remove_key(&mut self, uri: &str) -> Result<bool, UniqFilterError> {
        (**self).remove_key(uri)
    }

    fn contains_key(&mut self, uri: &str) -> Result<bool, UniqFilterError> {
        (**self).contains_key(uri)
    }

    fn key_count(&self) -> u64 {
        (**self).key_count()
    }

    fn flush(&mut self) -> Result<(), UniqFilterError> {
        (**self).flush()
    }
}

/// The gate that lets every distinct uri through at most once.
///
/// Implementations are not synchronized, a shared filter needs an external lock.
pub trait UriUniqFilter {
    /// Hands [uri] to the receiver iff it was not seen before.
    /// Returns true if the receiver was called.
    fn add(&mut self, uri: &str) -> Result<bool, UniqFilterError>;

    /// Like [UriUniqFilter::add]. Reserved for filters that buffer and need an
    /// explicit synchronous variant, none of the filters here buffer.
    fn add_now(&mut self, uri: &str) -> Result<bool, UniqFilterError> {
        self.add(uri)
    }

    /// Records [uri] and hands it to the receiver, seen or not.
    fn add_force(&mut self, uri: &str) -> Result<(), UniqFilterError>;

    /// Records [uri] as seen without calling the receiver.
    fn note(&mut self, uri: &str) -> Result<(), UniqFilterError>;

    /// Forgets [uri], the next [UriUniqFilter::add] lets it through again.
    /// Returns true if it was recorded.
    fn forget(&mut self, uri: &str) -> Result<bool, UniqFilterError>;

    /// The number of distinct uris recorded as seen.
    fn count(&self) -> u64;

    /// Number of operations not yet applied.
    fn pending(&self) -> u64 {
        0
    }

    /// Writes everything buffered and returns [UriUniqFilter::pending].
    fn request_flush(&mut self) -> Result<u64, UniqFilterError>;

    /// Flushes for the last time.
    fn close(&mut self) -> Result<(), UniqFilterError>;
}
