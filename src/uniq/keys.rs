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

use crate::fingerprint::{Fingerprinter, XxFingerprinter};
use crate::fpset::FingerprintSet;
use crate::uniq::{KeyStore, UniqFilterError};
use std::collections::HashSet;

/// Keys uris by their fingerprint in some [FingerprintSet].
#[derive(Debug, Clone)]
pub struct FingerprintKeys<S, F = XxFingerprinter> {
    set: S,
    fingerprinter: F,
}

impl<S: FingerprintSet> FingerprintKeys<S> {
    pub fn new(set: S) -> Self {
        Self::with_fingerprinter(set, XxFingerprinter::default())
    }
}

impl<S: FingerprintSet, F: Fingerprinter> FingerprintKeys<S, F> {
    pub fn with_fingerprinter(set: S, fingerprinter: F) -> Self {
        Self { set, fingerprinter }
    }

    pub fn set(&self) -> &S {
        &self.set
    }

    pub fn into_inner(self) -> S {
        self.set
    }

    #[inline]
    fn key(&self, uri: &str) -> u64 {
        self.fingerprinter.fingerprint(uri)
    }
}

impl<S: FingerprintSet, F: Fingerprinter> KeyStore for FingerprintKeys<S, F> {
    fn add_key(&mut self, uri: &str) -> Result<bool, UniqFilterError> {
        let key = self.key(uri);
        Ok(self.set.add(key)?)
    }

    fn remove_key(&mut self, uri: &str) -> Result<bool, UniqFilterError> {
        let key = self.key(uri);
        Ok(self.set.remove(key)?)
    }

    fn contains_key(&mut self, uri: &str) -> Result<bool, UniqFilterError> {
        let key = self.key(uri);
        Ok(self.set.contains(key)?)
    }

    fn key_count(&self) -> u64 {
        self.set.count()
    }

    fn flush(&mut self) -> Result<(), UniqFilterError> {
        Ok(self.set.flush()?)
    }
}

/// Keys uris by their full text. Exact, but every uri costs its length in memory.
#[derive(Debug, Clone, Default)]
pub struct LiteralKeys {
    keys: HashSet<String>,
}

impl LiteralKeys {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for LiteralKeys {
    fn add_key(&mut self, uri: &str) -> Result<bool, UniqFilterError> {
        if self.keys.contains(uri) {
            return Ok(false);
        }
        Ok(self.keys.insert(uri.to_string()))
    }

    fn remove_key(&mut self, uri: &str) -> Result<bool, UniqFilterError> {
        Ok(self.keys.remove(uri))
    }

    fn contains_key(&mut self, uri: &str) -> Result<bool, UniqFilterError> {
        Ok(self.keys.contains(uri))
    }

    fn key_count(&self) -> u64 {
        self.keys.len() as u64
    }
}
