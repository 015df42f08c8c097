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

use std::hash::Hasher;
use twox_hash::XxHash64;

/// Maps an already canonicalized uri to a 64-bit fingerprint.
///
/// The sets only rely on the high-order bits being well distributed.
pub trait Fingerprinter {
    fn fingerprint(&self, uri: &str) -> u64;
}

impl<F> Fingerprinter for F
where
    F: Fn(&str) -> u64,
{
    #[inline]
    fn fingerprint(&self, uri: &str) -> u64 {
        self(uri)
    }
}

/// xxHash64 over the bytes of the uri.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct XxFingerprinter {
    seed: u64,
}

impl XxFingerprinter {
    pub const fn with_seed(seed: u64) -> Self {
        Self { seed }
    }
}

impl Fingerprinter for XxFingerprinter {
    #[inline]
    fn fingerprint(&self, uri: &str) -> u64 {
        let mut hasher = XxHash64::with_seed(self.seed);
        hasher.write(uri.as_bytes());
        hasher.finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn is_deterministic() {
        let fingerprinter = XxFingerprinter::default();
        assert_eq!(
            fingerprinter.fingerprint("http://a/1"),
            fingerprinter.fingerprint("http://a/1")
        );
        assert_ne!(
            fingerprinter.fingerprint("http://a/1"),
            fingerprinter.fingerprint("http://a/2")
        );
    }

    #[test]
    fn seed_changes_the_fingerprint() {
        assert_ne!(
            XxFingerprinter::with_seed(1).fingerprint("http://a/1"),
            XxFingerprinter::with_seed(2).fingerprint("http://a/1")
        );
    }

    #[test]
    fn closures_are_fingerprinters() {
        let constant = |_: &str| 7u64;
        assert_eq!(constant.fingerprint("anything"), 7);
    }
}
