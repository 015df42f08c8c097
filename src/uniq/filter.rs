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

use crate::fpset::{BloomFpSet, CachedDiskFpSet, DiskFpSet, MemFpSet};
use crate::uniq::{
    FingerprintKeys, KeyStore, LiteralKeys, ProcessedKeyLog, UniqFilterError, UriReceiver,
    UriUniqFilter,
};

/// Duplicate statistics are logged whenever the count crosses a multiple of this.
pub const STATS_INTERVAL: u64 = 50_000;

pub type MemUriUniqFilter<R> = SetBasedUriUniqFilter<FingerprintKeys<MemFpSet>, R>;
pub type DiskUriUniqFilter<R> = SetBasedUriUniqFilter<FingerprintKeys<DiskFpSet>, R>;
pub type CachedDiskUriUniqFilter<R> = SetBasedUriUniqFilter<FingerprintKeys<CachedDiskFpSet>, R>;
pub type BloomUriUniqFilter<R> = SetBasedUriUniqFilter<FingerprintKeys<BloomFpSet>, R>;
pub type LiteralUriUniqFilter<R> = SetBasedUriUniqFilter<LiteralKeys, R>;

/// A [UriUniqFilter] that remembers uris in a [KeyStore] and hands new
/// ones to an [UriReceiver].
#[derive(Debug)]
pub struct SetBasedUriUniqFilter<K, R> {
    keys: K,
    receiver: R,
    processed_key_log: Option<ProcessedKeyLog>,
    duplicates: u64,
    duplicates_at_last_sample: u64,
    next_sample_at: u64,
}

impl<K: KeyStore, R: UriReceiver> SetBasedUriUniqFilter<K, R> {
    pub fn new(keys: K, receiver: R) -> Self {
        Self {
            keys,
            receiver,
            processed_key_log: None,
            duplicates: 0,
            duplicates_at_last_sample: 0,
            next_sample_at: STATS_INTERVAL,
        }
    }

    pub fn with_processed_key_log(mut self, log: ProcessedKeyLog) -> Self {
        self.processed_key_log = Some(log);
        self
    }

    /// Replaces the processed key log, returns the old one.
    pub fn set_processed_key_log(
        &mut self,
        log: Option<ProcessedKeyLog>,
    ) -> Option<ProcessedKeyLog> {
        std::mem::replace(&mut self.processed_key_log, log)
    }

    /// Replaces the receiver, returns the old one.
    pub fn set_receiver(&mut self, receiver: R) -> R {
        std::mem::replace(&mut self.receiver, receiver)
    }

    pub fn receiver(&self) -> &R {
        &self.receiver
    }

    pub fn receiver_mut(&mut self) -> &mut R {
        &mut self.receiver
    }

    pub fn keys(&self) -> &K {
        &self.keys
    }

    /// Number of [UriUniqFilter::add] calls rejected as already seen.
    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }

    pub fn into_parts(self) -> (K, R) {
        (self.keys, self.receiver)
    }

    fn log_processed(&mut self, uri: &str) -> Result<(), UniqFilterError> {
        if let Some(ref mut log) = self.processed_key_log {
            log.append(uri)?;
        }
        Ok(())
    }

    fn sample_stats(&mut self) {
        let count = self.keys.key_count();
        if count < self.next_sample_at {
            return;
        }
        let recent = self.duplicates - self.duplicates_at_last_sample;
        log::debug!(
            "{count} keys, {} duplicates ({recent} since last sample)",
            self.duplicates
        );
        self.duplicates_at_last_sample = self.duplicates;
        self.next_sample_at = (count / STATS_INTERVAL + 1) * STATS_INTERVAL;
    }
}

impl<K: KeyStore, R: UriReceiver> UriUniqFilter for SetBasedUriUniqFilter<K, R> {
    fn add(&mut self, uri: &str) -> Result<bool, UniqFilterError> {
        self.log_processed(uri)?;
        if self.keys.add_key(uri)? {
            log::trace!("New: {uri}");
            self.sample_stats();
            self.receiver.receive(uri);
            Ok(true)
        } else {
            log::trace!("Duplicate: {uri}");
            self.duplicates += 1;
            Ok(false)
        }
    }

    fn add_force(&mut self, uri: &str) -> Result<(), UniqFilterError> {
        self.log_processed(uri)?;
        if self.keys.add_key(uri)? {
            self.sample_stats();
        }
        log::trace!("Forced: {uri}");
        self.receiver.receive(uri);
        Ok(())
    }

    fn note(&mut self, uri: &str) -> Result<(), UniqFilterError> {
        self.log_processed(uri)?;
        if self.keys.add_key(uri)? {
            self.sample_stats();
        }
        Ok(())
    }

    fn forget(&mut self, uri: &str) -> Result<bool, UniqFilterError> {
        if self.processed_key_log.is_some() {
            ProcessedKeyLog::check_key(uri)?;
        }
        let removed = self.keys.remove_key(uri)?;
        log::trace!("Forgot {uri}: {removed}");
        if removed {
            if let Some(ref mut log) = self.processed_key_log {
                log.append_forget(uri)?;
            }
        }
        Ok(removed)
    }

    fn count(&self) -> u64 {
        self.keys.key_count()
    }

    fn request_flush(&mut self) -> Result<u64, UniqFilterError> {
        if let Some(ref mut log) = self.processed_key_log {
            log.flush().map_err(UniqFilterError::ProcessedKeyLog)?;
        }
        self.keys.flush()?;
        Ok(self.pending())
    }

    fn close(&mut self) -> Result<(), UniqFilterError> {
        self.request_flush()?;
        log::info!(
            "Closing filter with {} keys and {} duplicates.",
            self.keys.key_count(),
            self.duplicates
        );
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fpset::FpSetError;
    use crate::uniq::MockUriReceiver;
    use camino_tempfile::Utf8TempDir;
    use mockall::predicate::eq;

    fn collecting_filter() -> MemUriUniqFilter<impl FnMut(&str)> {
        let mut seen = Vec::new();
        SetBasedUriUniqFilter::new(
            FingerprintKeys::new(MemFpSet::new(4, 0.5).unwrap()),
            move |uri: &str| seen.push(uri.to_string()),
        )
    }

    #[test]
    fn first_add_reaches_the_receiver_once() {
        let mut receiver = MockUriReceiver::new();
        receiver
            .expect_receive()
            .with(eq("http://a/1"))
            .times(1)
            .return_const(());
        let mut filter =
            SetBasedUriUniqFilter::new(FingerprintKeys::new(MemFpSet::default()), receiver);
        assert!(filter.add("http://a/1").unwrap());
        assert!(!filter.add("http://a/1").unwrap());
        assert!(!filter.add_now("http://a/1").unwrap());
        assert_eq!(filter.duplicates(), 2);
    }

    #[test]
    fn noted_uris_never_reach_the_receiver() {
        let mut receiver = MockUriReceiver::new();
        receiver.expect_receive().times(0);
        let mut filter = SetBasedUriUniqFilter::new(LiteralKeys::new(), receiver);
        filter.note("http://a/1").unwrap();
        assert!(!filter.add("http://a/1").unwrap());
        assert_eq!(filter.count(), 1);
    }

    #[test]
    fn forced_uris_always_reach_the_receiver() {
        let mut receiver = MockUriReceiver::new();
        receiver
            .expect_receive()
            .with(eq("http://a/1"))
            .times(3)
            .return_const(());
        let mut filter =
            SetBasedUriUniqFilter::new(FingerprintKeys::new(MemFpSet::default()), receiver);
        filter.add("http://a/1").unwrap();
        filter.add_force("http://a/1").unwrap();
        filter.add_force("http://a/1").unwrap();
        assert_eq!(filter.count(), 1);
    }

    #[test]
    fn forget_lets_a_uri_through_again() {
        let mut received = 0u32;
        {
            let mut filter = SetBasedUriUniqFilter::new(
                FingerprintKeys::new(MemFpSet::new(4, 0.5).unwrap()),
                |_: &str| received += 1,
            );
            assert!(filter.add("http://a/1").unwrap());
            assert_eq!(filter.count(), 1);
            assert!(!filter.add("http://a/1").unwrap());
            assert_eq!(filter.count(), 1);
            assert!(filter.forget("http://a/1").unwrap());
            assert_eq!(filter.count(), 0);
            assert!(!filter.forget("http://a/1").unwrap());
            assert!(filter.add("http://a/1").unwrap());
            assert_eq!(filter.count(), 1);
            assert_eq!(filter.pending(), 0);
            assert_eq!(filter.request_flush().unwrap(), 0);
        }
        assert_eq!(received, 2);
    }

    #[test]
    fn receiver_can_be_replaced() {
        let mut first = MockUriReceiver::new();
        first
            .expect_receive()
            .with(eq("http://a/1"))
            .times(1)
            .return_const(());
        let mut second = MockUriReceiver::new();
        second
            .expect_receive()
            .with(eq("http://a/2"))
            .times(1)
            .return_const(());
        let mut filter = SetBasedUriUniqFilter::new(LiteralKeys::new(), first);
        filter.add("http://a/1").unwrap();
        let mut first = filter.set_receiver(second);
        first.checkpoint();
        filter.add("http://a/2").unwrap();
        filter.add("http://a/1").unwrap();
        let (keys, mut second) = filter.into_parts();
        second.checkpoint();
        assert_eq!(keys.key_count(), 2);
    }

    #[test]
    fn many_uris_stay_unique() {
        let mut filter = collecting_filter();
        for i in 0..1000 {
            assert!(filter.add(&format!("http://a/{i}")).unwrap());
        }
        for i in 0..1000 {
            assert!(!filter.add(&format!("http://a/{i}")).unwrap());
        }
        assert_eq!(filter.count(), 1000);
        assert_eq!(filter.duplicates(), 1000);
    }

    #[test]
    fn bloom_filter_can_not_forget() {
        let mut filter = SetBasedUriUniqFilter::new(
            FingerprintKeys::new(BloomFpSet::new(1000, 10).unwrap()),
            |_: &str| {},
        );
        filter.add("http://a/1").unwrap();
        assert!(matches!(
            filter.forget("http://a/1"),
            Err(UniqFilterError::Set(FpSetError::Unsupported { .. }))
        ));
        assert!(!filter.add("http://a/1").unwrap());
    }

    #[test]
    fn disk_filter_works_like_memory_filter() {
        let dir = Utf8TempDir::new().unwrap();
        let disk = DiskFpSet::create(dir.path().join("seen.fps"), 4, 0.75).unwrap();
        let mut disk_filter = SetBasedUriUniqFilter::new(FingerprintKeys::new(disk), |_: &str| {});
        let mut mem_filter = collecting_filter();
        for i in 0..200 {
            let uri = format!("http://a/{}", i % 150);
            assert_eq!(disk_filter.add(&uri).unwrap(), mem_filter.add(&uri).unwrap());
        }
        assert_eq!(disk_filter.count(), 150);
        disk_filter.close().unwrap();
    }

    #[test]
    fn processed_keys_can_be_replayed() {
        let dir = Utf8TempDir::new().unwrap();
        let path = dir.path().join("processed.log");
        {
            let mut filter = SetBasedUriUniqFilter::new(LiteralKeys::new(), |_: &str| {})
                .with_processed_key_log(ProcessedKeyLog::open(&path).unwrap());
            filter.add("http://a/1").unwrap();
            filter.add("http://a/1").unwrap();
            filter.note("http://a/2").unwrap();
            filter.add_force("http://a/3").unwrap();
            assert!(filter.forget("http://a/3").unwrap());
            // nothing removed, nothing logged
            assert!(!filter.forget("http://a/5").unwrap());
            filter.close().unwrap();
        }
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "http://a/1\nhttp://a/1\nhttp://a/2\nhttp://a/3\n-\thttp://a/3\n"
        );

        let mut receiver = MockUriReceiver::new();
        receiver
            .expect_receive()
            .with(eq("http://a/3"))
            .times(1)
            .return_const(());
        receiver
            .expect_receive()
            .with(eq("http://a/4"))
            .times(1)
            .return_const(());
        let mut filter =
            SetBasedUriUniqFilter::new(FingerprintKeys::new(MemFpSet::default()), receiver);
        assert_eq!(ProcessedKeyLog::replay(&path, &mut filter).unwrap(), 5);
        assert_eq!(filter.count(), 2);
        assert!(!filter.add("http://a/1").unwrap());
        assert!(filter.add("http://a/3").unwrap());
        assert!(filter.add("http://a/4").unwrap());
    }

    #[test]
    fn forgotten_keys_stay_forgotten_after_a_restart() {
        let dir = Utf8TempDir::new().unwrap();
        let path = dir.path().join("processed.log");
        {
            let mut filter = SetBasedUriUniqFilter::new(
                FingerprintKeys::new(MemFpSet::default()),
                |_: &str| {},
            )
            .with_processed_key_log(ProcessedKeyLog::open(&path).unwrap());
            assert!(filter.add("http://a/1").unwrap());
            assert!(filter.forget("http://a/1").unwrap());
            filter.close().unwrap();
        }
        let mut filter = SetBasedUriUniqFilter::new(
            FingerprintKeys::new(MemFpSet::default()),
            |_: &str| {},
        );
        ProcessedKeyLog::replay(&path, &mut filter).unwrap();
        assert_eq!(filter.count(), 0);
        assert!(filter.add("http://a/1").unwrap());
    }

    #[test]
    fn logged_filters_reject_unloggable_keys() {
        let dir = Utf8TempDir::new().unwrap();
        let path = dir.path().join("processed.log");
        let mut filter = SetBasedUriUniqFilter::new(LiteralKeys::new(), |_: &str| {})
            .with_processed_key_log(ProcessedKeyLog::open(&path).unwrap());
        assert!(matches!(
            filter.add("http://a/1\nhttp://a/2"),
            Err(UniqFilterError::UnloggableKey(_))
        ));
        assert_eq!(filter.count(), 0);

        let mut unlogged = SetBasedUriUniqFilter::new(LiteralKeys::new(), |_: &str| {});
        assert!(unlogged.add(" http://a/1").unwrap());
        let (keys, _) = unlogged.into_parts();
        let mut filter = SetBasedUriUniqFilter::new(keys, |_: &str| {})
            .with_processed_key_log(ProcessedKeyLog::open(&path).unwrap());
        assert!(matches!(
            filter.forget(" http://a/1"),
            Err(UniqFilterError::UnloggableKey(_))
        ));
        assert_eq!(filter.count(), 1);
        filter.close().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
