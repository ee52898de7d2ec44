// Copyright 2024 The LoomDB Authors.
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

use std::collections::btree_map::BTreeMap;
use std::ops::RangeFrom;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::store::{BloomFilterMode, MetadataStore, StoreIterator, WriteBatch};

/// In-memory [MetadataStore] for tests and single-node deployments.
#[derive(Default)]
pub struct MemoryStore {
    table: spin::Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
    seeks: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, batch: WriteBatch) {
        let mut table = self.table.lock();
        for (key, value) in batch.into_writes() {
            table.insert(key, value);
        }
    }

    /// Number of seeks served so far.
    pub fn seeks(&self) -> usize {
        self.seeks.load(Ordering::Relaxed)
    }
}

impl MetadataStore for MemoryStore {
    fn iterate(&self, _mode: BloomFilterMode) -> Box<dyn StoreIterator + '_> {
        Box::new(MemoryIterator { store: self, current: None })
    }
}

struct MemoryIterator<'a> {
    store: &'a MemoryStore,
    current: Option<(Vec<u8>, Vec<u8>)>,
}

impl StoreIterator for MemoryIterator<'_> {
    fn seek(&mut self, key: &[u8]) {
        self.store.seeks.fetch_add(1, Ordering::Relaxed);
        let table = self.store.table.lock();
        self.current =
            table.range(RangeFrom { start: key.to_vec() }).next().map(|(key, value)| (key.clone(), value.clone()));
    }

    fn valid(&self) -> bool {
        self.current.is_some()
    }

    fn key(&self) -> &[u8] {
        match &self.current {
            Some((key, _value)) => key,
            None => panic!("key() on invalid iterator"),
        }
    }

    fn value(&self) -> &[u8] {
        match &self.current {
            Some((_key, value)) => value,
            None => panic!("value() on invalid iterator"),
        }
    }
}

#[cfg(test)]
mod tests {
    use assertor::*;

    use super::*;

    #[test]
    fn test_memory_store_seek() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::default();
        batch.put(b"a".to_vec(), b"1".to_vec());
        batch.put(b"c".to_vec(), b"3".to_vec());
        store.apply(batch);

        let mut iter = store.iterate(BloomFilterMode::DontUseBloomFilter);

        iter.seek(b"a");
        assert_that!(iter.valid()).is_equal_to(true);
        assert_that!(iter.key()).is_equal_to(b"a".as_slice());
        assert_that!(iter.value()).is_equal_to(b"1".as_slice());

        // Seek lands on the first key at or after the target.
        iter.seek(b"b");
        assert_that!(iter.valid()).is_equal_to(true);
        assert_that!(iter.key()).is_equal_to(b"c".as_slice());

        iter.seek(b"d");
        assert_that!(iter.valid()).is_equal_to(false);

        drop(iter);
        assert_that!(store.seeks()).is_equal_to(3);
    }
}
