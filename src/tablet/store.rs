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

use crate::keys::Key;

/// Whether a lookup may consult the store's bloom filter. Seeks for keys
/// written through a foreign column family must opt out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BloomFilterMode {
    UseBloomFilter,
    DontUseBloomFilter,
}

/// Forward iterator over a persisted keyspace. `key` and `value` must only
/// be called while `valid` holds.
pub trait StoreIterator {
    fn seek(&mut self, key: &[u8]);

    fn valid(&self) -> bool;

    fn key(&self) -> &[u8];

    fn value(&self) -> &[u8];
}

/// Read side of the store the participant persists transaction metadata in.
/// Writes go through [WriteBatch]es owned and flushed by the caller.
pub trait MetadataStore: Send + Sync {
    fn iterate(&self, mode: BloomFilterMode) -> Box<dyn StoreIterator + '_>;
}

/// Ordered set of puts flushed atomically by its owner.
#[derive(Default, Debug)]
pub struct WriteBatch {
    writes: Vec<(Key, Vec<u8>)>,
}

impl WriteBatch {
    pub fn put(&mut self, key: Key, value: Vec<u8>) {
        self.writes.push((key, value));
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.writes.iter().map(|(key, value)| (key.as_slice(), value.as_slice()))
    }

    pub fn into_writes(self) -> Vec<(Key, Vec<u8>)> {
        self.writes
    }
}

#[cfg(test)]
mod tests {
    use assertor::*;

    use super::*;

    #[test]
    fn test_write_batch() {
        let mut batch = WriteBatch::default();
        assert_that!(batch.is_empty()).is_equal_to(true);

        batch.put(b"b".to_vec(), b"2".to_vec());
        batch.put(b"a".to_vec(), b"1".to_vec());
        assert_that!(batch.len()).is_equal_to(2);

        // Puts keep their insertion order.
        let writes: Vec<_> = batch.iter().collect();
        assert_that!(writes).is_equal_to(vec![
            (b"b".as_slice(), b"2".as_slice()),
            (b"a".as_slice(), b"1".as_slice()),
        ]);
    }
}
