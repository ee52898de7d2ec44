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

use crate::protos::TxnId;

/// Prefix of all provisional state in a tablet keyspace: intents and the
/// per-transaction metadata records beside them.
pub const INTENT_KEY_PREFIX: &[u8] = &[b'i'];
/// Prefix of persisted transaction metadata records: the intent prefix
/// followed by the transaction-id key type.
pub const TXN_METADATA_KEY_PREFIX: &[u8] = &[b'i', b'x'];
pub const MAX_KEY: &[u8] = &[0xffu8];

pub type Key = Vec<u8>;

pub fn txn_metadata_key(id: TxnId) -> Key {
    let bytes = id.to_bytes();
    let mut buf = Vec::with_capacity(TXN_METADATA_KEY_PREFIX.len() + bytes.len());
    buf.extend_from_slice(TXN_METADATA_KEY_PREFIX);
    buf.extend_from_slice(&bytes);
    buf
}

#[cfg(test)]
mod tests {
    use assertor::*;

    use crate::keys::*;

    #[test]
    fn test_keys_invariants() {
        assert_that!(INTENT_KEY_PREFIX).is_less_than(TXN_METADATA_KEY_PREFIX);
        assert_that!(TXN_METADATA_KEY_PREFIX).is_less_than(MAX_KEY);
        assert_that!(TXN_METADATA_KEY_PREFIX.starts_with(INTENT_KEY_PREFIX)).is_equal_to(true);
    }

    #[test]
    fn test_keys_txn_metadata_key() {
        let id = TxnId::new_random();
        let key = txn_metadata_key(id);
        assert_that!(key.starts_with(TXN_METADATA_KEY_PREFIX)).is_equal_to(true);
        assert_that!(key.len()).is_equal_to(TXN_METADATA_KEY_PREFIX.len() + 16);
        assert_that!(key.as_slice()).is_less_than(MAX_KEY);
    }

    #[test]
    fn test_keys_txn_metadata_key_injective() {
        let a = TxnId::new_random();
        let b = TxnId::new_random();
        assert_that!(txn_metadata_key(a)).is_not_equal_to(txn_metadata_key(b));
        assert_that!(txn_metadata_key(a)).is_equal_to(txn_metadata_key(a));
    }

    #[test]
    fn test_keys_txn_metadata_key_order() {
        let mut small = [0u8; 16];
        small[15] = 1;
        let mut large = [0u8; 16];
        large[0] = 1;
        let small_key = txn_metadata_key(TxnId::from_bytes(small));
        let large_key = txn_metadata_key(TxnId::from_bytes(large));
        assert_that!(small_key.as_slice()).is_less_than(large_key.as_slice());
        // Keys have fixed width, so one key prefixing another means equality.
        assert_that!(large_key.starts_with(&small_key)).is_equal_to(false);
    }
}
