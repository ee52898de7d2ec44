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

use std::fmt::{self, Display, Formatter};

/// Fixed-width 128 bit transaction id. Ordering is lexicographic on the raw
/// bytes, which is also the order of the keys it gets encoded into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct TxnId([u8; 16]);

impl TxnId {
    pub fn new_random() -> Self {
        uuid::Uuid::new_v4().into()
    }

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub const fn to_bytes(self) -> [u8; 16] {
        self.0
    }
}

impl From<uuid::Uuid> for TxnId {
    fn from(id: uuid::Uuid) -> Self {
        Self(id.into_bytes())
    }
}

impl From<TxnId> for uuid::Uuid {
    fn from(id: TxnId) -> Self {
        uuid::Uuid::from_bytes(id.0)
    }
}

impl TryFrom<&[u8]> for TxnId {
    type Error = uuid::Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        uuid::Uuid::from_slice(bytes).map(Self::from)
    }
}

impl Display for TxnId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        uuid::Uuid::from(*self).fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use assertor::*;

    use super::*;

    #[test]
    fn test_txn_id_bytes() {
        let id = TxnId::new_random();
        assert_that!(TxnId::from_bytes(id.to_bytes())).is_equal_to(id);
        assert_that!(TxnId::try_from(id.to_bytes().as_slice()).unwrap()).is_equal_to(id);
    }

    #[test]
    fn test_txn_id_order() {
        let mut small = [0u8; 16];
        small[15] = 1;
        let mut large = [0u8; 16];
        large[0] = 1;
        assert_that!(TxnId::from_bytes(small)).is_less_than(TxnId::from_bytes(large));
    }

    #[test]
    fn test_txn_id_malformed() {
        assert_that!(TxnId::try_from([1u8, 2, 3].as_slice()).is_err()).is_equal_to(true);
    }
}
