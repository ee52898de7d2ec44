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

//! Generated code for protobuf messages plus hand-written helpers.

#[rustfmt::skip]
mod generated;
mod hybrid_time;
mod txn_id;

use std::fmt::{Display, Error, Formatter};

pub use self::generated::*;
pub use self::hybrid_time::HybridTime;
pub use self::txn_id::TxnId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct TabletId(u64);

impl From<u64> for TabletId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<TabletId> for u64 {
    fn from(id: TabletId) -> Self {
        id.0
    }
}

impl Display for TabletId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        f.write_fmt(format_args!("{:#x}", self.0))
    }
}

impl TabletId {
    pub fn into_raw(self) -> u64 {
        self.0
    }

    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }
}

fn txn_status_from_wire(status: i32) -> TxnStatus {
    match TxnStatus::try_from(status) {
        Ok(status) => status,
        // A status tablet never reports anything outside the enum; seeing it
        // means a version skew bug or corruption.
        Err(_) => panic!("unknown transaction status: {status}"),
    }
}

impl GetTxnStatusResponse {
    pub fn txn_status(&self) -> TxnStatus {
        txn_status_from_wire(self.status)
    }
}

impl AbortTxnResponse {
    pub fn txn_status(&self) -> TxnStatus {
        txn_status_from_wire(self.status)
    }

    pub fn status_time(&self) -> HybridTime {
        match self.status_hybrid_time {
            Some(time) => HybridTime::from_raw(time),
            None => HybridTime::INVALID,
        }
    }
}
