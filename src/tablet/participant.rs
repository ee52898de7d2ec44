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

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hashbrown::hash_map::{Entry as HashEntry, HashMap};
use prost::Message as _;
use tracing::{error, warn};

use super::store::{BloomFilterMode, MetadataStore, WriteBatch};
use super::types::{
    ParticipantError,
    ProcessingMode,
    TxnApplyData,
    TxnMetadata,
    TxnParticipantContext,
    TxnStatusCallback,
    TxnStatusResult,
};
use crate::keys;
use crate::protos::{
    AbortTxnRequest,
    AbortTxnResponse,
    GetTxnStatusRequest,
    GetTxnStatusResponse,
    HybridTime,
    TxnId,
    TxnMetadataMessage,
    TxnStateMessage,
    TxnStatus,
    UpdateTxnRequest,
};
use crate::rpc::{RpcHandle, Rpcs};

const RPC_DEADLINE: Duration = Duration::from_secs(5);

async fn with_deadline<T>(
    operation: &'static str,
    rpc: impl Future<Output = Result<T, tonic::Status>>,
) -> Result<T, tonic::Status> {
    match tokio::time::timeout(RPC_DEADLINE, rpc).await {
        Ok(result) => result,
        Err(_) => Err(tonic::Status::deadline_exceeded(format!("{operation} rpc timed out"))),
    }
}

/// Extrapolates the observation "the transaction had `known_status` at
/// `known_time`" to `time`. `None` means the observation is too stale to
/// answer and the caller has to refresh.
fn status_at(time: HybridTime, known_time: HybridTime, known_status: TxnStatus) -> Option<TxnStatus> {
    match known_status {
        // Aborts are terminal, they hold at every time.
        TxnStatus::Aborted => Some(TxnStatus::Aborted),
        // A commit at known_time means the transaction was pending before it.
        TxnStatus::Committed => match known_time <= time {
            true => Some(TxnStatus::Committed),
            false => Some(TxnStatus::Pending),
        },
        // A pending answer only extends backwards in time.
        TxnStatus::Pending => match known_time >= time {
            true => Some(TxnStatus::Pending),
            false => None,
        },
        status => panic!("transaction status {status:?} from status tablet"),
    }
}

struct StatusWaiter {
    callback: TxnStatusCallback,
    time: HybridTime,
}

/// In-memory record of one transaction with intents on this tablet. Owned
/// by the participant table and mutated in place under its lock.
struct RunningTxn {
    metadata: TxnMetadata,
    local_commit_time: HybridTime,
    last_known_status: TxnStatus,
    last_known_status_time: HybridTime,
    status_waiters: Vec<StatusWaiter>,
    abort_waiters: Vec<TxnStatusCallback>,
    get_status_handle: RpcHandle,
    abort_handle: RpcHandle,
}

impl RunningTxn {
    fn new(metadata: TxnMetadata) -> Self {
        Self {
            metadata,
            local_commit_time: HybridTime::INVALID,
            last_known_status: TxnStatus::Pending,
            last_known_status_time: HybridTime::MIN,
            status_waiters: vec![],
            abort_waiters: vec![],
            get_status_handle: RpcHandle::INVALID,
            abort_handle: RpcHandle::INVALID,
        }
    }
}

struct Participation {
    context: Arc<dyn TxnParticipantContext>,
    store: Arc<dyn MetadataStore>,
    rpcs: Rpcs,
    txns: Mutex<HashMap<TxnId, RunningTxn>>,
}

impl Participation {
    fn add(&self, message: &TxnMetadataMessage, write_batch: &mut WriteBatch) -> Result<(), ParticipantError> {
        let metadata = TxnMetadata::from_message(message)?;
        let txn_id = metadata.txn_id;
        let mut txns = self.txns.lock().unwrap();
        match txns.entry(txn_id) {
            HashEntry::Occupied(entry) => {
                assert_eq!(entry.get().metadata, metadata, "transaction {txn_id} re-added with conflicting metadata");
                return Ok(());
            },
            HashEntry::Vacant(entry) => {
                entry.insert(RunningTxn::new(metadata));
            },
        }
        drop(txns);
        write_batch.put(keys::txn_metadata_key(txn_id), message.encode_to_vec());
        Ok(())
    }

    fn metadata(&self, txn_id: TxnId) -> Option<TxnMetadata> {
        let mut txns = self.txns.lock().unwrap();
        self.find_or_load(&mut txns, txn_id).map(|txn| txn.metadata.clone())
    }

    fn local_commit_time(&self, txn_id: TxnId) -> HybridTime {
        let txns = self.txns.lock().unwrap();
        match txns.get(&txn_id) {
            None => HybridTime::INVALID,
            Some(txn) => txn.local_commit_time,
        }
    }

    fn find_or_load<'a>(
        &self,
        txns: &'a mut HashMap<TxnId, RunningTxn>,
        txn_id: TxnId,
    ) -> Option<&'a mut RunningTxn> {
        if !txns.contains_key(&txn_id) {
            let metadata = self.load(txn_id)?;
            txns.insert(txn_id, RunningTxn::new(metadata));
        }
        txns.get_mut(&txn_id)
    }

    fn load(&self, txn_id: TxnId) -> Option<TxnMetadata> {
        let key = keys::txn_metadata_key(txn_id);
        let mut iter = self.store.iterate(BloomFilterMode::DontUseBloomFilter);
        iter.seek(&key);
        if !iter.valid() || iter.key() != key {
            return None;
        }
        let message = match TxnMetadataMessage::decode(iter.value()) {
            Ok(message) => message,
            Err(err) => {
                error!("unable to decode stored metadata of transaction {txn_id}: {err}");
                return None;
            },
        };
        match TxnMetadata::from_message(&message) {
            Ok(metadata) => Some(metadata),
            Err(err) => {
                error!("loaded bad metadata of transaction {txn_id}: {err}");
                None
            },
        }
    }

    fn request_status_at(self: Arc<Self>, txn_id: TxnId, time: HybridTime, callback: TxnStatusCallback) {
        let mut txns = self.txns.lock().unwrap();
        let Some(txn) = txns.get_mut(&txn_id) else {
            drop(txns);
            callback(Err(ParticipantError::TxnNotFound { txn_id }));
            return;
        };
        if txn.last_known_status_time > HybridTime::MIN {
            if let Some(status) = status_at(time, txn.last_known_status_time, txn.last_known_status) {
                let status_time = txn.last_known_status_time;
                drop(txns);
                callback(Ok(TxnStatusResult { status, status_time }));
                return;
            }
        }
        let was_empty = txn.status_waiters.is_empty();
        txn.status_waiters.push(StatusWaiter { callback, time });
        if !was_empty {
            // A status rpc is already in flight; its completion serves this
            // waiter too.
            return;
        }
        let handle = self.rpcs.prepare();
        txn.get_status_handle = handle;
        let request = GetTxnStatusRequest {
            tablet_id: txn.metadata.status_tablet.into(),
            transaction_id: txn_id.to_bytes().to_vec(),
        };
        drop(txns);
        let context = self.context.clone();
        let participation = self.clone();
        self.rpcs.register_and_start(
            handle,
            with_deadline("get transaction status", async move {
                context.client().await.get_txn_status(request).await
            }),
            move |result| participation.status_received(txn_id, result),
        );
    }

    fn status_received(&self, txn_id: TxnId, result: Result<GetTxnStatusResponse, tonic::Status>) {
        let mut txns = self.txns.lock().unwrap();
        let Some(txn) = txns.get_mut(&txn_id) else {
            drop(txns);
            warn!("status response for unknown transaction {txn_id}");
            return;
        };
        let handle = std::mem::replace(&mut txn.get_status_handle, RpcHandle::INVALID);
        let waiters = std::mem::take(&mut txn.status_waiters);
        let response = match result {
            Err(status) => {
                drop(txns);
                self.rpcs.unregister(handle);
                let failure = ParticipantError::from(status);
                for waiter in waiters {
                    (waiter.callback)(Err(failure.clone()));
                }
                return;
            },
            Ok(response) => response,
        };
        // The status tablet reports no hybrid time only for aborted
        // transactions, which are terminal and hold at any time.
        let time = match response.status_hybrid_time {
            Some(time) => HybridTime::from_raw(time),
            None => HybridTime::MAX,
        };
        // An older observation never overwrites a newer one.
        if time >= txn.last_known_status_time {
            txn.last_known_status_time = time;
            txn.last_known_status = response.txn_status();
        }
        let (status_time, known_status) = (txn.last_known_status_time, txn.last_known_status);
        drop(txns);
        self.rpcs.unregister(handle);
        for waiter in waiters {
            match status_at(waiter.time, status_time, known_status) {
                Some(status) => (waiter.callback)(Ok(TxnStatusResult { status, status_time })),
                None => (waiter.callback)(Err(ParticipantError::TryAgain {
                    time: waiter.time,
                    status: known_status,
                    status_time,
                })),
            }
        }
    }

    fn abort(self: Arc<Self>, txn_id: TxnId, callback: TxnStatusCallback) {
        let mut txns = self.txns.lock().unwrap();
        let Some(txn) = txns.get_mut(&txn_id) else {
            drop(txns);
            callback(Err(ParticipantError::TxnNotFound { txn_id }));
            return;
        };
        let was_empty = txn.abort_waiters.is_empty();
        txn.abort_waiters.push(callback);
        if !was_empty {
            return;
        }
        let handle = self.rpcs.prepare();
        txn.abort_handle = handle;
        let request = AbortTxnRequest {
            tablet_id: txn.metadata.status_tablet.into(),
            transaction_id: txn_id.to_bytes().to_vec(),
        };
        drop(txns);
        let context = self.context.clone();
        let participation = self.clone();
        self.rpcs.register_and_start(
            handle,
            with_deadline("abort transaction", async move { context.client().await.abort_txn(request).await }),
            move |result| participation.abort_received(txn_id, result),
        );
    }

    fn abort_received(&self, txn_id: TxnId, result: Result<AbortTxnResponse, tonic::Status>) {
        let mut txns = self.txns.lock().unwrap();
        let Some(txn) = txns.get_mut(&txn_id) else {
            drop(txns);
            warn!("abort response for unknown transaction {txn_id}");
            return;
        };
        let handle = std::mem::replace(&mut txn.abort_handle, RpcHandle::INVALID);
        let waiters = std::mem::take(&mut txn.abort_waiters);
        drop(txns);
        self.rpcs.unregister(handle);
        let result = match result {
            Err(status) => Err(ParticipantError::from(status)),
            Ok(response) => Ok(TxnStatusResult { status: response.txn_status(), status_time: response.status_time() }),
        };
        for waiter in waiters {
            waiter(result.clone());
        }
    }

    fn process_apply(self: Arc<Self>, data: TxnApplyData) -> Result<(), ParticipantError> {
        if let Err(err) = data.applier.apply_intents(&data) {
            panic!("failed to apply intents of transaction {}: {err:?}", data.txn_id);
        }
        let mut txns = self.txns.lock().unwrap();
        match txns.get_mut(&data.txn_id) {
            None => {
                drop(txns);
                // Normal: either the intent write batch failed without the
                // coordinator noticing, or a previous applied notification
                // got lost and the apply is being retried. Nothing local to
                // advance either way.
                warn!("apply of unknown transaction {}", data.txn_id);
                return Ok(());
            },
            Some(txn) => txn.local_commit_time = data.commit_time,
        }
        drop(txns);
        if data.mode == ProcessingMode::Leader {
            let txn_id = data.txn_id;
            let request = UpdateTxnRequest {
                tablet_id: data.status_tablet.into(),
                state: TxnStateMessage {
                    transaction_id: txn_id.to_bytes().to_vec(),
                    status: TxnStatus::AppliedInOneOfInvolvedTablets as i32,
                    tablets: vec![self.context.tablet_id().into()],
                },
            };
            let handle = self.rpcs.prepare();
            let context = self.context.clone();
            let rpcs = self.rpcs.clone();
            self.rpcs.register_and_start(
                handle,
                with_deadline("update transaction", async move { context.client().await.update_txn(request).await }),
                move |result| {
                    rpcs.unregister(handle);
                    if let Err(status) = result {
                        // Best effort: the coordinator re-requests the apply
                        // if this notification gets lost.
                        warn!("failed to send applied status of transaction {txn_id}: {status}");
                    }
                },
            );
        }
        Ok(())
    }
}

/// Tablet-side bookkeeper of the transactions whose intents touch this
/// tablet. Tracks them in memory, answers status queries by coalescing all
/// concurrent askers into at most one rpc per transaction, forwards aborts,
/// reports apply outcomes to the status tablet and persists metadata so a
/// restarted tablet resumes participation.
pub struct TxnParticipant {
    participation: Arc<Participation>,
}

impl TxnParticipant {
    pub fn new(context: Arc<dyn TxnParticipantContext>, store: Arc<dyn MetadataStore>) -> Self {
        let participation = Participation { context, store, rpcs: Rpcs::new(), txns: Mutex::new(HashMap::new()) };
        Self { participation: Arc::new(participation) }
    }

    /// Adds a freshly written transaction. The persisted metadata record is
    /// enqueued into `write_batch`, which the caller flushes atomically with
    /// the intent write. Re-adding identical metadata is a no-op; re-adding
    /// conflicting metadata is a bug and panics.
    pub fn add(&self, message: &TxnMetadataMessage, write_batch: &mut WriteBatch) -> Result<(), ParticipantError> {
        self.participation.add(message, write_batch)
    }

    /// Metadata of the given transaction, lazily loaded from the persistent
    /// store when not in memory.
    pub fn metadata(&self, txn_id: TxnId) -> Option<TxnMetadata> {
        self.participation.metadata(txn_id)
    }

    /// Hybrid time this tablet applied the transaction at, or
    /// [HybridTime::INVALID] if it did not (yet).
    pub fn local_commit_time(&self, txn_id: TxnId) -> HybridTime {
        self.participation.local_commit_time(txn_id)
    }

    /// Reports through `callback` what status the transaction held at
    /// `time`. Served from the cached last known status when possible,
    /// otherwise from one status-tablet rpc shared by all concurrent
    /// askers of this transaction.
    pub fn request_status_at(&self, txn_id: TxnId, time: HybridTime, callback: TxnStatusCallback) {
        self.participation.clone().request_status_at(txn_id, time, callback)
    }

    /// Requests the status tablet to abort the transaction. Concurrent
    /// requests share one rpc; every callback receives the outcome.
    pub fn abort(&self, txn_id: TxnId, callback: TxnStatusCallback) {
        self.participation.clone().abort(txn_id, callback)
    }

    /// Applies a committed transaction to this tablet: materializes its
    /// intents, records the local commit time, and on the leader notifies
    /// the status tablet that this tablet is done.
    pub fn process_apply(&self, data: TxnApplyData) -> Result<(), ParticipantError> {
        self.participation.clone().process_apply(data)
    }

    /// Aborts all outstanding rpcs and drops all transaction state. Pending
    /// waiters fail with a cancellation while this runs; after it returns no
    /// callback fires anymore.
    pub async fn shutdown(&self) {
        self.participation.rpcs.shutdown().await;
        self.participation.txns.lock().unwrap().clear();
    }
}
