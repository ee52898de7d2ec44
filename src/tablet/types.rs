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
use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;

use crate::protos::{
    AbortTxnRequest,
    AbortTxnResponse,
    GetTxnStatusRequest,
    GetTxnStatusResponse,
    HybridTime,
    IsolationLevel,
    TabletId,
    TxnId,
    TxnMetadataMessage,
    TxnStatus,
    UpdateTxnRequest,
    UpdateTxnResponse,
};

#[derive(Clone, Debug, Error)]
pub enum ParticipantError {
    #[error("unknown transaction {txn_id}")]
    TxnNotFound { txn_id: TxnId },
    #[error("cannot determine transaction status at {time}, last known {status:?} at {status_time}")]
    TryAgain { time: HybridTime, status: TxnStatus, status_time: HybridTime },
    #[error("{status}")]
    GrpcError { status: tonic::Status },
    #[error("data corruption: {message}")]
    DataCorruption { message: String },
}

impl ParticipantError {
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::DataCorruption { message: message.into() }
    }
}

impl From<tonic::Status> for ParticipantError {
    fn from(status: tonic::Status) -> Self {
        Self::GrpcError { status }
    }
}

/// Status a transaction held at `status_time`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxnStatusResult {
    pub status: TxnStatus,
    pub status_time: HybridTime,
}

/// Receives the outcome of one status or abort request. Invoked exactly
/// once, never under the participant lock.
pub type TxnStatusCallback = Box<dyn FnOnce(Result<TxnStatusResult, ParticipantError>) + Send + 'static>;

/// Immutable description of a transaction touching this tablet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxnMetadata {
    pub txn_id: TxnId,
    pub isolation: IsolationLevel,
    pub status_tablet: TabletId,
    pub priority: u64,
    pub start_time: HybridTime,
}

impl TxnMetadata {
    pub fn from_message(message: &TxnMetadataMessage) -> Result<Self, ParticipantError> {
        let txn_id = TxnId::try_from(message.transaction_id.as_slice())
            .map_err(|err| ParticipantError::corrupted(format!("invalid transaction id: {err}")))?;
        let isolation = IsolationLevel::try_from(message.isolation)
            .map_err(|_| ParticipantError::corrupted(format!("unknown isolation level: {}", message.isolation)))?;
        Ok(Self {
            txn_id,
            isolation,
            status_tablet: message.status_tablet.into(),
            priority: message.priority,
            start_time: HybridTime::from_raw(message.start_hybrid_time),
        })
    }

    pub fn to_message(&self) -> TxnMetadataMessage {
        TxnMetadataMessage {
            transaction_id: self.txn_id.to_bytes().to_vec(),
            isolation: self.isolation as i32,
            status_tablet: self.status_tablet.into(),
            priority: self.priority,
            start_hybrid_time: self.start_time.into_raw(),
        }
    }
}

impl Display for TxnMetadata {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "txn(id={},isolation={},status_tablet={},priority={},start_time={})",
            self.txn_id,
            self.isolation.as_str_name(),
            self.status_tablet,
            self.priority,
            self.start_time,
        )
    }
}

/// Replica role an apply is processed under. Only the leader reports the
/// outcome back to the status tablet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessingMode {
    Leader,
    Follower,
}

/// Everything needed to apply a committed transaction to this tablet.
#[derive(Clone)]
pub struct TxnApplyData {
    pub applier: Arc<dyn IntentApplier>,
    pub txn_id: TxnId,
    pub status_tablet: TabletId,
    pub commit_time: HybridTime,
    pub mode: ProcessingMode,
}

/// Materializes a committed transaction's intents into the storage engine.
pub trait IntentApplier: Send + Sync {
    fn apply_intents(&self, data: &TxnApplyData) -> Result<()>;
}

/// Client to the transaction status tablets.
#[async_trait::async_trait]
pub trait TxnStatusClient: Send + Sync {
    async fn get_txn_status(&self, request: GetTxnStatusRequest) -> Result<GetTxnStatusResponse, tonic::Status>;

    async fn abort_txn(&self, request: AbortTxnRequest) -> Result<AbortTxnResponse, tonic::Status>;

    async fn update_txn(&self, request: UpdateTxnRequest) -> Result<UpdateTxnResponse, tonic::Status>;
}

/// Environment the enclosing tablet provides to its participant.
#[async_trait::async_trait]
pub trait TxnParticipantContext: Send + Sync {
    /// Id of the tablet this participant serves.
    fn tablet_id(&self) -> TabletId;

    /// Client to reach status tablets with. Possibly not connected yet at
    /// participant construction, hence asynchronous.
    async fn client(&self) -> Arc<dyn TxnStatusClient>;
}

#[cfg(test)]
mod tests {
    use assertor::*;

    use super::*;

    fn new_metadata() -> TxnMetadata {
        TxnMetadata {
            txn_id: TxnId::new_random(),
            isolation: IsolationLevel::Serializable,
            status_tablet: TabletId::from_raw(7),
            priority: 42,
            start_time: HybridTime::from_micros(100),
        }
    }

    #[test]
    fn test_txn_metadata_round_trip() {
        let metadata = new_metadata();
        let decoded = TxnMetadata::from_message(&metadata.to_message()).unwrap();
        assert_that!(decoded).is_equal_to(metadata);
    }

    #[test]
    fn test_txn_metadata_malformed_id() {
        let mut message = new_metadata().to_message();
        message.transaction_id.truncate(3);
        let err = TxnMetadata::from_message(&message).unwrap_err();
        assert_that!(err.to_string()).contains("invalid transaction id");
    }

    #[test]
    fn test_txn_metadata_unknown_isolation() {
        let mut message = new_metadata().to_message();
        message.isolation = 42;
        let err = TxnMetadata::from_message(&message).unwrap_err();
        assert_that!(err.to_string()).contains("unknown isolation level");
    }
}
