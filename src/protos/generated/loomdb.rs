#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TxnMetadataMessage {
    #[prost(bytes = "vec", tag = "1")]
    pub transaction_id: ::prost::alloc::vec::Vec<u8>,
    #[prost(enumeration = "IsolationLevel", tag = "2")]
    pub isolation: i32,
    #[prost(uint64, tag = "3")]
    pub status_tablet: u64,
    #[prost(uint64, tag = "4")]
    pub priority: u64,
    #[prost(uint64, tag = "5")]
    pub start_hybrid_time: u64,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetTxnStatusRequest {
    #[prost(uint64, tag = "1")]
    pub tablet_id: u64,
    #[prost(bytes = "vec", tag = "2")]
    pub transaction_id: ::prost::alloc::vec::Vec<u8>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetTxnStatusResponse {
    #[prost(enumeration = "TxnStatus", tag = "1")]
    pub status: i32,
    #[prost(uint64, optional, tag = "2")]
    pub status_hybrid_time: ::core::option::Option<u64>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AbortTxnRequest {
    #[prost(uint64, tag = "1")]
    pub tablet_id: u64,
    #[prost(bytes = "vec", tag = "2")]
    pub transaction_id: ::prost::alloc::vec::Vec<u8>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AbortTxnResponse {
    #[prost(enumeration = "TxnStatus", tag = "1")]
    pub status: i32,
    #[prost(uint64, optional, tag = "2")]
    pub status_hybrid_time: ::core::option::Option<u64>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TxnStateMessage {
    #[prost(bytes = "vec", tag = "1")]
    pub transaction_id: ::prost::alloc::vec::Vec<u8>,
    #[prost(enumeration = "TxnStatus", tag = "2")]
    pub status: i32,
    #[prost(uint64, repeated, tag = "3")]
    pub tablets: ::prost::alloc::vec::Vec<u64>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateTxnRequest {
    #[prost(uint64, tag = "1")]
    pub tablet_id: u64,
    #[prost(message, required, tag = "2")]
    pub state: TxnStateMessage,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateTxnResponse {}
#[derive(::num_enum::TryFromPrimitive)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TxnStatus {
    Pending = 0,
    Committed = 1,
    Aborted = 2,
    AppliedInOneOfInvolvedTablets = 3,
}
impl TxnStatus {
    /// String value of the enum field names used in the ProtoBuf definition.
    ///
    /// The values are not transformed in any way and thus are considered stable
    /// (if the ProtoBuf definition does not change) and safe for programmatic use.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            TxnStatus::Pending => "Pending",
            TxnStatus::Committed => "Committed",
            TxnStatus::Aborted => "Aborted",
            TxnStatus::AppliedInOneOfInvolvedTablets => "AppliedInOneOfInvolvedTablets",
        }
    }
    /// Creates an enum from field names used in the ProtoBuf definition.
    pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
        match value {
            "Pending" => Some(Self::Pending),
            "Committed" => Some(Self::Committed),
            "Aborted" => Some(Self::Aborted),
            "AppliedInOneOfInvolvedTablets" => Some(Self::AppliedInOneOfInvolvedTablets),
            _ => None,
        }
    }
}
#[derive(::num_enum::TryFromPrimitive)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum IsolationLevel {
    Snapshot = 0,
    Serializable = 1,
}
impl IsolationLevel {
    /// String value of the enum field names used in the ProtoBuf definition.
    ///
    /// The values are not transformed in any way and thus are considered stable
    /// (if the ProtoBuf definition does not change) and safe for programmatic use.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            IsolationLevel::Snapshot => "Snapshot",
            IsolationLevel::Serializable => "Serializable",
        }
    }
    /// Creates an enum from field names used in the ProtoBuf definition.
    pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
        match value {
            "Snapshot" => Some(Self::Snapshot),
            "Serializable" => Some(Self::Serializable),
            _ => None,
        }
    }
}
