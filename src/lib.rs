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

//! Tablet side transaction participant of LoomDB: tracks the transactions
//! whose intents touch a tablet, answers status queries on their behalf,
//! forwards aborts and apply outcomes to their status tablets, and persists
//! per-transaction metadata so a restarted tablet resumes participation.

pub mod clock;
pub mod keys;
pub mod protos;
pub mod rpc;
pub mod tablet;
