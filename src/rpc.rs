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

//! Registry of outstanding outbound rpcs.

use std::future::Future;
use std::sync::{Arc, Mutex};

use hashbrown::HashMap;
use ignore_result::Ignore;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tonic::Status;

/// Opaque handle to one outstanding rpc in [Rpcs].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct RpcHandle(u64);

impl RpcHandle {
    pub const INVALID: Self = RpcHandle(0);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

struct RegisteredRpc {
    cancel: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct Registry {
    closed: bool,
    next_handle: u64,
    rpcs: HashMap<u64, RegisteredRpc>,
}

/// Tracks outbound rpcs so they can be aborted collectively. Every
/// registered rpc runs its completion exactly once, aborted or not, and
/// [Rpcs::abort]/[Rpcs::shutdown] return only after the completions of the
/// aborted rpcs have run.
#[derive(Clone, Default)]
pub struct Rpcs {
    registry: Arc<Mutex<Registry>>,
}

impl Rpcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a slot for an rpc about to be constructed. Returns
    /// [RpcHandle::INVALID] once the registry is shut down.
    pub fn prepare(&self) -> RpcHandle {
        let mut registry = self.registry.lock().unwrap();
        if registry.closed {
            return RpcHandle::INVALID;
        }
        registry.next_handle += 1;
        let handle = RpcHandle(registry.next_handle);
        registry.rpcs.insert(handle.0, RegisteredRpc { cancel: None, task: None });
        handle
    }

    /// Registers `rpc` under a prepared `handle` and starts it. `complete`
    /// runs on the rpc outcome, or on `Status::cancelled` if the slot was
    /// aborted before the rpc finished or the registry is already shut down.
    pub fn register_and_start<T, F, C>(&self, handle: RpcHandle, rpc: F, complete: C)
    where
        T: Send + 'static,
        F: Future<Output = Result<T, Status>> + Send + 'static,
        C: FnOnce(Result<T, Status>) + Send + 'static, {
        let mut registry = self.registry.lock().unwrap();
        match (registry.closed, registry.rpcs.get_mut(&handle.0)) {
            (false, Some(registered)) => {
                let (cancel, cancelled) = oneshot::channel();
                let task = tokio::spawn(async move {
                    let result = tokio::select! {
                        _ = cancelled => Err(Status::cancelled("rpc aborted")),
                        result = rpc => result,
                    };
                    complete(result);
                });
                registered.cancel = Some(cancel);
                registered.task = Some(task);
            },
            _ => {
                drop(registry);
                complete(Err(Status::cancelled("rpc registry shut down")));
            },
        }
    }

    /// Removes `handle` from the registry. Called exactly once from the
    /// completion path of every registered rpc; tolerates slots already
    /// removed by [Rpcs::abort] and ignores [RpcHandle::INVALID].
    pub fn unregister(&self, handle: RpcHandle) {
        if !handle.is_valid() {
            return;
        }
        let removed = self.registry.lock().unwrap().rpcs.remove(&handle.0);
        drop(removed);
    }

    /// Cancels the given rpcs and waits until their completions have run.
    pub async fn abort(&self, handles: impl IntoIterator<Item = RpcHandle>) {
        let mut aborted = vec![];
        {
            let mut registry = self.registry.lock().unwrap();
            for handle in handles {
                if let Some(rpc) = registry.rpcs.remove(&handle.0) {
                    aborted.push(rpc);
                }
            }
        }
        Self::finish(aborted).await
    }

    /// Aborts all outstanding rpcs and fails every later registration.
    pub async fn shutdown(&self) {
        let aborted = {
            let mut registry = self.registry.lock().unwrap();
            registry.closed = true;
            registry.rpcs.drain().map(|(_, rpc)| rpc).collect()
        };
        Self::finish(aborted).await
    }

    async fn finish(rpcs: Vec<RegisteredRpc>) {
        for rpc in rpcs {
            if let Some(cancel) = rpc.cancel {
                cancel.send(()).ignore();
            }
            if let Some(task) = rpc.task {
                task.await.ignore();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assertor::*;
    use tokio::sync::oneshot;

    use super::*;

    #[tokio::test]
    async fn test_rpcs_complete() {
        let rpcs = Rpcs::new();
        let handle = rpcs.prepare();
        assert_that!(handle.is_valid()).is_equal_to(true);

        let (sender, receiver) = oneshot::channel();
        let completion_rpcs = rpcs.clone();
        rpcs.register_and_start(handle, async { Ok(5) }, move |result: Result<i32, Status>| {
            completion_rpcs.unregister(handle);
            sender.send(result).ignore();
        });
        assert_that!(receiver.await.unwrap().unwrap()).is_equal_to(5);
    }

    #[tokio::test]
    async fn test_rpcs_abort_waits_for_completion() {
        let rpcs = Rpcs::new();
        let handle = rpcs.prepare();
        let (sender, mut receiver) = oneshot::channel();
        rpcs.register_and_start(handle, std::future::pending::<Result<(), Status>>(), move |result| {
            sender.send(result).ignore();
        });

        rpcs.abort([handle]).await;

        // The completion already ran when abort returned.
        let result = receiver.try_recv().unwrap();
        assert_that!(result.unwrap_err().code()).is_equal_to(tonic::Code::Cancelled);
    }

    #[tokio::test]
    async fn test_rpcs_shutdown_blocks_registration() {
        let rpcs = Rpcs::new();
        rpcs.shutdown().await;

        assert_that!(rpcs.prepare().is_valid()).is_equal_to(false);

        let (sender, mut receiver) = oneshot::channel();
        rpcs.register_and_start(RpcHandle::INVALID, async { Ok(()) }, move |result| {
            sender.send(result).ignore();
        });
        let result = receiver.try_recv().unwrap();
        assert_that!(result.unwrap_err().code()).is_equal_to(tonic::Code::Cancelled);
    }

    #[tokio::test]
    async fn test_rpcs_abort_prepared_slot() {
        let rpcs = Rpcs::new();
        let handle = rpcs.prepare();
        rpcs.abort([handle]).await;

        // Registration after the slot got aborted fails immediately.
        let (sender, mut receiver) = oneshot::channel();
        rpcs.register_and_start(handle, async { Ok(()) }, move |result| {
            sender.send(result).ignore();
        });
        let result = receiver.try_recv().unwrap();
        assert_that!(result.unwrap_err().code()).is_equal_to(tonic::Code::Cancelled);
    }
}
