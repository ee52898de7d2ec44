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

use std::sync::Arc;
use std::time::SystemTime;

use static_assertions::{assert_impl_all, assert_not_impl_any};

pub use crate::protos::HybridTime;

/// Monotonic hybrid time source. `now` never repeats and never goes
/// backwards; `update` absorbs times observed from other nodes so local
/// reads never run behind them.
#[derive(Clone)]
pub struct Clock {
    inner: Arc<HybridTimeClock>,
}

impl Clock {
    pub fn new() -> Self {
        Self { inner: Arc::new(HybridTimeClock::new()) }
    }

    pub fn now(&self) -> HybridTime {
        self.inner.now()
    }

    pub fn update(&self, time: HybridTime) {
        self.inner.update(time)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

fn system_time_now() -> HybridTime {
    let elapsed = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap();
    HybridTime::from_micros(elapsed.as_micros() as u64)
}

struct HybridTimeClock {
    mutex: spin::Mutex<HybridTime>,
}

assert_impl_all!(HybridTimeClock: Send, Sync);
assert_not_impl_any!(HybridTimeClock: Clone, Copy);

impl HybridTimeClock {
    fn new() -> Self {
        Self { mutex: spin::Mutex::new(system_time_now()) }
    }

    fn now(&self) -> HybridTime {
        let mut now = system_time_now();
        let mut cache = self.mutex.lock();
        if now <= *cache {
            *cache = cache.tick();
            now = *cache;
        } else {
            *cache = now;
        }
        now
    }

    fn update(&self, time: HybridTime) {
        // MAX and INVALID are sentinels, not observations.
        if time >= HybridTime::MAX {
            return;
        }
        let mut cache = self.mutex.lock();
        if time > *cache {
            *cache = time;
        }
    }
}

#[cfg(test)]
mod tests {
    use assertor::*;

    use super::*;

    #[test]
    fn test_clock_monotonic() {
        let clock = Clock::new();
        let mut old = clock.now();
        for _ in 0..5000 {
            let now = clock.now();
            assert_that!(now).is_greater_than(old);
            old = now;
        }
    }

    #[test]
    fn test_clock_advance() {
        let clock = Clock::new();
        let future = HybridTime::from_micros(clock.now().physical_micros() + 3_000_000_000);
        clock.update(future);
        let now = clock.now();
        assert_that!(now).is_greater_than(future);
    }

    #[test]
    fn test_clock_ignores_sentinels() {
        let clock = Clock::new();
        clock.update(HybridTime::MAX);
        clock.update(HybridTime::INVALID);
        assert_that!(clock.now()).is_less_than(HybridTime::MAX);
    }
}
