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

/// Hybrid logical timestamp: physical microseconds since the unix epoch
/// shifted left by [HybridTime::LOGICAL_BITS], or-ed with a logical counter
/// for events inside the same microsecond.
///
/// `MIN` sorts before all real times, `MAX` after all. `INVALID` means "not
/// set" and is never compared semantically, only checked through
/// [HybridTime::is_valid].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct HybridTime(u64);

impl HybridTime {
    pub const INVALID: Self = HybridTime(u64::MAX);
    pub const LOGICAL_BITS: u32 = 12;
    const LOGICAL_MASK: u64 = (1 << Self::LOGICAL_BITS) - 1;
    pub const MAX: Self = HybridTime(u64::MAX - 1);
    pub const MIN: Self = HybridTime(0);

    pub const fn new(micros: u64, logical: u32) -> Self {
        Self((micros << Self::LOGICAL_BITS) | (logical as u64 & Self::LOGICAL_MASK))
    }

    pub const fn from_micros(micros: u64) -> Self {
        Self(micros << Self::LOGICAL_BITS)
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u64 {
        self.0
    }

    pub const fn is_valid(&self) -> bool {
        self.0 != Self::INVALID.0
    }

    pub const fn physical_micros(&self) -> u64 {
        self.0 >> Self::LOGICAL_BITS
    }

    pub const fn logical(&self) -> u32 {
        (self.0 & Self::LOGICAL_MASK) as u32
    }

    /// Smallest hybrid time greater than this one.
    pub const fn tick(self) -> Self {
        Self(self.0 + 1)
    }
}

impl Display for HybridTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            Self::INVALID => f.write_str("<invalid>"),
            Self::MAX => f.write_str("<max>"),
            Self::MIN => f.write_str("<min>"),
            _ => write!(f, "{{ physical: {} logical: {} }}", self.physical_micros(), self.logical()),
        }
    }
}

#[cfg(test)]
mod tests {
    use assertor::*;

    use super::*;

    #[test]
    fn test_hybrid_time_order() {
        assert_that!(HybridTime::MIN).is_less_than(HybridTime::from_micros(1));
        assert_that!(HybridTime::from_micros(1)).is_less_than(HybridTime::MAX);

        assert_that!(HybridTime::from_micros(5)).is_less_than(HybridTime::new(5, 1));
        assert_that!(HybridTime::new(5, 4095)).is_less_than(HybridTime::from_micros(6));
    }

    #[test]
    fn test_hybrid_time_validity() {
        assert_that!(HybridTime::MIN.is_valid()).is_equal_to(true);
        assert_that!(HybridTime::MAX.is_valid()).is_equal_to(true);
        assert_that!(HybridTime::from_micros(100).is_valid()).is_equal_to(true);
        assert_that!(HybridTime::INVALID.is_valid()).is_equal_to(false);
    }

    #[test]
    fn test_hybrid_time_raw() {
        let time = HybridTime::new(100, 7);
        assert_that!(HybridTime::from_raw(time.into_raw())).is_equal_to(time);
        assert_that!(time.physical_micros()).is_equal_to(100);
        assert_that!(time.logical()).is_equal_to(7);
    }

    #[test]
    fn test_hybrid_time_tick() {
        let time = HybridTime::from_micros(100);
        assert_that!(time.tick()).is_greater_than(time);
        assert_that!(time.tick()).is_equal_to(HybridTime::new(100, 1));
    }
}
