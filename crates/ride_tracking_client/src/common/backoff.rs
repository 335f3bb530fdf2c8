/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct BackoffConfig {
    /// Normal cadence of the loop in seconds. Doubles per consecutive failure.
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
    /// Consecutive failures after which a single warning is surfaced.
    pub warn_after_failures: u32,
}

/// Per-loop retry state. Each recurring loop owns its own instance, the
/// dashboard refresh and the assignment watch never share one.
#[derive(Debug)]
pub struct RetryBackoff {
    config: BackoffConfig,
    consecutive_failures: u32,
    warned: bool,
}

impl RetryBackoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            consecutive_failures: 0,
            warned: false,
        }
    }

    /// Records a failed tick. Returns `true` exactly once per failure streak,
    /// when the streak reaches the warning threshold.
    pub fn on_failure(&mut self) -> bool {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.consecutive_failures >= self.config.warn_after_failures && !self.warned {
            self.warned = true;
            true
        } else {
            false
        }
    }

    /// Resets the streak. Returns `true` when recovering from a warned streak
    /// so the caller can withdraw its warning.
    pub fn on_success(&mut self) -> bool {
        let recovered = self.warned;
        self.consecutive_failures = 0;
        self.warned = false;
        recovered
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Delay before the next tick: base cadence doubled per consecutive
    /// failure, capped at the configured maximum.
    pub fn delay(&self) -> Duration {
        let cap = self.config.max_delay_secs.max(self.config.base_delay_secs);
        let exponent = self.consecutive_failures.min(16);
        let secs = self
            .config
            .base_delay_secs
            .saturating_mul(1u64 << exponent)
            .min(cap);
        Duration::from_secs(secs)
    }

    /// `delay()` plus up to 10% of random jitter, so that retrying loops do
    /// not tick in lockstep.
    pub fn delay_with_jitter(&self) -> Duration {
        let delay = self.delay();
        let jitter_ms = (delay.as_millis() as u64 / 10).max(1);
        delay + Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
    }
}
