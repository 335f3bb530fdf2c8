/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
pub mod geolocation;
pub mod notifier;
pub mod poller;
pub mod projector;

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Shared stop signal for every recurring loop. Triggered by SIGINT/SIGTERM
/// or by a terminal authorization failure on any loop.
#[derive(Debug, Default)]
pub struct Shutdown {
    requested: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.requested.store(true, Ordering::Relaxed);
        self.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.requested.load(Ordering::Relaxed)
    }

    pub async fn wait(&self) {
        // Register before checking the flag so a trigger between the check
        // and the await is not lost.
        let notified = self.notify.notified();
        if self.is_triggered() {
            return;
        }
        notified.await;
    }
}
