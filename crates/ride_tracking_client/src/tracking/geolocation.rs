/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::GeoPosition;
use tokio::sync::watch;

/// Producer half of the device location stream. Whatever feeds the rider's
/// position (a GPS daemon, a test fixture) pushes fixes through this handle;
/// every push supersedes the previous fix wholesale.
#[derive(Debug, Clone)]
pub struct LocationHandle {
    tx: watch::Sender<Option<GeoPosition>>,
}

impl LocationHandle {
    pub fn update(&self, position: GeoPosition) {
        let _ = self.tx.send(Some(position));
    }
}

/// Consumer half. `current()` reads the last known fix, `subscribe()` yields
/// an independent receiver a map session can watch and drop on close.
#[derive(Debug, Clone)]
pub struct LocationWatcher {
    rx: watch::Receiver<Option<GeoPosition>>,
}

impl LocationWatcher {
    /// `None` until the first fix arrives.
    pub fn current(&self) -> Option<GeoPosition> {
        *self.rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<GeoPosition>> {
        self.rx.clone()
    }
}

pub fn location_channel() -> (LocationHandle, LocationWatcher) {
    let (tx, rx) = watch::channel(None);
    (LocationHandle { tx }, LocationWatcher { rx })
}
