/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::RideRequest;
use crate::common::utils::format_position;
use crate::tracking::projector::MapViewState;
use tracing::{info, warn};

/// The thin rendering seam. The poller, projector and session handling push
/// finished values through this trait; nothing behind it feeds back into the
/// synchronization logic.
pub trait TrackerView: Send + Sync {
    /// The cached request list was replaced wholesale.
    fn requests_updated(&self, requests: &[RideRequest]);
    /// The live map model changed (either side's tick).
    fn map_updated(&self, state: &MapViewState);
    /// The map could not be opened; render an inline error instead.
    fn map_unavailable(&self, reason: &str);
    /// Credentials were cleared; control hands off to the login flow.
    fn session_expired(&self);
}

/// Headless renderer: projects every update onto structured log lines.
#[derive(Debug, Default)]
pub struct LogView;

impl TrackerView for LogView {
    fn requests_updated(&self, requests: &[RideRequest]) {
        info!(tag = "[VIEW - REQUESTS]", count = requests.len());
    }

    fn map_updated(&self, state: &MapViewState) {
        let distance = state
            .distance_km
            .map(|km| format!("{km:.1} km"))
            .unwrap_or_else(|| "Not available".to_string());
        let eta = state
            .eta_minutes
            .map(|minutes| format!("{minutes} min"))
            .unwrap_or_else(|| "Not available".to_string());
        info!(
            tag = "[VIEW - MAP]",
            driver = %state.driver_marker.label,
            driver_position = %format_position(Some(&state.driver_marker.position)),
            rider_position = %format_position(state.rider_marker.as_ref().map(|marker| &marker.position)),
            distance = %distance,
            eta = %eta,
        );
    }

    fn map_unavailable(&self, reason: &str) {
        warn!(tag = "[VIEW - MAP]", reason = %reason, "map unavailable");
    }

    fn session_expired(&self) {
        warn!(
            tag = "[VIEW - SESSION]",
            "session expired, redirecting to login"
        );
    }
}
