/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use super::{ActionError, ValidationErrors};
use crate::outbound::external::RideApi;
use crate::outbound::types::{ApiSuccess, CreateRideRequest};
use chrono::{DateTime, NaiveDateTime};
use tracing::info;

pub const FIELD_PICKUP: &str = "pickupLocation";
pub const FIELD_DROPOFF: &str = "dropoffLocation";
pub const FIELD_REQUEST_TIME: &str = "requestTime";

/// What the rider typed into the booking form, untrimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingForm {
    pub pickup_location: String,
    pub dropoff_location: String,
    pub request_time: String,
}

/// Client-side validation gate. Required fields, a parseable schedule and
/// distinct pickup/dropoff; nothing reaches the network until this passes.
pub fn validate_booking(form: &BookingForm) -> Result<CreateRideRequest, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let pickup = form.pickup_location.trim();
    let dropoff = form.dropoff_location.trim();
    let request_time = form.request_time.trim();

    if pickup.is_empty() {
        errors.push(FIELD_PICKUP, "Pickup location is required");
    }
    if dropoff.is_empty() {
        errors.push(FIELD_DROPOFF, "Dropoff location is required");
    }
    if !pickup.is_empty() && !dropoff.is_empty() && pickup.eq_ignore_ascii_case(dropoff) {
        errors.push(
            FIELD_DROPOFF,
            "Dropoff location must differ from the pickup location",
        );
    }
    if request_time.is_empty() {
        errors.push(FIELD_REQUEST_TIME, "Requested time is required");
    } else if !parseable_schedule(request_time) {
        errors.push(FIELD_REQUEST_TIME, "Requested time is not a valid date");
    }

    if errors.is_empty() {
        Ok(CreateRideRequest {
            pickup_location: pickup.to_string(),
            dropoff_location: dropoff.to_string(),
            request_time: request_time.to_string(),
        })
    } else {
        Err(errors)
    }
}

// The form emits datetime-local ("2026-08-05T18:30"); accept RFC 3339 too.
fn parseable_schedule(raw: &str) -> bool {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M").is_ok()
        || NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").is_ok()
        || DateTime::parse_from_rfc3339(raw).is_ok()
}

/// Validates and, only when the form is clean, submits the booking.
pub async fn submit_booking(
    api: &dyn RideApi,
    form: &BookingForm,
) -> Result<ApiSuccess, ActionError> {
    let body = validate_booking(form).map_err(ActionError::Validation)?;
    let response = api.create_ride_request(&body).await?;
    info!(tag = "[BOOKING]", pickup = %body.pickup_location, dropoff = %body.dropoff_location, "ride request submitted");
    Ok(response)
}
