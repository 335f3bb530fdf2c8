/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use strum_macros::{Display, EnumString};

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RequestId(pub i64);
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct DriverId(pub i64);
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Copy)]
pub struct Latitude(pub f64);
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Copy)]
pub struct Longitude(pub f64);
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, PartialOrd, Copy)]
pub struct Accuracy(pub f64);
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Hash, Ord)]
pub struct TimeStamp(pub DateTime<Utc>);
#[derive(Deserialize, Serialize, Clone, Debug, Eq, PartialEq)]
pub struct Token(pub String);

/// Lifecycle of a ride request as owned by the backend. The client never
/// advances this state itself, it only renders the latest snapshot.
#[derive(Debug, Clone, Copy, EnumString, Display, Serialize, Deserialize, Eq, Hash, PartialEq)]
pub enum RideStatus {
    PENDING,
    ASSIGNED,
    COMPLETED,
    CANCELLED,
}

impl RideStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RideStatus::PENDING => "Pending",
            RideStatus::ASSIGNED => "Assigned",
            RideStatus::COMPLETED => "Completed",
            RideStatus::CANCELLED => "Cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, EnumString, Display, Serialize, Deserialize, Eq, PartialEq)]
pub enum Role {
    #[strum(serialize = "user")]
    #[serde(rename = "user")]
    Rider,
    #[strum(serialize = "driver")]
    #[serde(rename = "driver")]
    Driver,
    #[strum(serialize = "admin")]
    #[serde(rename = "admin")]
    Admin,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub lat: Latitude,
    pub lon: Longitude,
}

/// A device location fix. Superseded wholesale on every stream event and
/// never persisted beyond the session.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct GeoPosition {
    pub latitude: Latitude,
    pub longitude: Longitude,
    pub accuracy: Accuracy,
}

impl GeoPosition {
    pub fn point(&self) -> Point {
        Point {
            lat: self.latitude,
            lon: self.longitude,
        }
    }
}

/// Driver snapshot as embedded in a ride request. Server-owned and possibly
/// stale between polls. Absent coordinates mean "no fix yet", not zero.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Driver {
    pub id: DriverId,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub vehicle_type: Option<String>,
    #[serde(default)]
    pub vehicle_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_latitude")]
    pub latitude: Option<Latitude>,
    #[serde(default, deserialize_with = "lenient_longitude")]
    pub longitude: Option<Longitude>,
}

impl Driver {
    /// Both coordinates present, or nothing.
    pub fn position(&self) -> Option<Point> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Point { lat, lon }),
            _ => None,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct RideRequest {
    pub id: RequestId,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub request_time: TimeStamp,
    pub status: RideStatus,
    #[serde(default)]
    pub driver: Option<Driver>,
    #[serde(default)]
    pub fare_amount: Option<f64>,
}

impl RideRequest {
    pub fn display_id(&self) -> String {
        let RequestId(id) = self.id;
        format!("#RS-{id}")
    }
}

/// The backend serializes driver coordinates either as numbers or as numeric
/// strings, and occasionally as garbage. Anything that does not parse to a
/// finite float is treated as "no fix yet" rather than a malformed payload.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_f64().filter(|v| v.is_finite()),
        Some(Value::String(raw)) => raw.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

pub fn lenient_latitude<'de, D>(deserializer: D) -> Result<Option<Latitude>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_f64(deserializer)?.map(Latitude))
}

pub fn lenient_longitude<'de, D>(deserializer: D) -> Result<Option<Longitude>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_f64(deserializer)?.map(Longitude))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_coordinates_accept_numbers_and_numeric_strings() {
        let driver: Driver = serde_json::from_str(
            r#"{"id":3,"name":"Asha","phone":"+919876543210","vehicle_number":"KA-01-1234","latitude":"12.34","longitude":56.78}"#,
        )
        .expect("driver payload should deserialize");
        assert_eq!(driver.latitude, Some(Latitude(12.34)));
        assert_eq!(driver.longitude, Some(Longitude(56.78)));
        assert!(driver.position().is_some());
    }

    #[test]
    fn unparseable_coordinates_mean_no_fix_yet() {
        let driver: Driver = serde_json::from_str(
            r#"{"id":3,"name":"Asha","latitude":"pending","longitude":null}"#,
        )
        .expect("driver payload should deserialize");
        assert_eq!(driver.latitude, None);
        assert_eq!(driver.longitude, None);
        assert_eq!(driver.position(), None);
    }

    #[test]
    fn one_sided_fix_is_no_fix() {
        let driver: Driver =
            serde_json::from_str(r#"{"id":3,"name":"Asha","latitude":12.34}"#).expect("payload");
        assert_eq!(driver.position(), None);
    }

    #[test]
    fn ride_request_deserializes_with_missing_optionals() {
        let request: RideRequest = serde_json::from_str(
            r#"{"id":7,"pickup_location":"Airport","dropoff_location":"Station","request_time":"2026-08-01T09:30:00Z","status":"PENDING"}"#,
        )
        .expect("request payload should deserialize");
        assert_eq!(request.display_id(), "#RS-7");
        assert_eq!(request.status, RideStatus::PENDING);
        assert!(request.driver.is_none());
        assert!(request.fare_amount.is_none());
    }

    #[test]
    fn ride_status_labels() {
        assert_eq!(RideStatus::PENDING.label(), "Pending");
        assert_eq!(RideStatus::CANCELLED.label(), "Cancelled");
        assert_eq!(RideStatus::ASSIGNED.to_string(), "ASSIGNED");
    }
}
