/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use super::types::*;
use chrono::Datelike;
use std::f64::consts::PI;

/// Nominal travel speed used for ETA estimation. Fixed, never derived from
/// observed driver speed.
pub const ASSUMED_SPEED_KMH: f64 = 30.0;

fn deg2rad(degrees: f64) -> f64 {
    degrees * PI / 180.0
}

pub fn distance_between_in_km(latlong1: &Point, latlong2: &Point) -> f64 {
    // Calculating using haversine formula
    // Radius of Earth in kilometers
    let r: f64 = 6371.0;

    let Latitude(lat1) = latlong1.lat;
    let Longitude(lon1) = latlong1.lon;
    let Latitude(lat2) = latlong2.lat;
    let Longitude(lon2) = latlong2.lon;

    let dlat = deg2rad(lat2 - lat1);
    let dlon = deg2rad(lon2 - lon1);

    let rlat1 = deg2rad(lat1);
    let rlat2 = deg2rad(lat2);

    let sq = |x: f64| x * x;

    // Calculated distance is real (not imaginary) when 0 <= h <= 1
    // Ideally in our use case h wouldn't go out of bounds
    let h = sq((dlat / 2.0).sin()) + rlat1.cos() * rlat2.cos() * sq((dlon / 2.0).sin());

    2.0 * r * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Minutes to cover `distance_km` at the nominal speed, rounded to the
/// nearest whole minute.
pub fn eta_minutes(distance_km: f64) -> u32 {
    (distance_km / ASSUMED_SPEED_KMH * 60.0).round() as u32
}

pub fn midpoint(latlong1: &Point, latlong2: &Point) -> Point {
    let Latitude(lat1) = latlong1.lat;
    let Longitude(lon1) = latlong1.lon;
    let Latitude(lat2) = latlong2.lat;
    let Longitude(lon2) = latlong2.lon;
    Point {
        lat: Latitude((lat1 + lat2) / 2.0),
        lon: Longitude((lon1 + lon2) / 2.0),
    }
}

/// Axis-aligned bounding box containing both points, as (southwest, northeast).
pub fn bounds(latlong1: &Point, latlong2: &Point) -> (Point, Point) {
    let Latitude(lat1) = latlong1.lat;
    let Longitude(lon1) = latlong1.lon;
    let Latitude(lat2) = latlong2.lat;
    let Longitude(lon2) = latlong2.lon;
    (
        Point {
            lat: Latitude(lat1.min(lat2)),
            lon: Longitude(lon1.min(lon2)),
        },
        Point {
            lat: Latitude(lat1.max(lat2)),
            lon: Longitude(lon1.max(lon2)),
        },
    )
}

/// "(12.3456, 56.7890)" when a fix exists, "Not available" otherwise.
pub fn format_position(position: Option<&Point>) -> String {
    match position {
        Some(Point {
            lat: Latitude(lat),
            lon: Longitude(lon),
        }) => format!("({lat:.4}, {lon:.4})"),
        None => "Not available".to_string(),
    }
}

pub fn format_request_time(TimeStamp(ts): &TimeStamp, TimeStamp(now): &TimeStamp) -> String {
    let day = ts.date_naive();
    let today = now.date_naive();
    if day == today {
        format!("Today, {}", ts.format("%H:%M"))
    } else if Some(day) == today.pred_opt() {
        format!("Yesterday, {}", ts.format("%H:%M"))
    } else {
        ts.format("%Y-%m-%d %H:%M").to_string()
    }
}

pub fn same_month(TimeStamp(ts): &TimeStamp, TimeStamp(now): &TimeStamp) -> bool {
    ts.month() == now.month() && ts.year() == now.year()
}
