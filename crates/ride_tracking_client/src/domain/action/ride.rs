/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use super::booking::BookingForm;
use crate::common::types::*;
use crate::common::utils::{format_position, format_request_time, same_month};
use crate::outbound::external::RideApi;
use crate::tools::error::AppError;
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, Eq, PartialEq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum StatusFilter {
    All,
    Pending,
    Assigned,
    Completed,
    Cancelled,
}

pub fn filter_by_status(requests: &[RideRequest], filter: StatusFilter) -> Vec<&RideRequest> {
    requests
        .iter()
        .filter(|request| match filter {
            StatusFilter::All => true,
            StatusFilter::Pending => request.status == RideStatus::PENDING,
            StatusFilter::Assigned => request.status == RideStatus::ASSIGNED,
            StatusFilter::Completed => request.status == RideStatus::COMPLETED,
            StatusFilter::Cancelled => request.status == RideStatus::CANCELLED,
        })
        .collect()
}

/// Headline numbers for the dashboard cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_rides: usize,
    pub active_requests: usize,
    pub completed_rides: usize,
    pub completed_this_month: usize,
}

pub fn dashboard_stats(requests: &[RideRequest], now: &TimeStamp) -> DashboardStats {
    DashboardStats {
        total_rides: requests.len(),
        active_requests: requests
            .iter()
            .filter(|request| {
                matches!(request.status, RideStatus::PENDING | RideStatus::ASSIGNED)
            })
            .count(),
        completed_rides: requests
            .iter()
            .filter(|request| request.status == RideStatus::COMPLETED)
            .count(),
        completed_this_month: requests
            .iter()
            .filter(|request| {
                request.status == RideStatus::COMPLETED && same_month(&request.request_time, now)
            })
            .count(),
    }
}

fn driver_summary(driver: Option<&Driver>, when_absent: &str) -> String {
    match driver {
        Some(driver) => format!(
            "Driver: {}\nPhone: {}\nVehicle: {}\nLocation: {}",
            driver.name,
            driver.phone.as_deref().unwrap_or("Not available"),
            driver.vehicle_number.as_deref().unwrap_or("Not available"),
            format_position(driver.position().as_ref()),
        ),
        None => format!("Driver: {when_absent}"),
    }
}

/// One-shot tracking summary for a single ride.
pub fn format_tracking_summary(request: &RideRequest) -> String {
    format!(
        "Tracking ride {}\n{}\nStatus: {}",
        request.display_id(),
        driver_summary(request.driver.as_ref(), "Not assigned yet"),
        request.status,
    )
}

/// Full detail card: route, schedule, status, fare and driver block.
pub fn format_ride_details(request: &RideRequest, now: &TimeStamp) -> String {
    let fare = request
        .fare_amount
        .map(|fare| format!("${fare:.2}"))
        .unwrap_or_else(|| "Not available".to_string());
    format!(
        "Ride Details ({})\n\nPickup: {}\nDropoff: {}\nDate: {}\nStatus: {}\nFare: {}\n{}",
        request.display_id(),
        request.pickup_location,
        request.dropoff_location,
        format_request_time(&request.request_time, now),
        request.status,
        fare,
        driver_summary(request.driver.as_ref(), "Not assigned"),
    )
}

pub async fn track_ride(api: &dyn RideApi, request_id: RequestId) -> Result<String, AppError> {
    let request = api.get_ride_request(request_id).await?;
    Ok(format_tracking_summary(&request))
}

pub async fn ride_details(
    api: &dyn RideApi,
    request_id: RequestId,
    now: &TimeStamp,
) -> Result<String, AppError> {
    let request = api.get_ride_request(request_id).await?;
    Ok(format_ride_details(&request, now))
}

/// Prefills a fresh booking form from a previous ride. The schedule is left
/// for the rider to choose.
pub async fn book_again(api: &dyn RideApi, request_id: RequestId) -> Result<BookingForm, AppError> {
    let request = api.get_ride_request(request_id).await?;
    Ok(BookingForm {
        pickup_location: request.pickup_location,
        dropoff_location: request.dropoff_location,
        request_time: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn request(id: i64, status: RideStatus, month: u32) -> RideRequest {
        RideRequest {
            id: RequestId(id),
            pickup_location: "Airport".to_string(),
            dropoff_location: "Station".to_string(),
            request_time: TimeStamp(Utc.with_ymd_and_hms(2026, month, 1, 10, 0, 0).unwrap()),
            status,
            driver: None,
            fare_amount: None,
        }
    }

    fn now() -> TimeStamp {
        TimeStamp(Utc.with_ymd_and_hms(2026, 8, 5, 12, 0, 0).unwrap())
    }

    #[test]
    fn stats_count_by_status_and_month() {
        let requests = vec![
            request(1, RideStatus::PENDING, 8),
            request(2, RideStatus::ASSIGNED, 8),
            request(3, RideStatus::COMPLETED, 8),
            request(4, RideStatus::COMPLETED, 6),
            request(5, RideStatus::CANCELLED, 8),
        ];
        let stats = dashboard_stats(&requests, &now());
        assert_eq!(stats.total_rides, 5);
        assert_eq!(stats.active_requests, 2);
        assert_eq!(stats.completed_rides, 2);
        assert_eq!(stats.completed_this_month, 1);
    }

    #[test]
    fn filter_matches_the_select_options() {
        let requests = vec![
            request(1, RideStatus::PENDING, 8),
            request(2, RideStatus::ASSIGNED, 8),
            request(3, RideStatus::COMPLETED, 8),
        ];
        assert_eq!(filter_by_status(&requests, StatusFilter::All).len(), 3);
        let assigned = filter_by_status(&requests, StatusFilter::Assigned);
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].id, RequestId(2));
        assert!(filter_by_status(&requests, StatusFilter::Cancelled).is_empty());

        assert_eq!("assigned".parse::<StatusFilter>(), Ok(StatusFilter::Assigned));
        assert!("everything".parse::<StatusFilter>().is_err());
    }

    #[test]
    fn detail_card_formats_fare_and_missing_driver() {
        let mut detailed = request(7, RideStatus::COMPLETED, 8);
        detailed.fare_amount = Some(12.5);
        let card = format_ride_details(&detailed, &now());
        assert!(card.contains("Ride Details (#RS-7)"));
        assert!(card.contains("Fare: $12.50"));
        assert!(card.contains("Driver: Not assigned"));

        let bare = request(8, RideStatus::PENDING, 8);
        let card = format_ride_details(&bare, &now());
        assert!(card.contains("Fare: Not available"));
    }

    #[test]
    fn tracking_summary_includes_driver_block_when_present() {
        let mut tracked = request(7, RideStatus::ASSIGNED, 8);
        tracked.driver = Some(Driver {
            id: DriverId(3),
            name: "Asha".to_string(),
            phone: None,
            vehicle_type: Some("Sedan".to_string()),
            vehicle_number: Some("KA-01-1234".to_string()),
            latitude: Some(Latitude(12.34)),
            longitude: Some(Longitude(56.78)),
        });
        let summary = format_tracking_summary(&tracked);
        assert!(summary.contains("Tracking ride #RS-7"));
        assert!(summary.contains("Driver: Asha"));
        assert!(summary.contains("Phone: Not available"));
        assert!(summary.contains("Vehicle: KA-01-1234"));
        assert!(summary.contains("Location: (12.3400, 56.7800)"));
        assert!(summary.contains("Status: ASSIGNED"));

        let unassigned = request(9, RideStatus::PENDING, 8);
        assert!(format_tracking_summary(&unassigned).contains("Driver: Not assigned yet"));
    }
}
