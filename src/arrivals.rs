//! Arrival extraction from decoded trip updates.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

use crate::gtfs_rt::FeedMessage;

/// One predicted arrival of a trip at a stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrivalRow {
    pub trip_id: String,
    pub route_id: String,
    pub stop_id: String,
    pub arrival_epoch: i64,
    /// `HH:MM:SS` in the feed's local time zone.
    #[serde(rename = "arrival_time")]
    pub arrival_wallclock: String,
}

/// Optional route and stop restrictions. An empty `stop_ids` means every stop.
#[derive(Debug, Clone, Default)]
pub struct ArrivalFilter {
    pub route_id: Option<String>,
    pub stop_ids: Vec<String>,
}

impl ArrivalFilter {
    pub fn for_route(route_id: impl Into<String>) -> Self {
        Self {
            route_id: Some(route_id.into()),
            stop_ids: Vec::new(),
        }
    }

    pub fn with_stops(mut self, stop_ids: Vec<String>) -> Self {
        self.stop_ids = stop_ids;
        self
    }

    fn accepts_route(&self, route_id: Option<&str>) -> bool {
        match &self.route_id {
            Some(wanted) => route_id == Some(wanted.as_str()),
            None => true,
        }
    }

    fn accepts_stop(&self, stop_id: &str) -> bool {
        self.stop_ids.is_empty() || self.stop_ids.iter().any(|s| s == stop_id)
    }
}

/// Collects every stop-time update that carries an arrival, ordered by
/// stop id and then arrival time.
///
/// Updates without a stop id are skipped, and so are departure-only
/// updates. Rows with the same stop and epoch keep their feed order.
pub fn extract_arrivals(feed: &FeedMessage, filter: &ArrivalFilter, tz: &Tz) -> Vec<ArrivalRow> {
    let mut rows = Vec::new();

    for entity in &feed.entity {
        let Some(trip_update) = &entity.trip_update else {
            continue;
        };
        let trip = &trip_update.trip;

        if !filter.accepts_route(trip.route_id.as_deref()) {
            continue;
        }

        for stu in &trip_update.stop_time_update {
            let Some(stop_id) = stu.stop_id.as_deref() else {
                continue;
            };
            if !filter.accepts_stop(stop_id) {
                continue;
            }
            let Some(arrival) = &stu.arrival else {
                continue;
            };

            let epoch = arrival.time.unwrap_or_default();
            rows.push(ArrivalRow {
                trip_id: trip.trip_id.clone().unwrap_or_default(),
                route_id: trip.route_id.clone().unwrap_or_default(),
                stop_id: stop_id.to_string(),
                arrival_epoch: epoch,
                arrival_wallclock: wallclock(epoch, tz),
            });
        }
    }

    rows.sort_by(|a, b| {
        a.stop_id
            .cmp(&b.stop_id)
            .then(a.arrival_epoch.cmp(&b.arrival_epoch))
    });
    rows
}

/// Formats a unix timestamp as `HH:MM:SS` in `tz`; empty when out of range.
pub fn wallclock(epoch: i64, tz: &Tz) -> String {
    DateTime::from_timestamp(epoch, 0)
        .map(|utc| utc.with_timezone(tz).format("%H:%M:%S").to_string())
        .unwrap_or_default()
}
