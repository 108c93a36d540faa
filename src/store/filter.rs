//! Snapshot listing filters and their defaults.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{FeedError, Result};

/// Values used when a listing filter leaves a field out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListDefaults {
    /// Page size when the request carries no filter at all.
    pub unfiltered_limit: u32,
    /// Page size when at least one filter is present but `limit` is not.
    pub filtered_limit: u32,
    pub offset: u32,
    /// Used when a start date is given without a start time.
    pub start_time: NaiveTime,
    /// Used when an end date is given without an end time.
    pub end_time: NaiveTime,
}

pub const LIST_DEFAULTS: ListDefaults = ListDefaults {
    unfiltered_limit: 50,
    filtered_limit: 100,
    offset: 0,
    start_time: hms(0, 0, 0),
    end_time: hms(23, 59, 59),
};

const fn hms(hour: u32, min: u32, sec: u32) -> NaiveTime {
    match NaiveTime::from_hms_opt(hour, min, sec) {
        Some(t) => t,
        None => panic!("invalid time of day"),
    }
}

/// Snapshot listing request. Every field is optional; a missing date means
/// the current UTC day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub route_groups: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_date: Option<NaiveDate>,
    pub end_time: Option<NaiveTime>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// A [`ListFilter`] with every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub route_groups: Vec<String>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub limit: u32,
    pub offset: u32,
}

impl ListFilter {
    /// Builds a filter from URL query pairs. `route_group` may repeat; empty
    /// values are treated as absent and unknown keys are ignored.
    pub fn from_query_pairs(pairs: &[(String, String)]) -> Result<Self> {
        let mut filter = ListFilter::default();

        for (key, value) in pairs {
            if value.is_empty() {
                continue;
            }
            match key.as_str() {
                "route_group" => filter.route_groups.push(value.clone()),
                "start_date" => filter.start_date = Some(parse_date(key, value)?),
                "start_time" => filter.start_time = Some(parse_time(key, value)?),
                "end_date" => filter.end_date = Some(parse_date(key, value)?),
                "end_time" => filter.end_time = Some(parse_time(key, value)?),
                "limit" => filter.limit = Some(parse_count(key, value)?),
                "offset" => filter.offset = Some(parse_count(key, value)?),
                _ => {}
            }
        }

        Ok(filter)
    }

    /// True when no field at all was supplied.
    pub fn is_empty(&self) -> bool {
        *self == ListFilter::default()
    }

    /// Applies [`LIST_DEFAULTS`], resolving missing dates to `today`.
    pub fn resolve(&self, today: NaiveDate) -> ListQuery {
        let defaults = LIST_DEFAULTS;
        let default_limit = if self.is_empty() {
            defaults.unfiltered_limit
        } else {
            defaults.filtered_limit
        };

        let start = (self.start_date.is_some() || self.start_time.is_some()).then(|| {
            self.start_date
                .unwrap_or(today)
                .and_time(self.start_time.unwrap_or(defaults.start_time))
        });
        let end = (self.end_date.is_some() || self.end_time.is_some()).then(|| {
            self.end_date
                .unwrap_or(today)
                .and_time(self.end_time.unwrap_or(defaults.end_time))
        });

        ListQuery {
            route_groups: self.route_groups.clone(),
            start,
            end,
            limit: self.limit.unwrap_or(default_limit),
            offset: self.offset.unwrap_or(defaults.offset),
        }
    }
}

fn parse_date(name: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| FeedError::invalid_parameter(name, e))
}

fn parse_time(name: &str, value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S").map_err(|e| FeedError::invalid_parameter(name, e))
}

fn parse_count(name: &str, value: &str) -> Result<u32> {
    value
        .parse()
        .map_err(|e| FeedError::invalid_parameter(name, e))
}
