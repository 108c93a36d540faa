#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use gtfs_rt_archive::fetch::HttpClient;
use gtfs_rt_archive::gtfs_rt::trip_update::{StopTimeEvent, StopTimeUpdate};
use gtfs_rt_archive::gtfs_rt::{FeedEntity, FeedHeader, FeedMessage, TripDescriptor, TripUpdate};
use prost::Message;

/// Serves canned responses keyed by URL; unknown URLs get a 404.
#[derive(Default)]
pub struct FeedServer {
    responses: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    calls: AtomicUsize,
}

impl FeedServer {
    pub fn serve(&self, url: impl Into<String>, status: u16, body: Vec<u8>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.into(), (status, body));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for FeedServer {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (status, body) = self
            .responses
            .lock()
            .unwrap()
            .get(req.url().as_str())
            .cloned()
            .unwrap_or((404, Vec::new()));
        let resp = axum::http::Response::builder()
            .status(status)
            .body(body)
            .unwrap();
        Ok(reqwest::Response::from(resp))
    }
}

pub fn arrival_at(stop_id: &str, epoch: i64) -> StopTimeUpdate {
    StopTimeUpdate {
        stop_id: Some(stop_id.to_string()),
        arrival: Some(StopTimeEvent {
            time: Some(epoch),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn trip(trip_id: &str, route_id: &str, updates: Vec<StopTimeUpdate>) -> FeedEntity {
    FeedEntity {
        id: trip_id.to_string(),
        trip_update: Some(TripUpdate {
            trip: TripDescriptor {
                trip_id: Some(trip_id.to_string()),
                route_id: Some(route_id.to_string()),
                ..Default::default()
            },
            stop_time_update: updates,
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn feed(timestamp: u64, entity: Vec<FeedEntity>) -> FeedMessage {
    FeedMessage {
        header: FeedHeader {
            gtfs_realtime_version: "2.0".to_string(),
            timestamp: Some(timestamp),
            ..Default::default()
        },
        entity,
    }
}

/// An F train at D40N and a D train at D40N and D41N.
pub fn bdfm_feed() -> FeedMessage {
    feed(
        1700000000,
        vec![
            trip("t-f", "F", vec![arrival_at("D40N", 1700000100)]),
            trip(
                "t-d",
                "D",
                vec![arrival_at("D40N", 1700000150), arrival_at("D41N", 1700000300)],
            ),
        ],
    )
}

/// An A train at A15 and A14.
pub fn ace_feed() -> FeedMessage {
    feed(
        1700000000,
        vec![trip(
            "t-a",
            "A",
            vec![arrival_at("A15", 1700000050), arrival_at("A14", 1700000200)],
        )],
    )
}

pub fn encode(feed: &FeedMessage) -> Vec<u8> {
    feed.encode_to_vec()
}
