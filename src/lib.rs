pub mod arrivals;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod parser;
pub mod routes;
pub mod server;
pub mod store;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}

pub use error::{FeedError, Result};
