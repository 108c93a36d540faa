//! Route id to upstream feed endpoint resolution.
//!
//! Every subway route is served by exactly one feed. Most feeds are
//! addressed by appending the group key to the base URL; the numbered
//! lines and the shuttle share the bare base URL.

use std::fmt;

use crate::error::{FeedError, Result};

/// Base URL of the NYCT subway GTFS-RT feeds.
pub const BASE_URL: &str = "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs";

/// A batch of routes sharing one upstream feed endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteGroup {
    Ace,
    Bdfm,
    G,
    Jz,
    Nqrw,
    L,
    Numbered,
}

impl RouteGroup {
    pub const ALL: [RouteGroup; 7] = [
        RouteGroup::Ace,
        RouteGroup::Bdfm,
        RouteGroup::G,
        RouteGroup::Jz,
        RouteGroup::Nqrw,
        RouteGroup::L,
        RouteGroup::Numbered,
    ];

    /// Resolves a route id (case-sensitive) to its group.
    pub fn from_route_id(route_id: &str) -> Result<Self> {
        let group = match route_id {
            "A" | "C" | "E" => RouteGroup::Ace,
            "B" | "D" | "F" | "M" => RouteGroup::Bdfm,
            "G" => RouteGroup::G,
            "J" | "Z" => RouteGroup::Jz,
            "N" | "Q" | "R" | "W" => RouteGroup::Nqrw,
            "L" => RouteGroup::L,
            "1" | "2" | "3" | "4" | "5" | "6" | "7" | "S" => RouteGroup::Numbered,
            other => return Err(FeedError::UnsupportedRoute(other.to_string())),
        };
        Ok(group)
    }

    /// Looks a group up by the key stored alongside archived snapshots.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.key() == key)
    }

    pub fn key(self) -> &'static str {
        match self {
            RouteGroup::Ace => "ace",
            RouteGroup::Bdfm => "bdfm",
            RouteGroup::G => "g",
            RouteGroup::Jz => "jz",
            RouteGroup::Nqrw => "nqrw",
            RouteGroup::L => "l",
            RouteGroup::Numbered => "number",
        }
    }

    pub fn route_ids(self) -> &'static [&'static str] {
        match self {
            RouteGroup::Ace => &["A", "C", "E"],
            RouteGroup::Bdfm => &["B", "D", "F", "M"],
            RouteGroup::G => &["G"],
            RouteGroup::Jz => &["J", "Z"],
            RouteGroup::Nqrw => &["N", "Q", "R", "W"],
            RouteGroup::L => &["L"],
            RouteGroup::Numbered => &["1", "2", "3", "4", "5", "6", "7", "S"],
        }
    }

    /// Upstream feed URL. The numbered group has no suffix.
    pub fn url(self) -> String {
        match self {
            RouteGroup::Numbered => BASE_URL.to_string(),
            group => format!("{}-{}", BASE_URL, group.key()),
        }
    }
}

impl fmt::Display for RouteGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Feed URL serving `route_id`.
pub fn feed_url(route_id: &str) -> Result<String> {
    RouteGroup::from_route_id(route_id).map(RouteGroup::url)
}
