mod common;

use chrono_tz::Tz;
use gtfs_rt_archive::arrivals::{ArrivalFilter, extract_arrivals};
use gtfs_rt_archive::ingest::poll_once;
use gtfs_rt_archive::parser::parse_feed;
use gtfs_rt_archive::routes::RouteGroup;
use gtfs_rt_archive::store::{ListFilter, SnapshotStore};

use common::{FeedServer, arrival_at, bdfm_feed, encode, feed, trip};

#[tokio::test]
async fn test_full_pipeline() {
    let server = FeedServer::default();
    let bytes = encode(&bdfm_feed());
    server.serve(RouteGroup::Bdfm.url(), 200, bytes.clone());

    let store = SnapshotStore::in_memory().await.unwrap();
    let reports = poll_once(&server, &store, &[RouteGroup::Bdfm]).await;
    let outcome = reports[0].result.as_ref().expect("poll failed");
    assert!(outcome.inserted);

    let archived = store.get_decompressed(outcome.id).await.unwrap();
    assert_eq!(archived, bytes);

    let feed = parse_feed(&archived).expect("Failed to parse feed");
    let rows = extract_arrivals(&feed, &ArrivalFilter::for_route("D"), &Tz::UTC);
    let stops: Vec<&str> = rows.iter().map(|r| r.stop_id.as_str()).collect();
    assert_eq!(stops, vec!["D40N", "D41N"]);
}

#[tokio::test]
async fn test_repeated_polls_only_archive_changes() {
    let server = FeedServer::default();
    let store = SnapshotStore::in_memory().await.unwrap();
    let groups = [RouteGroup::L];

    let first = encode(&feed(1700000000, vec![trip("l-1", "L", vec![arrival_at("L08N", 1700000060)])]));
    server.serve(RouteGroup::L.url(), 200, first);
    poll_once(&server, &store, &groups).await;
    poll_once(&server, &store, &groups).await;
    assert_eq!(store.count().await.unwrap(), 1);

    let second = encode(&feed(1700000030, vec![trip("l-1", "L", vec![arrival_at("L08N", 1700000090)])]));
    server.serve(RouteGroup::L.url(), 200, second);
    let reports = poll_once(&server, &store, &groups).await;
    assert!(reports[0].result.as_ref().unwrap().inserted);

    let rows = store.list(&ListFilter::default()).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.route_group == "l"));
    assert!(rows[0].id > rows[1].id);
    assert_eq!(server.calls(), 3);
}

#[tokio::test]
async fn test_failing_group_does_not_block_others() {
    let server = FeedServer::default();
    server.serve(RouteGroup::G.url(), 200, encode(&bdfm_feed()));
    // Ace has no canned response and gets a 404

    let store = SnapshotStore::in_memory().await.unwrap();
    let reports = poll_once(&server, &store, &[RouteGroup::Ace, RouteGroup::G]).await;

    assert!(reports[0].result.is_err());
    assert!(reports[1].result.as_ref().unwrap().inserted);

    let rows = store.list(&ListFilter::default()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].route_group, "g");
}
