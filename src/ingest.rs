//! One polling pass: fetch every requested route group and archive it.

use tracing::{Instrument, error, info, info_span};

use crate::error::Result;
use crate::fetch::{HttpClient, fetch_bytes};
use crate::routes::RouteGroup;
use crate::store::{IngestOutcome, SnapshotStore};

/// Outcome of polling one route group.
#[derive(Debug)]
pub struct PollReport {
    pub group: RouteGroup,
    pub result: Result<IngestOutcome>,
}

/// Fetches each group's feed and hands the raw bytes to
/// [`SnapshotStore::ingest`]. Groups are polled in order; a failure is
/// logged and reported without stopping the remaining groups.
pub async fn poll_once<C: HttpClient + ?Sized>(
    client: &C,
    store: &SnapshotStore,
    groups: &[RouteGroup],
) -> Vec<PollReport> {
    let mut reports = Vec::with_capacity(groups.len());

    for &group in groups {
        let span = info_span!("poll_group", group = %group);
        let result = poll_group(client, store, group).instrument(span).await;
        reports.push(PollReport { group, result });
    }

    let failed = reports.iter().filter(|r| r.result.is_err()).count();
    let inserted = reports
        .iter()
        .filter(|r| matches!(&r.result, Ok(o) if o.inserted))
        .count();
    info!(
        groups = reports.len(),
        inserted,
        failed,
        "Polling pass complete"
    );

    reports
}

async fn poll_group<C: HttpClient + ?Sized>(
    client: &C,
    store: &SnapshotStore,
    group: RouteGroup,
) -> Result<IngestOutcome> {
    let url = group.url();
    let result = async {
        let bytes = fetch_bytes(client, &url).await?;
        store.ingest(group.key(), &bytes).await
    }
    .await;

    if let Err(e) = &result {
        error!(url = %url, error = %e, "Route group poll failed");
    }
    result
}
