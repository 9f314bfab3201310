//! Beacon-first startup.
//!
//! Beacons launch together; non-beacons are only materialized once every
//! beacon's process has started, and then launch together bootstrapping from
//! the beacons. With no beacons the second phase runs alone.

use std::sync::Arc;

use futures::future::join_all;
use netrunner_common::config::NodeConfig;
use netrunner_common::process::BootstrapPeer;
use netrunner_common::protocol::error::Result;
use tracing::{info, warn};

use crate::materialize::{Materializer, PreparedNode};
use crate::node::NodeRecord;

/// Starts every node in `configs` and returns the resulting records,
/// beacons first, each group in declaration order.
///
/// # Errors
/// - Identity or port errors from materialization, before anything starts
/// - The first beacon `Launch` error; beacons that did start are stopped again
///   and no non-beacon process handle is ever created
///
/// Non-beacon failures do not fail the call; those records come back `Failed`.
pub async fn start_nodes(
    materializer: &Materializer,
    configs: &[NodeConfig],
) -> Result<Vec<Arc<NodeRecord>>> {
    let (beacons, others): (Vec<&NodeConfig>, Vec<&NodeConfig>) =
        configs.iter().partition(|c| c.is_beacon);

    let beacons = beacons
        .into_iter()
        .map(|c| materializer.prepare(c, &[]))
        .collect::<Result<Vec<PreparedNode>>>()?;
    let bootstrap: Vec<BootstrapPeer> = beacons.iter().map(|p| p.bootstrap_peer()).collect();
    let others = others
        .into_iter()
        .map(|c| materializer.prepare(c, &bootstrap))
        .collect::<Result<Vec<PreparedNode>>>()?;

    let mut records = if beacons.is_empty() {
        Vec::new()
    } else {
        info!("Starting {} beacon node(s)", beacons.len());
        start_beacons(materializer, beacons).await?
    };

    if !others.is_empty() {
        info!("Starting {} non-beacon node(s)", others.len());
        records.extend(start_others(materializer, others).await);
    }

    Ok(records)
}

async fn start_beacons(
    materializer: &Materializer,
    prepared: Vec<PreparedNode>,
) -> Result<Vec<Arc<NodeRecord>>> {
    let records = prepared
        .into_iter()
        .map(|p| materializer.instantiate(p).map(Arc::new))
        .collect::<Result<Vec<Arc<NodeRecord>>>>()?;

    let results = join_all(records.iter().map(|r| r.launch())).await;

    let mut first_error = None;
    let mut started = Vec::new();
    for (record, result) in records.iter().zip(results) {
        match result {
            Ok(()) => started.push(record.clone()),
            Err(e) => {
                warn!("Beacon {} failed to start: {}", record.name(), e);
                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(err) = first_error {
        // best effort: the launch error is what the caller needs to see
        for (record, result) in started
            .iter()
            .zip(join_all(started.iter().map(|r| r.shutdown())).await)
        {
            if let Err(e) = result {
                warn!("Failed to stop beacon {} after aborted startup: {}", record.name(), e);
            }
        }
        return Err(err);
    }

    Ok(records)
}

async fn start_others(
    materializer: &Materializer,
    prepared: Vec<PreparedNode>,
) -> Vec<Arc<NodeRecord>> {
    let mut records = Vec::with_capacity(prepared.len());
    let mut pending = Vec::new();

    for p in prepared {
        let fallback = p.clone();
        match materializer.instantiate(p) {
            Ok(record) => {
                let record = Arc::new(record);
                pending.push(record.clone());
                records.push(record);
            }
            Err(e) => {
                warn!("Node {} could not be created: {}", fallback.name(), e);
                records.push(Arc::new(materializer.failed(fallback, e.to_string())));
            }
        }
    }

    let results = join_all(pending.iter().map(|r| r.launch())).await;
    for (record, result) in pending.iter().zip(results) {
        if let Err(e) = result {
            warn!("Node {} failed to start: {}", record.name(), e);
        }
    }

    records
}
