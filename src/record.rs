//! The record engine: keep a bounded pool of randomized operations in
//! flight, harvest completions as they come, and stamp each with its
//! start offset from the run start.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};

use crate::config::{Config, Session};
use crate::ops::{OpRunner, OpSpec, OperationRecord};

/// Run randomized operations until the operator interrupts, then sort
/// the harvested records into the session and save it.
pub async fn record(session: &mut Session, runner: Arc<dyn OpRunner>) -> Result<()> {
    info!("Recording operations...");
    let start = Instant::now();
    let records = run_pool(Arc::new(session.config.clone()), runner, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await;
    info!(
        "Ran {} operations in {:.3}s",
        records.len(),
        start.elapsed().as_secs_f64()
    );

    session.finalize_operations(records);
    let path = session.save_in(Path::new("."))?;
    info!("Saved the session to {}", path.display());
    Ok(())
}

/// The dispatch loop. The in-flight set is topped up to
/// `config.threads` whenever occupancy drops, so the pool size is
/// maintained continuously rather than processed in batches. `shutdown`
/// resolving stops new submissions; everything already in flight is
/// still awaited and harvested.
pub async fn run_pool(
    config: Arc<Config>,
    runner: Arc<dyn OpRunner>,
    shutdown: impl Future<Output = ()>,
) -> Vec<OperationRecord> {
    let run_start = Instant::now();
    let mut in_flight: FuturesUnordered<JoinHandle<Result<OperationRecord>>> =
        FuturesUnordered::new();
    let mut records = Vec::new();
    let mut draining = false;
    tokio::pin!(shutdown);

    loop {
        while !draining && in_flight.len() < config.threads {
            let op = OpSpec::randomize(&config);
            let runner = Arc::clone(&runner);
            in_flight.push(tokio::spawn(async move {
                let time = run_start.elapsed().as_secs_f64();
                runner.run(&op).await?;
                Ok(OperationRecord { time, op })
            }));
        }

        tokio::select! {
            _ = &mut shutdown, if !draining => {
                warn!("Interrupted!");
                warn!(
                    "Waiting for {} in-flight operations to finish...",
                    in_flight.len()
                );
                draining = true;
            }
            completed = in_flight.next() => match completed {
                Some(result) => harvest(result, &mut records),
                None => break,
            },
        }
    }

    records
}

/// A failed harvest (spawn failure, task panic) loses that one result;
/// recording itself continues.
fn harvest(
    result: Result<Result<OperationRecord>, JoinError>,
    records: &mut Vec<OperationRecord>,
) {
    match result {
        Ok(Ok(record)) => records.push(record),
        Ok(Err(err)) => error!("Internal error: {err:#}"),
        Err(err) => error!("Internal error: {err}"),
    }
}
