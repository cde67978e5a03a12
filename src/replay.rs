//! The replay engine: rebuild a recorded timeline by starting every
//! operation at its recorded offset from a fresh reference time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::Session;
use crate::ops::OpRunner;

/// Replay every recorded operation at its original relative start time.
///
/// All tasks are submitted up front; each waits for a pool permit and
/// then for its own deadline, so the recorded cadence is reproduced as
/// closely as pool capacity allows. The first internal error is
/// re-raised only after every task has been waited on.
pub async fn replay(session: &Session, runner: Arc<dyn OpRunner>) -> Result<()> {
    let records = match session.operations() {
        Some(records) if !records.is_empty() => records,
        _ => bail!("no recorded operations in session"),
    };

    info!("Replaying {} recorded operations", records.len());
    // session.config.threads was already doubled at load time.
    let pool = Arc::new(Semaphore::new(session.config.threads));
    let start_time = Instant::now();

    let mut tasks: Vec<JoinHandle<Result<()>>> = Vec::with_capacity(records.len());
    for record in records {
        let runner = Arc::clone(&runner);
        let pool = Arc::clone(&pool);
        let op = record.op.clone();
        let offset = Duration::from_secs_f64(record.time);

        tasks.push(tokio::spawn(async move {
            let _permit = pool.acquire().await?;
            let deadline = start_time + offset;
            let now = Instant::now();
            if now < deadline {
                tokio::time::sleep_until(deadline.into()).await;
            } else {
                warn!(
                    "{} starts {:.3}s late",
                    op.name(),
                    (now - deadline).as_secs_f64()
                );
            }
            runner.run(&op).await
        }));
    }

    let mut first_error: Option<anyhow::Error> = None;
    for task in tasks {
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(join_error) => Err(join_error.into()),
        };
        if let Err(err) = outcome {
            if first_error.is_none() {
                first_error = Some(err);
            } else {
                error!("Internal error: {err:#}");
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => {
            info!(
                "Ran {} operations in {:.3}s",
                records.len(),
                start_time.elapsed().as_secs_f64()
            );
            Ok(())
        }
    }
}
