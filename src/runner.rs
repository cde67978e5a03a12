//! Shared run lifecycle for both modes: banner, volume cleanout, entropy
//! buffer materialization, engine run, unconditional entropy cleanup.

use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::info;

use crate::config::{Config, Session};
use crate::entropy::EntropyFile;
use crate::ops::{CommandRunner, OpRunner, run_command};
use crate::{record, replay};

pub enum Mode {
    Record,
    Replay,
}

pub async fn run_session(mut session: Session, mode: Mode) -> Result<()> {
    info!(
        "{}, using {} threads",
        crate::name_and_version(),
        session.config.threads
    );

    info!("Emptying the volumes...");
    empty_volumes(&session.config).await?;

    info!("Preparing the entropy file...");
    let entropy = EntropyFile::materialize(&session.config).await?;

    let runner: Arc<dyn OpRunner> = Arc::new(CommandRunner::new(
        session.config.clone(),
        entropy.path().to_path_buf(),
    ));
    let result = match mode {
        Mode::Record => record::record(&mut session, runner).await,
        Mode::Replay => replay::replay(&session, runner).await,
    };
    // The guard also fires on panic; dropping here just keeps the file's
    // lifetime explicit.
    drop(entropy);
    result
}

/// Remove everything from the target volumes so uploads land in a known
/// state. A toolchain failure here aborts the run before any load is
/// generated.
async fn empty_volumes(config: &Config) -> Result<()> {
    for volume in &config.volumes {
        let path = format!("{}/{}/*", config.cluster_url, volume);

        let listing = run_command(&["list".to_string(), path.clone()], None).await?;
        if !listing.status.success() {
            bail!(
                "failed to list {}: {}",
                path,
                String::from_utf8_lossy(&listing.stderr).trim()
            );
        }
        if listing.stdout.is_empty() {
            continue;
        }

        let removal = run_command(&["remove".to_string(), path.clone()], None).await?;
        if !removal.status.success() {
            bail!(
                "failed to empty {}: {}",
                path,
                String::from_utf8_lossy(&removal.stderr).trim()
            );
        }
    }
    Ok(())
}
