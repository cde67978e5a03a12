//! The operation catalog: every kind of load the tool can put on the
//! cluster, how each is randomized, serialized, and run.
//!
//! The variant set is closed; the serde tag doubles as the registry that
//! replay uses to rebuild operations by name from a session file.

use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error};
use uuid::Uuid;

use crate::config::Config;
use crate::constants::UPLOAD_FILENAME_PREFIX;
use crate::entropy;

/// One randomized operation against the cluster. `params` on disk holds
/// exactly the fields of the variant, empty for parameterless ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum OpSpec {
    ListUsers {},
    ListVolumes {},
    ListFiles {
        volume: String,
    },
    ShowVolumeAcl {
        volume: String,
    },
    UploadNewFile {
        volume: String,
        filename: String,
        size: u64,
        offset: u64,
    },
}

/// A completed operation as it appears in the session file: the offset of
/// its start from the run start, plus the operation itself (`type` +
/// `params`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub time: f64,
    #[serde(flatten)]
    pub op: OpSpec,
}

impl OpSpec {
    /// Draw a uniformly random operation from the catalog, with
    /// variant-specific fields filled in from `config`.
    pub fn randomize(config: &Config) -> Self {
        let mut rng = rand::rng();
        match rng.random_range(0..5) {
            0 => OpSpec::ListUsers {},
            1 => OpSpec::ListVolumes {},
            2 => OpSpec::ListFiles {
                volume: pick_volume(config, &mut rng),
            },
            3 => OpSpec::ShowVolumeAcl {
                volume: pick_volume(config, &mut rng),
            },
            _ => {
                let size = rng.random_range(config.min_size..=config.max_size);
                let offset = rng.random_range(0..=config.entropy_size - size);
                OpSpec::UploadNewFile {
                    volume: pick_volume(config, &mut rng),
                    filename: format!("{}{}", UPLOAD_FILENAME_PREFIX, Uuid::new_v4()),
                    size,
                    offset,
                }
            }
        }
    }

    /// The variant name as recorded in session files.
    pub fn name(&self) -> &'static str {
        match self {
            OpSpec::ListUsers {} => "ListUsers",
            OpSpec::ListVolumes {} => "ListVolumes",
            OpSpec::ListFiles { .. } => "ListFiles",
            OpSpec::ShowVolumeAcl { .. } => "ShowVolumeAcl",
            OpSpec::UploadNewFile { .. } => "UploadNewFile",
        }
    }

    /// The external toolchain invocation for this operation.
    pub fn command(&self, config: &Config) -> Vec<String> {
        let cluster = &config.cluster_url;
        match self {
            OpSpec::ListUsers {} => vec!["list-users".into(), cluster.clone()],
            OpSpec::ListVolumes {} => vec!["list".into(), cluster.clone()],
            OpSpec::ListFiles { volume } => {
                vec!["list".into(), format!("{cluster}/{volume}")]
            }
            OpSpec::ShowVolumeAcl { volume } => {
                vec!["show-acl".into(), format!("{cluster}/{volume}")]
            }
            OpSpec::UploadNewFile {
                volume, filename, ..
            } => vec![
                "upload-stream".into(),
                format!("{cluster}/{volume}/{filename}"),
            ],
        }
    }

    /// The `(size, offset)` entropy slice fed to the command's stdin, for
    /// variants that carry a payload.
    pub fn payload_range(&self) -> Option<(u64, u64)> {
        match self {
            OpSpec::UploadNewFile { size, offset, .. } => Some((*size, *offset)),
            _ => None,
        }
    }
}

fn pick_volume(config: &Config, rng: &mut impl Rng) -> String {
    config.volumes[rng.random_range(0..config.volumes.len())].clone()
}

/// Executes operations. The engines only know this seam, so tests can
/// substitute instantly-completing or misbehaving runners.
#[async_trait]
pub trait OpRunner: Send + Sync {
    /// Run one operation to completion.
    ///
    /// A nonzero exit from the external tool is an expected outcome and
    /// only logged; `Err` means the operation itself could not be
    /// executed (tool missing, I/O failure reading the payload).
    async fn run(&self, op: &OpSpec) -> Result<()>;
}

/// The real runner: builds the external command, pipes the payload,
/// captures output and classifies the result.
pub struct CommandRunner {
    config: Config,
    entropy_path: PathBuf,
}

impl CommandRunner {
    pub fn new(config: Config, entropy_path: PathBuf) -> Self {
        Self {
            config,
            entropy_path,
        }
    }
}

#[async_trait]
impl OpRunner for CommandRunner {
    async fn run(&self, op: &OpSpec) -> Result<()> {
        let argv = op.command(&self.config);
        let input = match op.payload_range() {
            Some((size, offset)) => {
                Some(entropy::read_slice(&self.entropy_path, size, offset).await?)
            }
            None => None,
        };

        let started = Instant::now();
        let output = run_command(&argv, input.as_deref()).await?;
        let duration = started.elapsed();

        if output.status.success() {
            debug!("{} finished in {:.3}s", op.name(), duration.as_secs_f64());
        } else {
            error!("{}", failure_report(op.name(), &argv, &output));
        }
        Ok(())
    }
}

/// Spawn `argv`, optionally feeding `input` on stdin, and capture the
/// outcome. stdout/stderr are collected, never streamed.
pub async fn run_command(argv: &[String], input: Option<&[u8]>) -> Result<Output> {
    let (program, args) = argv.split_first().context("empty command")?;
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .with_context(|| format!("failed to spawn {program}"))?;
    if let Some(payload) = input {
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(payload)
                .await
                .with_context(|| format!("failed to write {program} input"))?;
        }
    }
    child
        .wait_with_output()
        .await
        .with_context(|| format!("failed to collect {program} output"))
}

/// Diagnostic for a nonzero external exit: name, status, argv, and any
/// non-empty captured output.
fn failure_report(name: &str, argv: &[String], output: &Output) -> String {
    let status = match output.status.code() {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    };
    let mut message = format!("{name} exited with {status}:\n");
    message.push_str(&report_line("args", &format!("{argv:?}")));
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        message.push_str(&report_line("stdout", stdout.trim()));
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        message.push_str(&report_line("stderr", stderr.trim()));
    }
    message
}

fn report_line(name: &str, content: &str) -> String {
    let connector = if content.contains('\n') { "\n" } else { " " };
    format!(" - {name}:{connector}{content}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            cluster_url: "sx://admin@cluster.example.com".to_string(),
            volumes: vec!["vol1".to_string()],
            threads: 2,
            min_size: 1024,
            max_size: 1024,
            entropy_size: 2048,
            entropy_seed: "aa".to_string(),
        }
    }

    #[test]
    fn list_users_command() {
        let argv = OpSpec::ListUsers {}.command(&config());
        assert_eq!(argv, vec!["list-users", "sx://admin@cluster.example.com"]);
    }

    #[test]
    fn list_volumes_command() {
        let argv = OpSpec::ListVolumes {}.command(&config());
        assert_eq!(argv, vec!["list", "sx://admin@cluster.example.com"]);
    }

    #[test]
    fn list_files_command() {
        let op = OpSpec::ListFiles {
            volume: "vol1".to_string(),
        };
        assert_eq!(
            op.command(&config()),
            vec!["list", "sx://admin@cluster.example.com/vol1"]
        );
    }

    #[test]
    fn show_acl_command() {
        let op = OpSpec::ShowVolumeAcl {
            volume: "vol1".to_string(),
        };
        assert_eq!(
            op.command(&config()),
            vec!["show-acl", "sx://admin@cluster.example.com/vol1"]
        );
    }

    #[test]
    fn upload_command_and_payload() {
        let op = OpSpec::UploadNewFile {
            volume: "vol1".to_string(),
            filename: "sxload-x".to_string(),
            size: 1024,
            offset: 512,
        };
        assert_eq!(
            op.command(&config()),
            vec!["upload-stream", "sx://admin@cluster.example.com/vol1/sxload-x"]
        );
        assert_eq!(op.payload_range(), Some((1024, 512)));
        assert_eq!(OpSpec::ListUsers {}.payload_range(), None);
    }

    #[test]
    fn randomized_uploads_stay_in_bounds() {
        let config = config();
        let mut saw_upload = false;
        for _ in 0..200 {
            if let OpSpec::UploadNewFile {
                volume,
                filename,
                size,
                offset,
            } = OpSpec::randomize(&config)
            {
                saw_upload = true;
                assert_eq!(volume, "vol1");
                assert!(filename.starts_with(UPLOAD_FILENAME_PREFIX));
                assert!(config.min_size <= size && size <= config.max_size);
                assert!(offset + size <= config.entropy_size);
            }
        }
        assert!(saw_upload);
    }

    #[test]
    fn upload_filenames_are_unique() {
        let config = config();
        let mut names = std::collections::HashSet::new();
        while names.len() < 20 {
            if let OpSpec::UploadNewFile { filename, .. } = OpSpec::randomize(&config) {
                assert!(names.insert(filename));
            }
        }
    }

    #[test]
    fn params_serialize_to_the_recorded_shape() {
        let yaml = serde_yaml::to_string(&OpSpec::ListUsers {}).unwrap();
        assert!(yaml.contains("type: ListUsers"), "{yaml}");
        assert!(yaml.contains("params: {}"), "{yaml}");

        let yaml = serde_yaml::to_string(&OpSpec::ListFiles {
            volume: "vol1".to_string(),
        })
        .unwrap();
        assert!(yaml.contains("type: ListFiles"), "{yaml}");
        assert!(yaml.contains("volume: vol1"), "{yaml}");
    }

    #[test]
    fn every_variant_round_trips() {
        let ops = [
            OpSpec::ListUsers {},
            OpSpec::ListVolumes {},
            OpSpec::ListFiles {
                volume: "v".to_string(),
            },
            OpSpec::ShowVolumeAcl {
                volume: "v".to_string(),
            },
            OpSpec::UploadNewFile {
                volume: "v".to_string(),
                filename: "f".to_string(),
                size: 10,
                offset: 3,
            },
        ];
        for op in ops {
            let yaml = serde_yaml::to_string(&op).unwrap();
            let back: OpSpec = serde_yaml::from_str(&yaml).unwrap();
            assert_eq!(back, op);
        }
    }

    #[tokio::test]
    async fn missing_tool_is_an_internal_error() {
        let result = run_command(&["sxload-no-such-tool".to_string()], None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn captures_output_and_exit_code() {
        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo out; echo err >&2; exit 3".to_string(),
        ];
        let output = run_command(&argv, None).await.unwrap();
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "out");
        assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "err");
    }

    #[tokio::test]
    async fn pipes_stdin_payload() {
        let output = run_command(&["cat".to_string()], Some(b"payload")).await.unwrap();
        assert!(output.status.success());
        assert_eq!(output.stdout, b"payload");
    }

    #[test]
    fn failure_report_includes_context() {
        use std::os::unix::process::ExitStatusExt;
        let output = Output {
            status: std::process::ExitStatus::from_raw(256), // exit code 1
            stdout: b"partial listing".to_vec(),
            stderr: b"volume not found".to_vec(),
        };
        let argv = vec!["list".to_string(), "@sx/vol1".to_string()];
        let report = failure_report("ListFiles", &argv, &output);
        assert!(report.starts_with("ListFiles exited with 1:"), "{report}");
        assert!(report.contains("args:"), "{report}");
        assert!(report.contains("partial listing"), "{report}");
        assert!(report.contains("volume not found"), "{report}");
    }
}
