// # expac Snapshot Source
//
// This crate provides an expac-based snapshot source for apw.
//
// ## Purpose
//
// Lists every package in the pacman sync databases by running `expac`
// against a pacman configuration. The sync databases are whatever the last
// `pacman -Sy` downloaded, so this source never touches the network.
//
// ## Output Format
//
// expac prints one line per package with eight tab-separated fields:
//
// ```text
// repo  base  name  arch  build-date  url  desc  version
// ```
//
// A missing base is printed as `(null)`. The build date is requested as
// seconds since the epoch (`--timefmt %s`).

use apw_core::config::SourceConfig;
use apw_core::traits::{SnapshotSource, SnapshotSourceFactory};
use apw_core::{CatalogRecord, Error, Result, SourceRegistry};

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

/// expac format string; expac expands the `\t` escapes itself
const EXPAC_FORMAT: &str = r"%r\t%e\t%n\t%a\t%b\t%u\t%d\t%v";

/// Number of fields in each line of output
const FIELD_COUNT: usize = 8;

/// How expac prints an absent value
const NULL_FIELD: &str = "(null)";

/// Default timeout for one expac invocation
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Snapshot source backed by the `expac` command
#[derive(Debug, Clone)]
pub struct ExpacSource {
    /// Path to the expac binary
    expac_path: PathBuf,

    /// pacman.conf handed to expac
    pacman_conf: PathBuf,

    /// Upper bound on a single run
    timeout: Duration,
}

impl ExpacSource {
    /// Create a new expac source
    ///
    /// # Parameters
    ///
    /// - `expac_path`: Path to the expac binary (e.g., "/usr/bin/expac")
    /// - `pacman_conf`: pacman configuration to query
    pub fn new(expac_path: impl Into<PathBuf>, pacman_conf: impl Into<PathBuf>) -> Self {
        Self {
            expac_path: expac_path.into(),
            pacman_conf: pacman_conf.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Create with a custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run expac and return its standard output
    async fn run_expac(&self) -> Result<String> {
        let mut command = Command::new(&self.expac_path);
        command
            .arg("--config")
            .arg(&self.pacman_conf)
            .args(["--timefmt", "%s", "-S", EXPAC_FORMAT])
            .stdin(Stdio::null())
            .kill_on_drop(true);

        tracing::debug!(
            "Running {} --config {}",
            self.expac_path.display(),
            self.pacman_conf.display()
        );

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                Error::source(format!(
                    "expac did not finish within {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                Error::source(format!(
                    "Failed to run {}: {}",
                    self.expac_path.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::source(format!(
                "expac exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| Error::source(format!("expac output is not valid UTF-8: {}", e)))
    }
}

#[async_trait::async_trait]
impl SnapshotSource for ExpacSource {
    async fn fetch(&self) -> Result<Vec<CatalogRecord>> {
        let stdout = self.run_expac().await?;
        let records = parse_output(&stdout)?;
        tracing::debug!("expac listed {} packages", records.len());
        Ok(records)
    }

    fn source_name(&self) -> &'static str {
        "expac"
    }
}

/// Parse the full output of expac
///
/// Blank lines are skipped. Any malformed line fails the whole parse.
pub fn parse_output(output: &str) -> Result<Vec<CatalogRecord>> {
    output
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| parse_line(index + 1, line))
        .collect()
}

/// Parse one line of expac output
fn parse_line(line_no: usize, line: &str) -> Result<CatalogRecord> {
    let fields: Vec<&str> = line.split('\t').collect();
    let [repo, base, name, arch, build_time, url, desc, version] = fields[..] else {
        return Err(Error::source(format!(
            "expac line {}: expected {} fields, got {}",
            line_no,
            FIELD_COUNT,
            fields.len()
        )));
    };

    let build_time = build_time.trim().parse::<i64>().map_err(|_| {
        Error::source(format!(
            "expac line {}: build time {:?} is not a timestamp",
            line_no, build_time
        ))
    })?;

    Ok(CatalogRecord {
        repo: repo.to_string(),
        base: (base != NULL_FIELD).then(|| base.to_string()),
        name: name.to_string(),
        arch: arch.to_string(),
        build_time,
        url: url.to_string(),
        desc: desc.to_string(),
        version: version.to_string(),
    })
}

/// Factory for creating expac sources
pub struct ExpacSourceFactory;

impl SnapshotSourceFactory for ExpacSourceFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn SnapshotSource>> {
        match config {
            SourceConfig::Expac {
                expac_path,
                pacman_conf,
                timeout_secs,
            } => Ok(Box::new(
                ExpacSource::new(expac_path, pacman_conf)
                    .with_timeout(Duration::from_secs(*timeout_secs)),
            )),
            _ => Err(Error::config("Invalid config for expac source")),
        }
    }
}

/// Register the expac source with the registry
pub fn register(registry: &SourceRegistry) {
    registry.register_source("expac", Box::new(ExpacSourceFactory));
}
