use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use strum::Display;
use tracing::{info, warn};

use crate::config::PortalConfig;
use crate::discovery::{discover, Problem};
use crate::error::{Error, Result};
use crate::fetch::{fetch_sample, fetch_text};
use crate::merge::merge;
use crate::session::{Namespace, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Text,
    Samples,
}

#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub problem: Problem,
    pub phase: Phase,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub namespace: Namespace,
    pub problems: Vec<Problem>,
    pub texts: Vec<PathBuf>,
    pub samples: Vec<PathBuf>,
    pub merged: Option<PathBuf>,
    pub failures: Vec<Failure>,
}

/// Logs in if credentials are configured, then downloads every problem text,
/// merges them, and downloads every sample archive. Progress lines go to `out`.
///
/// Failures of individual problems are recorded in the report and do not stop
/// the run. Login, discovery and output directory errors do.
pub async fn run<W: Write>(config: &PortalConfig, out: &mut W) -> Result<RunReport> {
    let session = Session::connect(config).await?;
    info!(namespace = %session.namespace(), url = %config.base_url(), "connected");

    let mut report = RunReport {
        namespace: session.namespace(),
        problems: discover(&session).await?,
        ..Default::default()
    };
    writeln!(out, "problems: {}", report.problems.len())?;

    let texts_dir = config.texts_dir();
    fs::create_dir_all(&texts_dir)?;
    for problem in &report.problems {
        match fetch_text(&session, problem, &texts_dir).await {
            Ok(path) => {
                writeln!(out, "downloaded {}", path.display())?;
                report.texts.push(path);
            }
            Err(e) => {
                warn!(problem = %problem.name, error = %e, "text download failed");
                writeln!(out, "failed to download text for {}: {}", problem.name, e)?;
                report.failures.push(Failure::new(problem, Phase::Text, e));
            }
        }
        tokio::time::sleep(config.delay()).await;
    }

    if !report.texts.is_empty() {
        let dest = config.merged_path();
        match merge(&report.texts, &dest) {
            Ok(pages) => {
                writeln!(out, "merged {} pages into {}", pages, dest.display())?;
                report.merged = Some(dest);
            }
            Err(e) => {
                warn!(error = %e, "merge failed");
                writeln!(out, "failed to merge: {}", e)?;
            }
        }
    }

    let samples_dir = config.samples_dir();
    fs::create_dir_all(&samples_dir)?;
    for problem in &report.problems {
        match fetch_sample(&session, problem, &samples_dir).await {
            Ok(path) => {
                writeln!(out, "downloaded samples for {}", problem.name)?;
                report.samples.push(path);
            }
            Err(e) => {
                warn!(problem = %problem.name, error = %e, "sample download failed");
                writeln!(out, "failed to download samples for {}: {}", problem.name, e)?;
                report.failures.push(Failure::new(problem, Phase::Samples, e));
            }
        }
        tokio::time::sleep(config.delay()).await;
    }

    if !report.failures.is_empty() {
        writeln!(out, "{} download(s) failed", report.failures.len())?;
    }

    Ok(report)
}

impl Failure {
    fn new(problem: &Problem, phase: Phase, error: impl ToString) -> Self {
        Self {
            problem: problem.clone(),
            phase,
            error: error.to_string(),
        }
    }
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Writes the report as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = fs::File::create(path).map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}
