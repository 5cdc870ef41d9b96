use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::debug;

use aet_types::{AetResult, ModelFamily, PersistenceError};

use crate::records::{SearchRecord, TIMESTAMP_FORMAT};
use crate::storage::{load_search_results, RESULTS_FILE_MARKER};

/// A result file found in the results directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEntry {
    pub family: ModelFamily,
    pub timestamp: NaiveDateTime,
    pub path: PathBuf,
}

impl RunEntry {
    pub fn load(&self) -> AetResult<SearchRecord> {
        load_search_results(&self.path)
    }
}

/// Split `{family}_hyperparam_search_{YYYYMMDD_HHMMSS}.json` into its parts.
pub fn parse_results_file_name(name: &str) -> AetResult<(ModelFamily, NaiveDateTime)> {
    let invalid = || PersistenceError::InvalidFileName {
        name: name.to_string(),
    };

    let stem = name.strip_suffix(".json").ok_or_else(invalid)?;
    let (family, stamp) = stem.split_once(RESULTS_FILE_MARKER).ok_or_else(invalid)?;
    let family: ModelFamily = family.parse().map_err(|_| invalid())?;
    let timestamp =
        NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).map_err(|_| invalid())?;
    Ok((family, timestamp))
}

/// Read-only view over the saved search runs in a results directory.
#[derive(Debug, Clone)]
pub struct RunCatalog {
    results_dir: PathBuf,
}

impl RunCatalog {
    pub fn new<P: AsRef<Path>>(results_dir: P) -> Self {
        Self {
            results_dir: results_dir.as_ref().to_path_buf(),
        }
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Saved runs, newest first, optionally restricted to one family.
    ///
    /// Files that do not follow the result naming scheme are ignored. A
    /// missing directory lists as empty.
    pub fn list(&self, family: Option<ModelFamily>) -> AetResult<Vec<RunEntry>> {
        let mut runs = Vec::new();

        if !self.results_dir.exists() {
            return Ok(runs);
        }

        for entry in std::fs::read_dir(&self.results_dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }

            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            match parse_results_file_name(name) {
                Ok((run_family, timestamp)) => {
                    if family.map_or(true, |f| f == run_family) {
                        runs.push(RunEntry {
                            family: run_family,
                            timestamp,
                            path: path.clone(),
                        });
                    }
                }
                Err(_) => debug!("Skipping non-result file: {}", path.display()),
            }
        }

        runs.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| a.path.cmp(&b.path))
        });
        Ok(runs)
    }

    /// Most recent run for a family.
    pub fn latest(&self, family: ModelFamily) -> AetResult<Option<RunEntry>> {
        Ok(self.list(Some(family))?.into_iter().next())
    }
}
