//! Discovery and parsing of contribution files (`<dir>/*.json`).

use crate::diagnostics;
use crate::error::LoadError;
use crate::spec::ContributionSpec;

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Default search path when no directory is configured.
pub const DEFAULT_SPEC_DIRS: &[&str] = &[
    "/usr/share/installer/spec.d",
    "/etc/installer/spec.d",
    "/var/lib/installer/spec.d",
];

#[derive(Debug, Default)]
pub struct LoadReport {
    /// In discovery order; the merge engine sorts by priority.
    pub specs: Vec<ContributionSpec>,
    pub skipped: Vec<LoadError>,
}

impl LoadReport {
    /// Skipped files rendered as diagnostics entries.
    pub fn warnings(&self) -> Vec<String> {
        self.skipped
            .iter()
            .map(|e| diagnostics::warning_message(format!("skipped {}", e)))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct SpecLoader {
    dirs: Vec<PathBuf>,
}

impl SpecLoader {
    pub fn new<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Load every `*.json` file in the configured directories.
    ///
    /// Directories are visited in configured order and files in name order.
    /// A malformed file is skipped and reported; it never fails the batch.
    pub fn load_all(&self) -> LoadReport {
        let mut report = LoadReport::default();

        for dir in &self.dirs {
            if !dir.is_dir() {
                info!("spec directory does not exist: {}", dir.display());
                continue;
            }

            let files = match json_files(dir) {
                Ok(files) => files,
                Err(e) => {
                    warn!("cannot list spec directory {}: {}", dir.display(), e);
                    continue;
                }
            };

            for file in files {
                match load_file(&file) {
                    Ok(spec) => {
                        info!("loaded spec from {}: {}", file.display(), spec.contrib_id);
                        report.specs.push(spec);
                    }
                    Err(e) => {
                        error!(path = %e.path().display(), "{}", e);
                        report.skipped.push(e);
                    }
                }
            }
        }

        report
    }
}

/// Parse one contribution file.
pub fn load_file(path: &Path) -> Result<ContributionSpec, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    if !value.is_object() {
        return Err(LoadError::NotAnObject {
            path: path.to_path_buf(),
        });
    }

    ContributionSpec::from_json_value(value).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn json_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
