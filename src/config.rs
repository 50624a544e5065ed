//! Runtime configuration: where contributions live and where documents go.

use crate::loader::DEFAULT_SPEC_DIRS;
use crate::state::DEFAULT_STATE_PATH;

use clap::Args;
use std::path::PathBuf;

pub const DEFAULT_OUTPUT_PATH: &str = "/var/lib/installer/output.json";

/// Resolved, immutable configuration consumed by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardConfig {
    pub spec_dirs: Vec<PathBuf>,
    pub output_path: PathBuf,
    pub state_path: PathBuf,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            spec_dirs: DEFAULT_SPEC_DIRS.iter().map(PathBuf::from).collect(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
        }
    }
}

/// Command-line / environment overrides.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// Specification directory (repeatable; scanned in the given order).
    #[arg(long = "spec-dir", env = "WIZARD_SPEC_DIRS", value_delimiter = ',')]
    pub spec_dirs: Vec<PathBuf>,

    /// Output JSON file path.
    #[arg(long = "output", env = "WIZARD_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Wizard state file path.
    #[arg(long = "state", env = "WIZARD_STATE")]
    pub state: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn into_config(self) -> WizardConfig {
        let defaults = WizardConfig::default();
        WizardConfig {
            spec_dirs: if self.spec_dirs.is_empty() {
                defaults.spec_dirs
            } else {
                self.spec_dirs
            },
            output_path: self.output.unwrap_or(defaults.output_path),
            state_path: self.state.unwrap_or(defaults.state_path),
        }
    }
}
