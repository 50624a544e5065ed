//! Compose installer wizard contributions into one definition and project
//! collected values onto the output document.

pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod loader;
pub mod merge;
pub mod project;
pub mod service;
pub mod spec;
pub mod state;
pub mod value;

pub type Result<T> = anyhow::Result<T>;

pub use cache::UnifiedCache;
pub use config::WizardConfig;
pub use error::{ConflictError, MergeFailure};
pub use merge::{merge, merge_with};
pub use project::{Projection, ValueMap, project};
pub use service::{GenerateRequest, Response, WizardService};
pub use spec::{ContributionSpec, FieldPathIndex, UnifiedSpec};
pub use value::TemplateValue;
