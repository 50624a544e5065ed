//! Transport-agnostic request handlers.
//!
//! Each handler returns a JSON envelope; a failed operation yields
//! `{"error": "..."}` with `ok == false` so a transport can map it to a status.

use crate::cache::UnifiedCache;
use crate::config::WizardConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{MergeFailure, PersistenceError};
use crate::loader::{LoadReport, SpecLoader};
use crate::merge;
use crate::project::{self, Projection, ValueMap};
use crate::spec::keys::rekey_object;
use crate::spec::{ContributionSpec, FieldPathIndex, Page, UnifiedSpec};
use crate::state::{self, FileStateStore, StateStore, WizardState};

use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, info};

const REQUEST_KEYS: &[&str] = &["values", "pages", "outputTemplate"];

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub ok: bool,
    pub body: Value,
}

impl Response {
    pub fn ok(body: Value) -> Self {
        Self { ok: true, body }
    }

    pub fn message(msg: &str) -> Self {
        Self::ok(json!({ "message": msg }))
    }

    pub fn error(msg: impl std::fmt::Display) -> Self {
        Self {
            ok: false,
            body: json!({ "error": msg.to_string() }),
        }
    }

    fn serialized<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self::ok(body),
            Err(e) => Self::error(e),
        }
    }
}

/// Body of a generate-output request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateRequest {
    pub values: ValueMap,
    pub pages: Vec<Page>,
    pub output_template: Value,
}

impl GenerateRequest {
    /// Decode `{values, pages, outputTemplate}` with case-insensitive property names.
    pub fn from_json_value(mut value: Value) -> serde_json::Result<Self> {
        let Value::Object(obj) = &mut value else {
            return Err(serde::de::Error::custom("generate request must be a JSON object"));
        };
        rekey_object(obj, REQUEST_KEYS);

        let values = match obj.remove("values") {
            Some(v) if !v.is_null() => serde_json::from_value(v)?,
            _ => ValueMap::new(),
        };
        let pages = match obj.remove("pages") {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(Page::from_json_value)
                .collect::<serde_json::Result<Vec<_>>>()?,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => return Err(serde::de::Error::custom("pages must be an array")),
        };
        let output_template = obj.remove("outputTemplate").unwrap_or(Value::Null);

        Ok(Self {
            values,
            pages,
            output_template,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContributionSummary<'a> {
    contrib_id: &'a str,
    priority: i32,
    page_count: usize,
    patch_count: usize,
}

impl<'a> From<&'a ContributionSpec> for ContributionSummary<'a> {
    fn from(spec: &'a ContributionSpec) -> Self {
        Self {
            contrib_id: &spec.contrib_id,
            priority: spec.priority,
            page_count: spec.pages.len(),
            patch_count: spec.page_patches.len(),
        }
    }
}

pub struct WizardService {
    config: WizardConfig,
    loader: SpecLoader,
    cache: UnifiedCache,
    state: Box<dyn StateStore>,
}

impl WizardService {
    pub fn new(config: WizardConfig) -> Self {
        let state = Box::new(FileStateStore::new(config.state_path.clone()));
        Self::with_state_store(config, state)
    }

    pub fn with_state_store(config: WizardConfig, state: Box<dyn StateStore>) -> Self {
        Self {
            loader: SpecLoader::new(config.spec_dirs.clone()),
            config,
            cache: UnifiedCache::new(),
            state,
        }
    }

    pub fn config(&self) -> &WizardConfig {
        &self.config
    }

    pub fn cache(&self) -> &UnifiedCache {
        &self.cache
    }

    fn merge_report(report: &LoadReport) -> Result<UnifiedSpec, MergeFailure> {
        let mut seed = Diagnostics::new();
        seed.extend_raw(report.warnings());
        merge::merge_with(&report.specs, seed)
    }

    /// Cached unified spec, built from the current contribution set on first use.
    pub fn unified_spec(&self) -> Result<Arc<UnifiedSpec>, MergeFailure> {
        self.cache
            .get_or_try_build(|| Self::merge_report(&self.loader.load_all()))
    }

    pub fn unified(&self) -> Response {
        match self.unified_spec() {
            Ok(spec) => Response::serialized(spec.as_ref()),
            Err(failure) => {
                error!("failed to get unified spec: {}", failure);
                Response::error(&failure)
            }
        }
    }

    /// Fresh load + merge (bypasses the cache).
    pub fn diagnostics(&self) -> Response {
        let report = self.loader.load_all();

        let mut ordered: Vec<&ContributionSpec> = report.specs.iter().collect();
        ordered.sort_by_key(|c| c.priority);
        let contributions: Vec<ContributionSummary<'_>> =
            ordered.into_iter().map(ContributionSummary::from).collect();

        match Self::merge_report(&report) {
            Ok(unified) => Response::ok(json!({
                "specCount": report.specs.len(),
                "pageCount": unified.pages.len(),
                "diagnostics": unified.diagnostics,
                "contributions": contributions,
            })),
            Err(failure) => {
                error!("failed to get diagnostics: {}", failure);
                Response {
                    ok: false,
                    body: json!({
                        "error": failure.to_string(),
                        "diagnostics": failure.diagnostics,
                    }),
                }
            }
        }
    }

    pub fn reload(&self) -> Response {
        self.cache.invalidate();
        info!("spec cache cleared");
        Response::message("Spec cache cleared")
    }

    /// Fill an omitted page list or output template from the unified spec.
    pub fn complete_request(
        &self,
        mut req: GenerateRequest,
    ) -> Result<GenerateRequest, MergeFailure> {
        if req.pages.is_empty() || req.output_template.is_null() {
            let unified = self.unified_spec()?;
            if req.pages.is_empty() {
                req.pages = unified.pages.clone();
            }
            if req.output_template.is_null() {
                req.output_template = unified.output_template.to_json();
            }
        }
        Ok(req)
    }

    /// Project values and persist the document to the configured output path.
    pub fn generate_document(&self, req: &GenerateRequest) -> Result<Projection, PersistenceError> {
        let index = FieldPathIndex::from_pages(&req.pages);
        let projection = project::project(&req.output_template, &index, &req.values);

        let path = &self.config.output_path;
        let text = serde_json::to_string_pretty(&projection.document).map_err(|source| {
            PersistenceError::Serialize {
                path: path.clone(),
                source,
            }
        })?;
        state::write_file(path, &text)?;

        info!(
            warnings = projection.warnings.len(),
            "generated output JSON at {}",
            path.display()
        );
        Ok(projection)
    }

    pub fn generate(&self, req: &GenerateRequest) -> Response {
        match self.generate_document(req) {
            Ok(projection) => Response::ok(projection.to_json()),
            Err(e) => {
                error!("failed to generate output: {}", e);
                Response::error(e)
            }
        }
    }

    pub fn state(&self) -> Response {
        Response::serialized(&self.state.load())
    }

    pub fn save_state(&self, state: WizardState) -> Response {
        match self.state.save(state) {
            Ok(_) => Response::message("State saved successfully"),
            Err(e) => Response::error(e),
        }
    }

    pub fn clear_state(&self) -> Response {
        match self.state.clear() {
            Ok(()) => Response::message("State cleared successfully"),
            Err(e) => Response::error(e),
        }
    }
}

impl std::fmt::Debug for WizardService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WizardService")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn request_decodes_mixed_case() {
        let req = GenerateRequest::from_json_value(json!({
            "Values": {"hostname": "box"},
            "PAGES": [{"ID": "net", "Fields": [{"Id": "hostname", "JSONPATH": "$.net.host"}]}],
            "outputtemplate": {"Keep": 1}
        }))
        .unwrap();

        assert_eq!(req.values.get("hostname"), Some(&json!("box")));
        assert_eq!(req.pages[0].fields[0].json_path, "$.net.host");
        assert_eq!(req.output_template, json!({"Keep": 1}));
    }

    #[test]
    fn request_defaults_when_parts_are_missing() {
        let req = GenerateRequest::from_json_value(json!({})).unwrap();
        assert_eq!(req, GenerateRequest::default());

        assert!(GenerateRequest::from_json_value(json!([1])).is_err());
        assert!(GenerateRequest::from_json_value(json!({"pages": 3})).is_err());
    }
}
