//! Merge engine: compose contribution specs into one unified spec.
//!
//! Contributions are processed by ascending priority (stable for ties). For each
//! one we:
//! 1) register new pages, rejecting redefined page ids and duplicate field ids;
//! 2) apply page patches (insert after/before an anchor field, or append);
//! 3) deep-merge its output-template patch.
//! Pages are finally sorted by their declared `order`.
//!
//! A conflict aborts the whole merge; the diagnostics gathered up to that point
//! travel with the error. Everything else only adds diagnostics.

pub mod template;

use crate::diagnostics::Diagnostics;
use crate::error::{ConflictError, MergeFailure};
use crate::spec::{Anchor, ContributionSpec, Field, Page, PagePatch, UnifiedSpec};
use crate::value::{TemplateObject, TemplateValue};

use indexmap::{IndexMap, IndexSet};
use tracing::info;

pub use template::deep_merge;

pub type MergeResult = std::result::Result<UnifiedSpec, MergeFailure>;

/// Merge with an empty diagnostics log.
pub fn merge(contributions: &[ContributionSpec]) -> MergeResult {
    merge_with(contributions, Diagnostics::new())
}

/// Merge, appending to an existing diagnostics log (e.g. loader warnings).
pub fn merge_with(contributions: &[ContributionSpec], mut diagnostics: Diagnostics) -> MergeResult {
    let mut ordered: Vec<&ContributionSpec> = contributions.iter().collect();
    ordered.sort_by_key(|c| c.priority);

    let mut acc = Accumulator::default();
    for contrib in ordered {
        if let Err(error) = acc.apply(contrib, &mut diagnostics) {
            return Err(MergeFailure {
                error,
                diagnostics: diagnostics.into_vec(),
            });
        }
    }

    let field_count = acc.field_ids.len();
    let mut pages: Vec<Page> = acc.pages.into_values().collect();
    pages.sort_by_key(|p| p.order);

    info!(
        contributions = contributions.len(),
        pages = pages.len(),
        fields = field_count,
        "merged {} contributions into {} pages with {} total fields",
        contributions.len(),
        pages.len(),
        field_count
    );

    Ok(UnifiedSpec {
        pages,
        output_template: TemplateValue::Object(acc.template),
        diagnostics: diagnostics.into_vec(),
    })
}

/// Per-call accumulation state; never shared between merges.
#[derive(Default)]
struct Accumulator {
    pages: IndexMap<String, Page>,
    field_ids: IndexSet<String>,
    template: TemplateObject,
}

impl Accumulator {
    fn apply(
        &mut self,
        contrib: &ContributionSpec,
        diag: &mut Diagnostics,
    ) -> Result<(), ConflictError> {
        let contrib_id = contrib.contrib_id.as_str();

        for page in &contrib.pages {
            self.add_page(page, contrib_id, diag)?;
        }

        for patch in &contrib.page_patches {
            self.apply_patch(patch, contrib_id, diag)?;
        }

        if let Some(patch) = &contrib.output_template_patch {
            self.merge_template(patch, contrib_id, diag);
        }

        Ok(())
    }

    fn add_page(
        &mut self,
        page: &Page,
        contrib_id: &str,
        diag: &mut Diagnostics,
    ) -> Result<(), ConflictError> {
        if self.pages.contains_key(&page.id) {
            return Err(fail(
                diag,
                ConflictError::PageRedefined {
                    page_id: page.id.clone(),
                    contrib_id: contrib_id.to_string(),
                },
            ));
        }

        reserve_field_ids(&mut self.field_ids, &page.fields, contrib_id, diag)?;

        self.pages.insert(page.id.clone(), page.clone());
        diag.note(format!(
            "Added page '{}' from contrib '{}'",
            page.id, contrib_id
        ));
        Ok(())
    }

    fn apply_patch(
        &mut self,
        patch: &PagePatch,
        contrib_id: &str,
        diag: &mut Diagnostics,
    ) -> Result<(), ConflictError> {
        let Some(page) = self.pages.get_mut(&patch.page_id) else {
            diag.warning(format!(
                "PagePatch targets non-existent page '{}' in contrib '{}'",
                patch.page_id, contrib_id
            ));
            return Ok(());
        };

        // Ids stay reserved even if the anchor lookup below drops the patch.
        reserve_field_ids(&mut self.field_ids, &patch.fields, contrib_id, diag)?;
        let count = patch.fields.len();

        match patch.anchor() {
            Anchor::After(anchor) => match position_of(&page.fields, anchor) {
                Some(idx) => {
                    insert_at(&mut page.fields, idx + 1, &patch.fields);
                    diag.note(format!(
                        "Inserted {} field(s) after '{}' in page '{}'",
                        count, anchor, patch.page_id
                    ));
                }
                None => anchor_missing(diag, anchor, patch, contrib_id),
            },
            Anchor::Before(anchor) => match position_of(&page.fields, anchor) {
                Some(idx) => {
                    insert_at(&mut page.fields, idx, &patch.fields);
                    diag.note(format!(
                        "Inserted {} field(s) before '{}' in page '{}'",
                        count, anchor, patch.page_id
                    ));
                }
                None => anchor_missing(diag, anchor, patch, contrib_id),
            },
            Anchor::Append => {
                page.fields.extend(patch.fields.iter().cloned());
                diag.note(format!(
                    "Appended {} field(s) to page '{}'",
                    count, patch.page_id
                ));
            }
        }

        Ok(())
    }

    fn merge_template(
        &mut self,
        patch: &serde_json::Value,
        contrib_id: &str,
        diag: &mut Diagnostics,
    ) {
        match TemplateValue::from_json(patch) {
            Ok(TemplateValue::Object(obj)) => {
                deep_merge(&mut self.template, obj);
                diag.note(format!(
                    "Merged output template from contrib '{}'",
                    contrib_id
                ));
            }
            Ok(_) => diag.warning(format!(
                "Output template patch from contrib '{}' is not a JSON object; ignored",
                contrib_id
            )),
            Err(e) => diag.warning(format!(
                "Output template patch from contrib '{}' could not be converted ({}); ignored",
                contrib_id, e
            )),
        }
    }
}

fn reserve_field_ids(
    field_ids: &mut IndexSet<String>,
    fields: &[Field],
    contrib_id: &str,
    diag: &mut Diagnostics,
) -> Result<(), ConflictError> {
    for field in fields {
        if !field_ids.insert(field.id.clone()) {
            return Err(fail(
                diag,
                ConflictError::DuplicateField {
                    field_id: field.id.clone(),
                    contrib_id: contrib_id.to_string(),
                },
            ));
        }
    }
    Ok(())
}

fn fail(diag: &mut Diagnostics, error: ConflictError) -> ConflictError {
    diag.error(error.to_string());
    error
}

fn anchor_missing(diag: &mut Diagnostics, anchor: &str, patch: &PagePatch, contrib_id: &str) {
    diag.warning(format!(
        "Field '{}' not found in page '{}'; dropped {} field(s) from contrib '{}'",
        anchor,
        patch.page_id,
        patch.fields.len(),
        contrib_id
    ));
}

fn position_of(fields: &[Field], id: &str) -> Option<usize> {
    fields.iter().position(|f| f.id == id)
}

fn insert_at(fields: &mut Vec<Field>, idx: usize, new: &[Field]) {
    let tail = fields.split_off(idx);
    fields.extend(new.iter().cloned());
    fields.extend(tail);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{FieldKind, FieldValidation};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn field(id: &str) -> Field {
        Field {
            id: id.to_string(),
            label: id.to_uppercase(),
            kind: FieldKind::Text,
            required: false,
            json_path: format!("$.{}", id),
            validation: FieldValidation::default(),
        }
    }

    fn page(id: &str, order: i32, fields: &[&str]) -> Page {
        Page {
            id: id.to_string(),
            title: id.to_string(),
            order,
            description: None,
            fields: fields.iter().map(|f| field(f)).collect(),
        }
    }

    fn contrib(id: &str, priority: i32) -> ContributionSpec {
        ContributionSpec {
            contrib_id: id.to_string(),
            priority,
            pages: vec![],
            page_patches: vec![],
            output_template_patch: None,
        }
    }

    fn patch(
        page_id: &str,
        after: Option<&str>,
        before: Option<&str>,
        fields: &[&str],
    ) -> PagePatch {
        PagePatch {
            page_id: page_id.to_string(),
            insert_fields_after: after.map(str::to_string),
            insert_fields_before: before.map(str::to_string),
            fields: fields.iter().map(|f| field(f)).collect(),
        }
    }

    fn field_ids(spec: &UnifiedSpec, page_id: &str) -> Vec<String> {
        spec.pages
            .iter()
            .find(|p| p.id == page_id)
            .map(|p| p.fields.iter().map(|f| f.id.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn pages_sorted_by_declared_order() {
        let mut a = contrib("a", 10);
        a.pages = vec![page("disk", 30, &["disk"]), page("welcome", 0, &[])];
        let mut b = contrib("b", 20);
        b.pages = vec![page("network", 20, &["hostname"])];

        let spec = merge(&[b, a]).unwrap();
        let ids: Vec<&str> = spec.pages.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["welcome", "network", "disk"]);
    }

    #[test]
    fn equal_order_keeps_registration_order() {
        let mut a = contrib("a", 1);
        a.pages = vec![page("first", 5, &[])];
        let mut b = contrib("b", 2);
        b.pages = vec![page("second", 5, &[])];

        let spec = merge(&[b, a]).unwrap();
        let ids: Vec<&str> = spec.pages.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn redefined_page_is_a_conflict_with_diagnostics_so_far() {
        let mut a = contrib("base", 10);
        a.pages = vec![page("network", 1, &["hostname"])];
        let mut b = contrib("vendor", 20);
        b.pages = vec![page("network", 2, &["ip"])];

        let failure = merge(&[a, b]).unwrap_err();
        assert_eq!(
            failure.error,
            ConflictError::PageRedefined {
                page_id: "network".into(),
                contrib_id: "vendor".into()
            }
        );
        assert_eq!(
            failure.diagnostics[0],
            "Added page 'network' from contrib 'base'"
        );
        assert!(failure.diagnostics.last().unwrap().starts_with("Error: Page 'network'"));
    }

    #[test]
    fn duplicate_field_across_pages_is_a_conflict() {
        let mut a = contrib("a", 10);
        a.pages = vec![page("p1", 1, &["hostname"]), page("p2", 2, &["hostname"])];

        let failure = merge(&[a]).unwrap_err();
        assert!(matches!(
            failure.error,
            ConflictError::DuplicateField { ref field_id, .. } if field_id == "hostname"
        ));
    }

    #[test]
    fn duplicate_field_in_patch_is_a_conflict() {
        let mut a = contrib("a", 10);
        a.pages = vec![page("net", 1, &["hostname"])];
        a.page_patches = vec![patch("net", None, None, &["hostname"])];

        assert!(merge(&[a]).is_err());
    }

    #[test]
    fn patch_inserts_after_and_before_anchor() {
        let mut a = contrib("a", 10);
        a.pages = vec![page("net", 1, &["hostname", "gateway"])];
        let mut b = contrib("b", 20);
        b.page_patches = vec![
            patch("net", Some("hostname"), None, &["ip", "mask"]),
            patch("net", None, Some("hostname"), &["iface"]),
            patch("net", None, None, &["dns"]),
        ];

        let spec = merge(&[a, b]).unwrap();
        assert_eq!(
            field_ids(&spec, "net"),
            vec!["iface", "hostname", "ip", "mask", "gateway", "dns"]
        );
        assert!(spec
            .diagnostics
            .contains(&"Inserted 2 field(s) after 'hostname' in page 'net'".to_string()));
        assert!(spec
            .diagnostics
            .contains(&"Inserted 1 field(s) before 'hostname' in page 'net'".to_string()));
        assert!(spec
            .diagnostics
            .contains(&"Appended 1 field(s) to page 'net'".to_string()));
    }

    #[test]
    fn missing_anchor_drops_whole_patch() {
        let mut a = contrib("a", 10);
        a.pages = vec![page("net", 1, &["hostname"])];
        a.page_patches = vec![patch("net", Some("nope"), None, &["ip", "mask"])];

        let spec = merge(&[a]).unwrap();
        assert_eq!(field_ids(&spec, "net"), vec!["hostname"]);
        assert!(spec
            .diagnostics
            .iter()
            .any(|d| d.starts_with("Warning: Field 'nope' not found in page 'net'")));
    }

    #[test]
    fn dropped_patch_still_reserves_its_field_ids() {
        let mut a = contrib("a", 10);
        a.pages = vec![page("net", 1, &["hostname"])];
        a.page_patches = vec![patch("net", None, Some("nope"), &["ip"])];
        let mut b = contrib("b", 20);
        b.pages = vec![page("extra", 2, &["ip"])];

        assert!(matches!(
            merge(&[a, b]).unwrap_err().error,
            ConflictError::DuplicateField { .. }
        ));
    }

    #[test]
    fn missing_before_anchor_leaves_page_unchanged() {
        let mut a = contrib("a", 10);
        a.pages = vec![page("net", 1, &["hostname", "gateway"])];
        a.page_patches = vec![patch("net", None, Some("nope"), &["ip"])];

        let spec = merge(&[a]).unwrap();
        assert_eq!(field_ids(&spec, "net"), vec!["hostname", "gateway"]);
        assert!(spec.diagnostics.contains(
            &"Warning: Field 'nope' not found in page 'net'; dropped 1 field(s) from contrib 'a'"
                .to_string()
        ));
    }

    #[test]
    fn equal_priorities_keep_arrival_order() {
        let mut owner = contrib("owner", 7);
        owner.pages = vec![page("net", 1, &["hostname"])];
        let mut patcher = contrib("patcher", 7);
        patcher.page_patches = vec![patch("net", None, None, &["dns"])];

        let spec = merge(&[owner.clone(), patcher.clone()]).unwrap();
        assert_eq!(field_ids(&spec, "net"), vec!["hostname", "dns"]);

        let spec = merge(&[patcher, owner]).unwrap();
        assert_eq!(field_ids(&spec, "net"), vec!["hostname"]);
        assert_eq!(
            spec.diagnostics[0],
            "Warning: PagePatch targets non-existent page 'net' in contrib 'patcher'"
        );
    }

    #[test]
    fn patch_on_missing_page_is_skipped_with_warning() {
        let mut a = contrib("a", 10);
        a.page_patches = vec![patch("ghost", None, None, &["x"])];
        let mut b = contrib("b", 20);
        b.pages = vec![page("real", 1, &["x"])];

        let spec = merge(&[a, b]).unwrap();
        assert_eq!(field_ids(&spec, "real"), vec!["x"]);
        assert_eq!(
            spec.diagnostics[0],
            "Warning: PagePatch targets non-existent page 'ghost' in contrib 'a'"
        );
    }

    #[test]
    fn lower_priority_runs_first_so_patch_sees_page() {
        let mut owner = contrib("owner", 50);
        owner.pages = vec![page("net", 1, &["hostname"])];
        let mut patcher = contrib("patcher", 100);
        patcher.page_patches = vec![patch("net", None, None, &["dns"])];

        // Arrival order is the reverse of processing order.
        let spec = merge(&[patcher, owner]).unwrap();
        assert_eq!(field_ids(&spec, "net"), vec!["hostname", "dns"]);
    }

    #[test]
    fn template_patches_merge_in_priority_order() {
        let mut a = contrib("a", 10);
        a.output_template_patch = Some(json!({"a": 1, "net": {"x": 1}}));
        let mut b = contrib("b", 20);
        b.output_template_patch = Some(json!({"a": {"y": 2}, "net": {"y": 2}}));
        let mut c = contrib("c", 30);
        c.output_template_patch = Some(json!(["not", "an", "object"]));

        let spec = merge(&[c, b, a]).unwrap();
        assert_eq!(
            spec.output_template.to_json(),
            json!({"a": {"y": 2}, "net": {"x": 1, "y": 2}})
        );
        assert!(spec
            .diagnostics
            .iter()
            .any(|d| d.starts_with("Warning: Output template patch from contrib 'c'")));
    }

    #[test]
    fn seeded_diagnostics_come_first() {
        let mut seed = Diagnostics::new();
        seed.warning("skipped broken.json");

        let spec = merge_with(&[], seed).unwrap();
        assert_eq!(spec.diagnostics, vec!["Warning: skipped broken.json".to_string()]);
        assert_eq!(spec.output_template, TemplateValue::empty_object());
    }
}
