//! Template projector: write wizard values into the output document.
//!
//! Each value is routed through its field's declared path. Problems with a
//! single field (unknown id, bad path, unconvertible value) are recorded as
//! warnings and never stop the remaining fields from being written.

pub mod path;

use crate::error::ProjectionWarning;
use crate::spec::FieldPathIndex;
use crate::value::{TemplateObject, TemplateValue};

use indexmap::IndexMap;
use tracing::{debug, warn};

pub use path::{OutputPath, PathError};

/// Field id -> user-entered value.
pub type ValueMap = IndexMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub document: TemplateValue,
    pub warnings: Vec<ProjectionWarning>,
}

impl Projection {
    pub fn to_json(&self) -> serde_json::Value {
        self.document.to_json()
    }
}

pub fn project(
    skeleton: &serde_json::Value,
    index: &FieldPathIndex,
    values: &ValueMap,
) -> Projection {
    let mut warnings = Vec::new();

    let mut root = match TemplateValue::from_json(skeleton) {
        Ok(TemplateValue::Object(map)) => map,
        Ok(TemplateValue::Null) => TemplateObject::new(),
        _ => {
            warnings.push(ProjectionWarning::SkeletonNotObject);
            TemplateObject::new()
        }
    };

    let mut written = 0usize;
    for (field_id, raw) in values {
        match resolve(field_id, raw, index) {
            Ok((path, value)) => {
                write_at(&mut root, &path, value);
                written += 1;
            }
            Err(w) => warnings.push(w),
        }
    }

    for w in &warnings {
        warn!("{}", w);
    }
    debug!(
        written,
        skipped = warnings.len(),
        "projected {} of {} values",
        written,
        values.len()
    );

    Projection {
        document: TemplateValue::Object(root),
        warnings,
    }
}

fn resolve(
    field_id: &str,
    raw: &serde_json::Value,
    index: &FieldPathIndex,
) -> Result<(OutputPath, TemplateValue), ProjectionWarning> {
    let declared = index
        .get(field_id)
        .ok_or_else(|| ProjectionWarning::UnknownField(field_id.to_string()))?;

    let path = OutputPath::parse(declared).map_err(|e| ProjectionWarning::InvalidPath {
        field_id: field_id.to_string(),
        path: declared.to_string(),
        reason: e.to_string(),
    })?;

    // Convert before touching the document so a failure leaves it untouched.
    let value = TemplateValue::from_json(raw).map_err(|source| ProjectionWarning::Conversion {
        field_id: field_id.to_string(),
        source,
    })?;

    Ok((path, value))
}

/// Walk `path`, replacing any missing or non-object intermediate with `{}`.
fn write_at(root: &mut TemplateObject, path: &OutputPath, value: TemplateValue) {
    let (parents, last) = path.split_last();
    write_under(root, parents, last, value);
}

fn write_under(node: &mut TemplateObject, parents: &[String], last: &str, value: TemplateValue) {
    let Some((seg, rest)) = parents.split_first() else {
        node.insert(last.to_string(), value);
        return;
    };

    match node
        .entry(seg.clone())
        .or_insert_with(TemplateValue::empty_object)
    {
        TemplateValue::Object(child) => write_under(child, rest, last, value),
        slot => {
            let mut child = TemplateObject::new();
            write_under(&mut child, rest, last, value);
            *slot = TemplateValue::Object(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn values(v: serde_json::Value) -> ValueMap {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn writes_into_empty_template() {
        let index: FieldPathIndex = [("f1", "$.network.hostname")].into_iter().collect();
        let out = project(&json!({}), &index, &values(json!({"f1": "host1"})));

        assert_eq!(out.to_json(), json!({"network": {"hostname": "host1"}}));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn keeps_skeleton_and_replaces_scalar_intermediates() {
        let index: FieldPathIndex = [
            ("mtu", "$.network.eth0.mtu"),
            ("dhcp", "$.network.dhcp"),
        ]
        .into_iter()
        .collect();
        let skeleton = json!({"version": 1, "network": {"eth0": "auto", "dhcp": true}});

        let out = project(
            &skeleton,
            &index,
            &values(json!({"mtu": 9000, "dhcp": false})),
        );
        assert_eq!(
            out.to_json(),
            json!({"version": 1, "network": {"eth0": {"mtu": 9000}, "dhcp": false}})
        );
    }

    #[test]
    fn replaced_intermediate_keeps_its_position() {
        let index: FieldPathIndex = [("y", "$.a.x.y")].into_iter().collect();
        let out = project(&json!({"a": 5, "b": 1}), &index, &values(json!({"y": "v"})));

        assert_eq!(out.to_json(), json!({"a": {"x": {"y": "v"}}, "b": 1}));
        let keys: Vec<&String> = out.document.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn value_types_are_preserved() {
        let index: FieldPathIndex = [
            ("s", "$.v.s"),
            ("i", "$.v.i"),
            ("f", "$.v.f"),
            ("b", "$.v.b"),
            ("n", "$.v.n"),
            ("o", "$.v.o"),
        ]
        .into_iter()
        .collect();
        let out = project(
            &json!({}),
            &index,
            &values(json!({
                "s": "x", "i": 3, "f": 0.5, "b": true, "n": null, "o": {"list": [1, 2.5]}
            })),
        );

        let v = out.document.as_object().unwrap()["v"].as_object().unwrap().clone();
        assert_eq!(v["i"], TemplateValue::Integer(3));
        assert_eq!(v["f"], TemplateValue::Float(0.5));
        assert_eq!(v["n"], TemplateValue::Null);
        assert_eq!(
            out.to_json()["v"]["o"],
            json!({"list": [1, 2.5]})
        );
    }

    #[test]
    fn unknown_field_and_bad_path_do_not_abort() {
        let index: FieldPathIndex = [
            ("good", "$.a.b"),
            ("bad", "$.disks[0]"),
            ("rootless", "a.b"),
        ]
        .into_iter()
        .collect();
        let out = project(
            &json!({}),
            &index,
            &values(json!({"ghost": 1, "bad": 2, "good": 3, "rootless": 4})),
        );

        assert_eq!(out.to_json(), json!({"a": {"b": 3}}));
        assert_eq!(out.warnings.len(), 3);
        assert_eq!(
            out.warnings[0],
            ProjectionWarning::UnknownField("ghost".into())
        );
        assert!(matches!(
            out.warnings[1],
            ProjectionWarning::InvalidPath { ref field_id, .. } if field_id == "bad"
        ));
    }

    #[test]
    fn conversion_failure_leaves_target_untouched() {
        let mut deep = json!("leaf");
        for _ in 0..(crate::value::MAX_DEPTH + 2) {
            deep = json!({"n": deep});
        }
        let index: FieldPathIndex = [("deep", "$.x.y"), ("ok", "$.z")].into_iter().collect();
        let mut vals = ValueMap::new();
        vals.insert("deep".into(), deep);
        vals.insert("ok".into(), json!("fine"));

        let out = project(&json!({"x": 1}), &index, &vals);
        assert_eq!(out.to_json(), json!({"x": 1, "z": "fine"}));
        assert!(matches!(
            out.warnings[0],
            ProjectionWarning::Conversion { ref field_id, .. } if field_id == "deep"
        ));
    }

    #[test]
    fn non_object_skeleton_starts_empty() {
        let index: FieldPathIndex = [("a", "$.a")].into_iter().collect();
        let out = project(&json!([1, 2]), &index, &values(json!({"a": 1})));

        assert_eq!(out.to_json(), json!({"a": 1}));
        assert_eq!(out.warnings, vec![ProjectionWarning::SkeletonNotObject]);
    }
}
