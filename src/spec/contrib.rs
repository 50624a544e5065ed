//! Contribution documents (one per `*.json` file in a spec directory).
//!
//! JSON shape (property names matched case-insensitively):
//! {
//!   "contribId": "network-base",
//!   "priority": 10,                    // optional, default 100, lower runs first
//!   "pages": [
//!     {
//!       "id": "network", "title": "Network", "order": 20,
//!       "fields": [
//!         { "id": "hostname", "label": "Hostname", "type": "text",
//!           "required": true, "jsonPath": "$.network.hostname" }
//!       ]
//!     }
//!   ],
//!   "pagePatches": [
//!     { "pageId": "network", "insertFieldsAfter": "hostname", "fields": [ ... ] }
//!   ],
//!   "outputTemplatePatch": { "network": { "dhcp": true } }
//! }

use crate::spec::keys::{rekey_array_items, rekey_object};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_PRIORITY: i32 = 100;

const CONTRIB_KEYS: &[&str] = &[
    "contribId",
    "priority",
    "pages",
    "pagePatches",
    "outputTemplatePatch",
];
const PAGE_KEYS: &[&str] = &["id", "title", "order", "description", "fields"];
const PATCH_KEYS: &[&str] = &["pageId", "insertFieldsAfter", "insertFieldsBefore", "fields"];
const FIELD_KEYS: &[&str] = &[
    "id",
    "label",
    "type",
    "required",
    "jsonPath",
    "errorMessage",
    "placeholder",
    "defaultValue",
    "min",
    "max",
    "pattern",
    "description",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionSpec {
    #[serde(default)]
    pub contrib_id: String,

    #[serde(default = "default_priority")]
    pub priority: i32,

    #[serde(default)]
    pub pages: Vec<Page>,

    #[serde(default)]
    pub page_patches: Vec<PagePatch>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_template_patch: Option<Value>,
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub order: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Number,
    #[serde(alias = "bool")]
    Boolean,
    Ip,
    Regex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,

    #[serde(default)]
    pub label: String,

    #[serde(rename = "type", default)]
    pub kind: FieldKind,

    #[serde(default)]
    pub required: bool,

    /// Output location, e.g. `$.network.hostname`.
    #[serde(default)]
    pub json_path: String,

    #[serde(flatten)]
    pub validation: FieldValidation,
}

/// Optional UI/validation hints; carried through merging untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePatch {
    pub page_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_fields_after: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_fields_before: Option<String>,

    #[serde(default)]
    pub fields: Vec<Field>,
}

/// Where a patch's fields go inside the target page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor<'a> {
    After(&'a str),
    Before(&'a str),
    Append,
}

impl PagePatch {
    /// `insertFieldsAfter` wins when both anchors are set; empty strings count as unset.
    pub fn anchor(&self) -> Anchor<'_> {
        fn non_empty(s: &Option<String>) -> Option<&str> {
            s.as_deref().filter(|s| !s.is_empty())
        }

        if let Some(after) = non_empty(&self.insert_fields_after) {
            Anchor::After(after)
        } else if let Some(before) = non_empty(&self.insert_fields_before) {
            Anchor::Before(before)
        } else {
            Anchor::Append
        }
    }
}

impl ContributionSpec {
    /// Decode a contribution document, matching schema property names case-insensitively.
    pub fn from_json_value(mut value: Value) -> serde_json::Result<Self> {
        if let Value::Object(obj) = &mut value {
            canonicalize(obj);
        }
        serde_json::from_value(value)
    }

    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        Self::from_json_value(serde_json::from_str(text)?)
    }
}

impl Page {
    /// Decode a page with case-insensitive property names.
    pub fn from_json_value(mut value: Value) -> serde_json::Result<Self> {
        if let Value::Object(obj) = &mut value {
            rekey_object(obj, PAGE_KEYS);
            canonicalize_page(obj);
        }
        serde_json::from_value(value)
    }
}

fn canonicalize(obj: &mut Map<String, Value>) {
    rekey_object(obj, CONTRIB_KEYS);
    rekey_array_items(obj, "pages", PAGE_KEYS, canonicalize_page);
    rekey_array_items(obj, "pagePatches", PATCH_KEYS, |patch| {
        rekey_array_items(patch, "fields", FIELD_KEYS, |_| {});
    });
}

fn canonicalize_page(page: &mut Map<String, Value>) {
    rekey_array_items(page, "fields", FIELD_KEYS, |_| {});
}
