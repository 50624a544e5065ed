use crate::spec::Page;
use crate::value::TemplateValue;

use indexmap::IndexMap;
use serde::Serialize;

/// Fully merged, conflict-checked wizard definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedSpec {
    /// Sorted by ascending `order`.
    pub pages: Vec<Page>,
    pub output_template: TemplateValue,
    pub diagnostics: Vec<String>,
}

impl UnifiedSpec {
    pub fn field_count(&self) -> usize {
        self.pages.iter().map(|p| p.fields.len()).sum()
    }

    pub fn field_paths(&self) -> FieldPathIndex {
        FieldPathIndex::from_pages(&self.pages)
    }
}

/// Field id -> declared output path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPathIndex {
    paths: IndexMap<String, String>,
}

impl FieldPathIndex {
    /// First occurrence of a field id wins.
    pub fn from_pages(pages: &[Page]) -> Self {
        let mut paths = IndexMap::new();
        for field in pages.iter().flat_map(|p| &p.fields) {
            paths
                .entry(field.id.clone())
                .or_insert_with(|| field.json_path.clone());
        }
        Self { paths }
    }

    pub fn get(&self, field_id: &str) -> Option<&str> {
        self.paths.get(field_id).map(String::as_str)
    }

    pub fn insert(&mut self, field_id: impl Into<String>, path: impl Into<String>) {
        self.paths.insert(field_id.into(), path.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldPathIndex {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut index = FieldPathIndex::default();
        for (k, v) in iter {
            index.insert(k, v);
        }
        index
    }
}
