//! Output-template deep merge.
//!
//! Object-over-object merges recursively. Anything else (a scalar or array on
//! either side, or a missing key) is replaced wholesale by the incoming value.
//! The result therefore depends on the order patches arrive in: `{a:1}` then
//! `{a:{y:2}}` yields `{a:{y:2}}`, never a merge.

use crate::value::{TemplateObject, TemplateValue};

pub fn deep_merge(target: &mut TemplateObject, patch: TemplateObject) {
    for (key, incoming) in patch {
        match incoming {
            TemplateValue::Object(inner) => match target.get_mut(&key) {
                Some(TemplateValue::Object(existing)) => deep_merge(existing, inner),
                _ => {
                    target.insert(key, TemplateValue::Object(inner));
                }
            },
            other => {
                target.insert(key, other);
            }
        }
    }
}
