//! Spec layer: contribution JSON schemas + the unified, merged definition.
//!
//! This module is intentionally separate from merging and projection.
//! It owns:
//! - contribution documents (pages, fields, page patches, template patches)
//! - the unified spec and the field-path index derived from it
//! - case-insensitive property matching for incoming documents

pub mod contrib;
pub mod keys;
pub mod unified;

pub use contrib::{Anchor, ContributionSpec, Field, FieldKind, FieldValidation, Page, PagePatch};
pub use unified::{FieldPathIndex, UnifiedSpec};
