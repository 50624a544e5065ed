//! Restricted output path grammar.
//!
//! A path is the root marker `$` followed by one or more `.name` segments:
//!
//! $.network.hostname   =>  ["network", "hostname"]
//!
//! No array indices, wildcards, quoting or escapes.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

static PATH_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^\$(?:\.[^.\[\]*\\\s]+)+$"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("path must start with '$.'")]
    MissingRoot,
    #[error("path contains an empty segment")]
    EmptySegment,
    #[error("segment '{0}' contains unsupported characters")]
    InvalidSegment(String),
    #[error("path grammar unavailable: {0}")]
    Grammar(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPath {
    segments: Vec<String>,
}

impl OutputPath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }
        let Some(rest) = raw.strip_prefix("$.") else {
            return Err(PathError::MissingRoot);
        };

        let re = PATH_RE
            .as_ref()
            .map_err(|e| PathError::Grammar(e.to_string()))?;
        if !re.is_match(raw) {
            // Regex rejected it; find the offending segment for the message.
            for seg in rest.split('.') {
                if seg.is_empty() {
                    return Err(PathError::EmptySegment);
                }
                if seg
                    .chars()
                    .any(|c| matches!(c, '[' | ']' | '*' | '\\') || c.is_whitespace())
                {
                    return Err(PathError::InvalidSegment(seg.to_string()));
                }
            }
            return Err(PathError::InvalidSegment(rest.to_string()));
        }

        Ok(Self {
            segments: rest.split('.').map(str::to_string).collect(),
        })
    }

    /// Always non-empty.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Intermediate segments and the final key.
    pub fn split_last(&self) -> (&[String], &str) {
        match self.segments.split_last() {
            Some((last, parents)) => (parents, last.as_str()),
            None => (&self.segments[..0], ""),
        }
    }
}

impl fmt::Display for OutputPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for seg in &self.segments {
            write!(f, ".{}", seg)?;
        }
        Ok(())
    }
}
