//! Import keys and composite identifiers.

use std::fmt;
use std::str::FromStr;

use crate::error::{OktaError, OktaResult};

/// Separator between parts of a nested or relationship identifier.
pub const ID_SEPARATOR: char = '/';

/// A parsed import key such as `<id>` or `<parent>/<child>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportKey {
    parts: Vec<String>,
}

impl ImportKey {
    /// Parse `raw`, requiring exactly `expected_parts` non-empty segments.
    pub fn parse(raw: &str, expected_parts: usize) -> OktaResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(OktaError::invalid_input("import key must not be empty"));
        }
        let parts: Vec<String> = raw.split(ID_SEPARATOR).map(str::to_string).collect();
        if parts.len() != expected_parts.max(1) {
            return Err(OktaError::invalid_input(format!(
                "invalid import key {raw:?}: expected {} part(s) separated by '{ID_SEPARATOR}', got {}",
                expected_parts.max(1),
                parts.len()
            )));
        }
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(OktaError::invalid_input(format!(
                "invalid import key {raw:?}: empty segment"
            )));
        }
        Ok(Self { parts })
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Identifier of the object itself.
    pub fn last(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or_default()
    }

    /// Parent identifier for nested keys.
    pub fn parent(&self) -> Option<&str> {
        (self.parts.len() > 1).then(|| self.parts[0].as_str())
    }
}

impl fmt::Display for ImportKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts.join("/"))
    }
}

impl FromStr for ImportKey {
    type Err = OktaError;

    /// Accepts any number of segments.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let count = s.trim().split(ID_SEPARATOR).count();
        Self::parse(s, count)
    }
}

/// Join parts into a composite identifier.
pub fn composite_id<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .map(|p| p.as_ref().to_string())
        .collect::<Vec<_>>()
        .join("/")
}
