//! Resource instances and their attribute maps.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use tfokta_core::{LifecycleStatus, OktaError, OktaResult};

/// Attribute name carrying the lifecycle status of status-bearing kinds.
pub const STATUS: &str = "status";

/// Attribute map of one resource, keyed by attribute name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes {
    values: Map<String, Value>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object.
    pub fn from_value(value: Value) -> OktaResult<Self> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            Value::Null => Ok(Self::default()),
            other => Err(OktaError::invalid_input(format!(
                "attributes must be a JSON object, got {other}"
            ))),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.values)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Set an attribute using builder pattern.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set `name` only when `value` is present.
    pub fn set_opt(&mut self, name: impl Into<String>, value: Option<impl Into<Value>>) {
        if let Some(value) = value {
            self.set(name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// String members of a set- or list-typed attribute.
    pub fn get_strings(&self, name: &str) -> Vec<String> {
        self.get(name)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A required string attribute.
    pub fn require_str(&self, name: &str) -> OktaResult<&str> {
        self.get_str(name)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| OktaError::invalid_input(format!("attribute {name:?} is required")))
    }

    /// Lifecycle status, defaulting to `ACTIVE` when unset.
    pub fn status(&self) -> OktaResult<LifecycleStatus> {
        match self.get_str(STATUS) {
            None => Ok(LifecycleStatus::default()),
            Some(raw) => LifecycleStatus::parse(raw).ok_or_else(|| {
                OktaError::invalid_input(format!("status must be ACTIVE or INACTIVE, got {raw:?}"))
            }),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Names whose value here differs from `other`.
    ///
    /// Only names set here are compared, so computed attributes present only
    /// in `other` never count as changes.
    pub fn changed_from(&self, other: &Attributes) -> Vec<&str> {
        self.values
            .iter()
            .filter(|(name, value)| !value.is_null() && other.get(name) != Some(*value))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

impl FromIterator<(String, Value)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// One resource as seen by the runtime.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceInstance {
    /// Okta-assigned identifier, `None` until created or imported.
    pub id: Option<String>,
    pub desired: Attributes,
    /// State hydrated by the last successful Create, Read or Update.
    pub observed: Option<Attributes>,
}

impl ResourceInstance {
    pub fn new(desired: Attributes) -> Self {
        Self {
            id: None,
            desired,
            observed: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_observed(mut self, observed: Attributes) -> Self {
        self.observed = Some(observed);
        self
    }

    /// The identifier, or `InvalidInput` before the resource exists.
    pub fn require_id(&self) -> OktaResult<&str> {
        self.id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| OktaError::invalid_input("resource has no identifier"))
    }

    /// Observed attributes, or an empty map.
    pub fn observed_or_default(&self) -> Attributes {
        self.observed.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accessors() {
        let attrs = Attributes::new()
            .with("name", "Docs")
            .with("users", json!(["00u1", "00u2"]))
            .with("track_all_users", false)
            .with("description", Value::Null);

        assert_eq!(attrs.get_str("name"), Some("Docs"));
        assert_eq!(attrs.get_strings("users"), vec!["00u1", "00u2"]);
        assert_eq!(attrs.get_bool("track_all_users"), Some(false));
        assert!(!attrs.has("description"));
        assert!(attrs.get_strings("missing").is_empty());
        assert_eq!(attrs.require_str("missing").unwrap_err().error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_status() {
        assert_eq!(Attributes::new().status().unwrap(), LifecycleStatus::Active);
        let inactive = Attributes::new().with(STATUS, "INACTIVE");
        assert_eq!(inactive.status().unwrap(), LifecycleStatus::Inactive);
        assert!(Attributes::new().with(STATUS, "PAUSED").status().is_err());
    }

    #[test]
    fn test_changed_from_ignores_computed() {
        let desired = Attributes::new().with("name", "Docs").with("description", "new");
        let observed = Attributes::new()
            .with("name", "Docs")
            .with("description", "old")
            .with("system", false);
        assert_eq!(desired.changed_from(&observed), vec!["description"]);
    }

    #[test]
    fn test_from_value() {
        let attrs = Attributes::from_value(json!({ "label": "Docs" })).unwrap();
        assert_eq!(attrs.len(), 1);
        assert!(Attributes::from_value(json!([1])).is_err());
        assert!(Attributes::from_value(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_require_id() {
        let instance = ResourceInstance::new(Attributes::new());
        assert!(instance.require_id().is_err());
        assert_eq!(instance.with_id("0oa1").require_id().unwrap(), "0oa1");
    }
}
