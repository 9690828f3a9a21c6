// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Resource documents as fetched from the API or read from files
//!
//! A document is a JSON object tree of arbitrary shape. The type meta
//! (`apiVersion` + `kind`) is parsed into a [`GroupVersionKind`] so callers can
//! dispatch on it, while every other field is reached through path helpers.
//! Unknown fields are never dropped: only the paths a caller removes go away.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Parsed `apiVersion` and `kind` of a document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupVersionKind {
    /// API group, empty for the core group
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    /// Split an `apiVersion` string ("v1", "apps/v1") and pair it with a kind
    pub fn parse(api_version: &str, kind: &str) -> Self {
        let (group, version) = split_api_version(api_version);
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
        }
    }

    /// Rebuild the `apiVersion` string
    pub fn api_version(&self) -> String {
        join_api_version(&self.group, &self.version)
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

/// Split "group/version" into its parts; a bare version is in the core group
pub fn split_api_version(api_version: &str) -> (&str, &str) {
    match api_version.rsplit_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}

/// Inverse of [`split_api_version`]
pub fn join_api_version(group: &str, version: &str) -> String {
    if group.is_empty() {
        version.to_string()
    } else {
        format!("{}/{}", group, version)
    }
}

/// One resource document, exclusively owned by the export run that fetched it
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDocument {
    value: Value,
}

impl ResourceDocument {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn kind(&self) -> &str {
        self.str_field("kind").unwrap_or_default()
    }

    pub fn api_version(&self) -> &str {
        self.str_field("apiVersion").unwrap_or_default()
    }

    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::parse(self.api_version(), self.kind())
    }

    pub fn set_api_version(&mut self, api_version: &str) {
        if let Value::Object(map) = &mut self.value {
            map.insert(
                "apiVersion".to_string(),
                Value::String(api_version.to_string()),
            );
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.get_path(&["metadata", "name"]).and_then(Value::as_str)
    }

    pub fn namespace(&self) -> Option<&str> {
        self.get_path(&["metadata", "namespace"])
            .and_then(Value::as_str)
    }

    /// String-valued entries of `metadata.labels`
    pub fn labels(&self) -> BTreeMap<String, String> {
        self.get_path(&["metadata", "labels"])
            .and_then(Value::as_object)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Human-readable reference used in errors and logs: `Kind ns/name`
    pub fn describe(&self) -> String {
        let kind = match self.kind() {
            "" => "<unknown kind>",
            k => k,
        };
        match (self.namespace(), self.name()) {
            (Some(ns), Some(name)) => format!("{} {}/{}", kind, ns, name),
            (None, Some(name)) => format!("{} {}", kind, name),
            _ => format!("{} <unnamed>", kind),
        }
    }

    /// The top-level object map, or `None` if the document is not an object
    pub fn object_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.value.as_object_mut()
    }

    /// Look up a nested value by object keys
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        path.iter()
            .try_fold(&self.value, |current, key| current.as_object()?.get(*key))
    }

    /// Mutable variant of [`Self::get_path`]
    pub fn get_path_mut(&mut self, path: &[&str]) -> Option<&mut Value> {
        path.iter().try_fold(&mut self.value, |current, key| {
            current.as_object_mut()?.get_mut(*key)
        })
    }

    /// Remove the value at `path`; missing intermediate objects are not an error
    pub fn remove_path(&mut self, path: &[&str]) -> Option<Value> {
        let (last, parents) = path.split_last()?;
        self.get_path_mut(parents)?
            .as_object_mut()?
            .remove(*last)
    }

    /// Remove an annotation, dropping the annotations map once it is empty
    pub fn remove_annotation(&mut self, key: &str) -> Option<Value> {
        remove_map_key(self.get_path_mut(&["metadata"])?, "annotations", key)
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.get_path(&["metadata", "annotations", key])
            .and_then(Value::as_str)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(Value::as_str)
    }
}

impl From<Value> for ResourceDocument {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// Remove `key` from the string map stored under `parent[field]`, dropping the
/// map when it becomes empty. Returns the removed value.
pub fn remove_map_key(parent: &mut Value, field: &str, key: &str) -> Option<Value> {
    let parent = parent.as_object_mut()?;
    let map = parent.get_mut(field)?.as_object_mut()?;
    let removed = map.remove(key);
    if map.is_empty() {
        parent.remove(field);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service() -> ResourceDocument {
        ResourceDocument::new(json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": {
                "name": "web",
                "namespace": "prod",
                "annotations": {"a": "1"}
            },
            "spec": {"clusterIP": "10.0.0.5"}
        }))
    }

    #[test]
    fn test_split_api_version() {
        assert_eq!(split_api_version("v1"), ("", "v1"));
        assert_eq!(split_api_version("apps/v1"), ("apps", "v1"));
        assert_eq!(
            split_api_version("route.openshift.io/v1"),
            ("route.openshift.io", "v1")
        );
    }

    #[test]
    fn test_gvk_roundtrip_api_version() {
        let gvk = GroupVersionKind::parse("apps/v1", "Deployment");
        assert_eq!(gvk.group, "apps");
        assert_eq!(gvk.api_version(), "apps/v1");
        assert_eq!(gvk.to_string(), "apps/v1, Kind=Deployment");

        let core = GroupVersionKind::parse("v1", "Pod");
        assert_eq!(core.group, "");
        assert_eq!(core.api_version(), "v1");
    }

    #[test]
    fn test_accessors() {
        let doc = service();
        assert_eq!(doc.kind(), "Service");
        assert_eq!(doc.name(), Some("web"));
        assert_eq!(doc.namespace(), Some("prod"));
        assert_eq!(doc.describe(), "Service prod/web");
    }

    #[test]
    fn test_describe_without_metadata() {
        let doc = ResourceDocument::new(json!({"kind": "Thing"}));
        assert_eq!(doc.describe(), "Thing <unnamed>");
        let doc = ResourceDocument::new(json!(42));
        assert_eq!(doc.describe(), "<unknown kind> <unnamed>");
    }

    #[test]
    fn test_remove_path() {
        let mut doc = service();
        assert_eq!(
            doc.remove_path(&["spec", "clusterIP"]),
            Some(json!("10.0.0.5"))
        );
        assert_eq!(doc.get_path(&["spec"]), Some(&json!({})));
        // Missing paths are a no-op
        assert_eq!(doc.remove_path(&["status", "loadBalancer"]), None);
        assert_eq!(doc.remove_path(&[]), None);
    }

    #[test]
    fn test_remove_annotation_drops_empty_map() {
        let mut doc = service();
        assert_eq!(doc.annotation("a"), Some("1"));
        assert_eq!(doc.remove_annotation("a"), Some(json!("1")));
        assert!(doc.get_path(&["metadata", "annotations"]).is_none());
        assert_eq!(doc.remove_annotation("a"), None);
    }

    #[test]
    fn test_set_api_version() {
        let mut doc = service();
        doc.set_api_version("v2");
        assert_eq!(doc.api_version(), "v2");
    }
}
