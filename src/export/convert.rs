// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Output API version stamping
//!
//! Documents keep their field layout; only `apiVersion` changes, and only
//! between versions of a group that share one schema. Anything else, such as
//! `autoscaling/v1` to `autoscaling/v2`, is a conversion error rather than a
//! silently mislabeled object.

use std::fmt;
use std::str::FromStr;

use super::document::{ResourceDocument, join_api_version, split_api_version};
use super::error::ConversionError;

/// Versions of a group whose schemas are identical, so a document moves
/// between them by changing `apiVersion` alone
const INTERCHANGEABLE_VERSIONS: &[(&str, &[&str])] = &[
    ("rbac.authorization.k8s.io", &["v1", "v1beta1"]),
    ("storage.k8s.io", &["v1", "v1beta1"]),
];

fn interchangeable(group: &str, from: &str, to: &str) -> bool {
    INTERCHANGEABLE_VERSIONS
        .iter()
        .find(|(g, _)| *g == group)
        .is_some_and(|(_, versions)| versions.contains(&from) && versions.contains(&to))
}

/// Requested output API version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputVersion {
    /// Bare version ("v1"): applies to every group
    Version(String),
    /// "group/version": applies to documents of that group only
    GroupVersion { group: String, version: String },
}

impl OutputVersion {
    /// Target version for a document in `group`, if this request covers it
    fn version_for(&self, group: &str) -> Option<&str> {
        match self {
            OutputVersion::Version(version) => Some(version),
            OutputVersion::GroupVersion { group: g, version } if g == group => Some(version),
            OutputVersion::GroupVersion { .. } => None,
        }
    }
}

impl FromStr for OutputVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match split_api_version(s) {
            (_, "") => Err(format!("invalid output version '{}'", s)),
            ("", version) => Ok(OutputVersion::Version(version.to_string())),
            (group, version) => Ok(OutputVersion::GroupVersion {
                group: group.to_string(),
                version: version.to_string(),
            }),
        }
    }
}

impl fmt::Display for OutputVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputVersion::Version(version) => write!(f, "{}", version),
            OutputVersion::GroupVersion { group, version } => {
                write!(f, "{}", join_api_version(group, version))
            }
        }
    }
}

/// Stamps documents with the requested output version
#[derive(Debug, Clone, Default)]
pub struct VersionConverter {
    target: Option<OutputVersion>,
}

impl VersionConverter {
    pub fn new(target: Option<OutputVersion>) -> Self {
        Self { target }
    }

    /// Re-stamp `doc` in place
    pub fn convert(&self, doc: &mut ResourceDocument) -> Result<(), ConversionError> {
        let Some(target) = &self.target else {
            return Ok(());
        };

        let gvk = doc.gvk();
        let Some(version) = target.version_for(&gvk.group) else {
            return Ok(());
        };
        if gvk.version == version {
            return Ok(());
        }

        let to = join_api_version(&gvk.group, version);
        if !interchangeable(&gvk.group, &gvk.version, version) {
            return Err(ConversionError {
                resource: doc.describe(),
                from: match doc.api_version() {
                    "" => "<no apiVersion>".to_string(),
                    v => v.to_string(),
                },
                to,
            });
        }

        doc.set_api_version(&to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(api_version: &str, kind: &str) -> ResourceDocument {
        ResourceDocument::new(json!({
            "apiVersion": api_version,
            "kind": kind,
            "metadata": {"name": "x"}
        }))
    }

    fn converter(target: &str) -> VersionConverter {
        VersionConverter::new(Some(target.parse().unwrap()))
    }

    #[test]
    fn test_parse_output_version() {
        assert_eq!(
            "v1".parse::<OutputVersion>().unwrap(),
            OutputVersion::Version("v1".to_string())
        );
        assert_eq!(
            "autoscaling/v2".parse::<OutputVersion>().unwrap(),
            OutputVersion::GroupVersion {
                group: "autoscaling".to_string(),
                version: "v2".to_string()
            }
        );
        assert!("apps/".parse::<OutputVersion>().is_err());
        assert!("".parse::<OutputVersion>().is_err());
        assert_eq!("apps/v1".parse::<OutputVersion>().unwrap().to_string(), "apps/v1");
    }

    #[test]
    fn test_no_target_is_noop() {
        let mut d = doc("example.com/v9", "Widget");
        VersionConverter::default().convert(&mut d).unwrap();
        assert_eq!(d.api_version(), "example.com/v9");
    }

    #[test]
    fn test_same_version_is_noop_for_unknown_group() {
        let mut d = doc("example.com/v1", "Widget");
        converter("v1").convert(&mut d).unwrap();
        assert_eq!(d.api_version(), "example.com/v1");
    }

    #[test]
    fn test_group_version_restamps_interchangeable_version() {
        let mut role = doc("rbac.authorization.k8s.io/v1beta1", "Role");
        let mut svc = doc("v1", "Service");
        let c = converter("rbac.authorization.k8s.io/v1");
        c.convert(&mut role).unwrap();
        c.convert(&mut svc).unwrap();
        assert_eq!(role.api_version(), "rbac.authorization.k8s.io/v1");
        // Other groups are not covered by a group/version target
        assert_eq!(svc.api_version(), "v1");
    }

    #[test]
    fn test_schema_change_is_not_restamped() {
        let mut hpa = ResourceDocument::new(json!({
            "apiVersion": "autoscaling/v1",
            "kind": "HorizontalPodAutoscaler",
            "metadata": {"name": "web"},
            "spec": {"maxReplicas": 5, "targetCPUUtilizationPercentage": 80}
        }));
        let before = hpa.clone();

        let err = converter("autoscaling/v2").convert(&mut hpa).unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot convert HorizontalPodAutoscaler web from autoscaling/v1 to autoscaling/v2"
        );
        assert_eq!(hpa, before);

        let mut v2 = doc("autoscaling/v2", "HorizontalPodAutoscaler");
        assert!(converter("autoscaling/v1").convert(&mut v2).is_err());
    }

    #[test]
    fn test_version_change_fails() {
        let mut d = doc("apps/v1", "Deployment");
        let err = converter("v2").convert(&mut d).unwrap_err();
        assert_eq!(err.from, "apps/v1");
        assert_eq!(err.to, "apps/v2");
        assert_eq!(err.resource, "Deployment x");
        // The document is left as it was
        assert_eq!(d.api_version(), "apps/v1");
    }

    #[test]
    fn test_unknown_group_fails_when_version_differs() {
        let mut d = doc("example.com/v1alpha1", "Widget");
        assert!(converter("v1").convert(&mut d).is_err());
    }

    #[test]
    fn test_missing_api_version_fails() {
        let mut d = ResourceDocument::new(json!({"kind": "Service", "metadata": {"name": "a"}}));
        let err = converter("v1").convert(&mut d).unwrap_err();
        assert_eq!(err.from, "<no apiVersion>");
    }
}
